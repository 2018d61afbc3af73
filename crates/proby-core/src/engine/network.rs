//! The Bayesian network: an insertion-ordered arena of nodes.
//!
//! Nodes are addressed by [`NodeId`] and stored in insertion order, which is
//! also the topological order every algorithm walks: a node may only refer to
//! nodes inserted before it. Erasing a node leaves its slot vacant so the
//! handles of the remaining nodes stay valid.
//!
//! The network owns its [`DomainRegistry`] and its random generator, so two
//! networks never interfere with each other. Inference and learning live in
//! sibling modules as further `impl BayesNetwork` blocks:
//!
//! - `enumerate`: exact inference
//! - `gibbs`: Gibbs sampling
//! - `learn`: conjugate MAP / ML parameter learning
//! - `process`: Dirichlet-process component management

use std::collections::BTreeMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::domain::{radix_compose, DomainId, DomainRegistry};
use super::errors::NetError;
use super::node::{
    CategoricalNode, ConditionList, ConditionalCategoricalNode, ConditionalDirichletNode,
    ConstantNode, ConstantValue, DirichletNode, DirichletProcessNode,
    DirichletProcessParametersNode, Node, NodeId, NodeKind, Parameters,
};
use super::tables::{ConditionalProbabilityTable, ProbabilityTable};
use super::value::DiscreteValue;

/// Seed used by [`BayesNetwork::new`].
pub const DEFAULT_SEED: u64 = 5489;

/// Suffix appended to a component domain name to name its process
/// parameters.
pub const PROCESS_PARAMETERS_SUFFIX: &str = "Parameters";

/// A node value temporarily replaced while scoring a candidate.
pub(crate) type Override = Option<(NodeId, DiscreteValue)>;

pub struct BayesNetwork {
    pub(super) nodes: Vec<Option<Node>>,
    live: usize,
    pub(super) domains: DomainRegistry,
    pub(super) rng: StdRng,
}

impl Default for BayesNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl BayesNetwork {
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            nodes: Vec::new(),
            live: 0,
            domains: DomainRegistry::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Restarts the generator; runs after equal reseeds are reproducible.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn domains(&self) -> &DomainRegistry {
        &self.domains
    }

    pub fn domains_mut(&mut self) -> &mut DomainRegistry {
        &mut self.domains
    }

    /// Shorthand for [`DomainRegistry::boolean`].
    pub fn boolean(&mut self, name: &str, flag: bool) -> Result<DiscreteValue, NetError> {
        self.domains.boolean(name, flag)
    }

    /// Shorthand for [`DomainRegistry::integer`].
    pub fn integer(
        &mut self,
        name: &str,
        cardinality: usize,
        index: usize,
    ) -> Result<DiscreteValue, NetError> {
        self.domains.integer(name, cardinality, index)
    }

    /// Shorthand for [`DomainRegistry::observe`].
    pub fn observe(&mut self, name: &str, text: &str) -> Result<DiscreteValue, NetError> {
        self.domains.observe(name, text)
    }

    /// Number of live nodes.
    pub fn size(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live node handles in insertion order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| NodeId(i as u32))
            .collect()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.slot()), Some(Some(_)))
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, NetError> {
        self.nodes
            .get(id.slot())
            .and_then(Option::as_ref)
            .ok_or_else(|| NetError::OutOfRange(format!("node #{} does not exist", id.0)))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, NetError> {
        self.nodes
            .get_mut(id.slot())
            .and_then(Option::as_mut)
            .ok_or_else(|| NetError::OutOfRange(format!("node #{} does not exist", id.0)))
    }

    /// Typed view of node `id`.
    pub fn get<K: NodeKind>(&self, id: NodeId) -> Result<&K, NetError> {
        let node = self.node(id)?;
        K::from_node(node).ok_or_else(|| wrong_kind::<K>(id, node))
    }

    pub(crate) fn get_mut<K: NodeKind>(&mut self, id: NodeId) -> Result<&mut K, NetError> {
        let node = self.node_mut(id)?;
        let kind = node.kind_name();
        K::from_node_mut(node).ok_or_else(|| {
            NetError::InvalidArgument(format!(
                "node #{} is a {kind} node, not a {} node",
                id.0,
                K::KIND
            ))
        })
    }

    /// First node of kind `K` whose name is `name`.
    pub fn find_by_name<K: NodeKind>(&self, name: &str) -> Result<NodeId, NetError> {
        self.nodes
            .iter()
            .enumerate()
            .find_map(|(i, slot)| {
                let node = slot.as_ref()?;
                K::from_node(node)?;
                (self.node_name(node) == name).then_some(NodeId(i as u32))
            })
            .ok_or_else(|| {
                NetError::OutOfRange(format!("no {} node named '{name}'", K::KIND))
            })
    }

    /// Name of a node: the name of its value.
    pub fn name(&self, id: NodeId) -> Result<String, NetError> {
        Ok(self.node_name(self.node(id)?))
    }

    fn node_name(&self, node: &Node) -> String {
        match node {
            Node::Constant(ConstantNode { value, .. }) => match value {
                ConstantValue::Discrete(v) => self.value_name(*v),
                ConstantValue::Probabilities(t) => t.name().to_string(),
                ConstantValue::ConditionalProbabilities(t) => t.name().to_string(),
            },
            Node::Categorical(n) => self.value_name(n.value),
            Node::ConditionalCategorical(n) => self.value_name(n.value),
            Node::Dirichlet(n) => n.value.name().to_string(),
            Node::ConditionalDirichlet(n) => n.value.name().to_string(),
            Node::DirichletProcessParameters(n) => n.name.clone(),
            Node::DirichletProcess(n) => self.value_name(n.value),
        }
    }

    fn value_name(&self, value: DiscreteValue) -> String {
        value
            .domain()
            .map(|d| self.domains.name(d).to_string())
            .unwrap_or_default()
    }

    /// Current discrete value of a categorical, conditional categorical,
    /// discrete constant or indicator node.
    pub fn value(&self, id: NodeId) -> Result<DiscreteValue, NetError> {
        let node = self.node(id)?;
        node.discrete_value().ok_or_else(|| {
            NetError::InvalidArgument(format!(
                "{} node #{} has no discrete value",
                node.kind_name(),
                id.0
            ))
        })
    }

    /// Replaces the value of a categorical or conditional categorical node.
    pub fn set_value(&mut self, id: NodeId, value: DiscreteValue) -> Result<(), NetError> {
        let domain = value.require_domain()?;
        if value.index() >= self.domains.cardinality(domain) {
            return Err(NetError::OutOfRange(format!(
                "{} is past the end of its domain",
                value.display(&self.domains)
            )));
        }
        let slot = match self.node_mut(id)? {
            Node::Categorical(n) => &mut n.value,
            Node::ConditionalCategorical(n) => &mut n.value,
            other => {
                return Err(NetError::InvalidArgument(format!(
                    "cannot assign a value to a {} node",
                    other.kind_name()
                )))
            }
        };
        if slot.domain() != Some(domain) {
            return Err(NetError::InvalidArgument(
                "value belongs to a different domain than the node".into(),
            ));
        }
        *slot = value;
        Ok(())
    }

    pub fn is_evidence(&self, id: NodeId) -> Result<bool, NetError> {
        Ok(self.node(id)?.is_evidence())
    }

    pub fn set_evidence(&mut self, id: NodeId, evidence: bool) -> Result<(), NetError> {
        match self.node_mut(id)? {
            Node::Categorical(n) => n.evidence = evidence,
            Node::ConditionalCategorical(n) => n.evidence = evidence,
            Node::Dirichlet(n) => n.evidence = evidence,
            Node::ConditionalDirichlet(n) => n.evidence = evidence,
            other => {
                return Err(NetError::InvalidArgument(format!(
                    "the evidence flag of a {} node is fixed",
                    other.kind_name()
                )))
            }
        }
        Ok(())
    }

    /// Assigns `value` and marks the node as evidence.
    pub fn set_observed(&mut self, id: NodeId, value: DiscreteValue) -> Result<(), NetError> {
        self.set_value(id, value)?;
        self.set_evidence(id, true)
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    pub fn add_constant(&mut self, value: impl Into<ConstantValue>) -> NodeId {
        self.push(Node::Constant(ConstantNode {
            value: value.into(),
            children: Vec::new(),
        }))
    }

    /// Adds a categorical node drawing from the table provided by
    /// `probabilities`; `None` inserts a constant uniform table first.
    pub fn add_categorical(
        &mut self,
        value: DiscreteValue,
        probabilities: Option<NodeId>,
    ) -> Result<NodeId, NetError> {
        let variable = value.require_domain()?;
        let probabilities = match probabilities {
            Some(id) => {
                let table = self.probability_table(id)?;
                if table.variable() != variable {
                    return Err(NetError::InvalidArgument(format!(
                        "table '{}' does not describe '{}'",
                        table.name(),
                        self.domains.name(variable)
                    )));
                }
                id
            }
            None => {
                let table = ProbabilityTable::new(&self.domains, variable);
                self.add_constant(table)
            }
        };
        let id = self.push(Node::Categorical(CategoricalNode {
            value,
            evidence: false,
            probabilities,
            children: Vec::new(),
        }));
        self.link_child(probabilities, id)?;
        Ok(id)
    }

    /// Adds a node whose table row is selected by the joint value of
    /// `conditions`; `None` inserts a constant uniform table first.
    pub fn add_conditional_categorical(
        &mut self,
        value: DiscreteValue,
        conditions: &[NodeId],
        probabilities: Option<NodeId>,
    ) -> Result<NodeId, NetError> {
        let variable = value.require_domain()?;
        if conditions.is_empty() {
            return Err(NetError::InvalidArgument(
                "a conditional categorical node needs at least one condition".into(),
            ));
        }
        let mut keyed: SmallVec<[(String, NodeId); 4]> = SmallVec::new();
        let mut members = SmallVec::<[_; 4]>::new();
        for &c in conditions {
            let domain = self.value(c)?.require_domain()?;
            keyed.push((self.domains.name(domain).to_string(), c));
            members.push(domain);
        }
        keyed.sort();
        let ordered: ConditionList = keyed.into_iter().map(|(_, c)| c).collect();
        let condition_domain = self.domains.register_joint(&members)?;

        let probabilities = match probabilities {
            Some(id) => {
                let table = self.conditional_table(id)?;
                if table.variable() != variable || table.condition() != condition_domain {
                    return Err(NetError::InvalidArgument(format!(
                        "table '{}' is not keyed by '{}' given '{}'",
                        table.name(),
                        self.domains.name(variable),
                        self.domains.name(condition_domain)
                    )));
                }
                id
            }
            None => {
                let table =
                    ConditionalProbabilityTable::new(&self.domains, variable, condition_domain);
                self.add_constant(table)
            }
        };
        let id = self.push(Node::ConditionalCategorical(ConditionalCategoricalNode {
            value,
            evidence: false,
            conditions: ordered.clone(),
            condition_domain,
            probabilities,
            children: Vec::new(),
        }));
        for c in ordered {
            self.link_child(c, id)?;
        }
        self.link_child(probabilities, id)?;
        Ok(id)
    }

    /// Adds a Dirichlet node with symmetric prior `alpha` over the values of
    /// `table`. `alpha == 0` requests maximum-likelihood learning.
    pub fn add_dirichlet(
        &mut self,
        table: ProbabilityTable,
        alpha: f64,
    ) -> Result<NodeId, NetError> {
        check_alpha(alpha)?;
        let parameters: Parameters = table.iter().map(|(v, _)| (v, alpha)).collect();
        Ok(self.push(Node::Dirichlet(DirichletNode {
            value: table,
            parameters,
            evidence: false,
            children: Vec::new(),
        })))
    }

    /// Adds a conditional Dirichlet node; every row shares the prior
    /// `alpha` over the variable's values.
    pub fn add_conditional_dirichlet(
        &mut self,
        table: ConditionalProbabilityTable,
        alpha: f64,
    ) -> Result<NodeId, NetError> {
        check_alpha(alpha)?;
        if table.is_empty() {
            return Err(NetError::Logic(format!(
                "cannot build a Dirichlet prior from the empty table '{}'",
                table.name()
            )));
        }
        let parameters: Parameters = self
            .domains
            .range(table.variable())
            .iter()
            .map(|v| (v, alpha))
            .collect();
        Ok(self.push(Node::ConditionalDirichlet(ConditionalDirichletNode {
            value: table,
            parameters,
            evidence: false,
            children: Vec::new(),
        })))
    }

    /// Adds the shared parameters of a Dirichlet process over the component
    /// domain `name`.
    ///
    /// Every managed node must be a conditional Dirichlet node whose condition
    /// includes the component domain. Components that already exist in the
    /// domain start with zero occupancy.
    pub fn add_dirichlet_process_parameters(
        &mut self,
        name: &str,
        concentration: f64,
        managed: &[NodeId],
    ) -> Result<NodeId, NetError> {
        if !(concentration.is_finite() && concentration > 0.0) {
            return Err(NetError::InvalidArgument(format!(
                "concentration must be positive, got {concentration}"
            )));
        }
        let component_domain = self.domains.register(name, 0)?;
        for &m in managed {
            let table = &self.get::<ConditionalDirichletNode>(m)?.value;
            if !self.domains.members(table.condition()).contains(&component_domain) {
                return Err(NetError::InvalidArgument(format!(
                    "table '{}' is not conditioned on '{name}'",
                    table.name()
                )));
            }
        }
        let counters = self
            .domains
            .range(component_domain)
            .iter()
            .map(|c| (c, 0))
            .collect();
        Ok(self.push(Node::DirichletProcessParameters(
            DirichletProcessParametersNode {
                name: format!("{name}{PROCESS_PARAMETERS_SUFFIX}"),
                component_domain,
                concentration,
                managed: managed.to_vec(),
                counters,
                children: Vec::new(),
            },
        )))
    }

    /// Adds an unassigned component indicator drawing from `parameters`.
    pub fn add_dirichlet_process(&mut self, parameters: NodeId) -> Result<NodeId, NetError> {
        let component_domain = self
            .get::<DirichletProcessParametersNode>(parameters)?
            .component_domain;
        let unassigned = self.domains.range(component_domain).end();
        let id = self.push(Node::DirichletProcess(DirichletProcessNode {
            value: unassigned,
            seated: false,
            parameters,
            children: Vec::new(),
        }));
        self.link_child(parameters, id)?;
        Ok(id)
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        self.live += 1;
        id
    }

    fn link_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NetError> {
        let children = self.node_mut(parent)?.children_mut();
        if !children.contains(&child) {
            children.push(child);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Removal and copying
    // ------------------------------------------------------------------

    /// Removes a childless node.
    ///
    /// Returns 1 when the node was removed and 0 when it does not exist. A
    /// node that still has children is rejected without any mutation.
    pub fn erase(&mut self, id: NodeId) -> Result<usize, NetError> {
        let Some(node) = self.nodes.get(id.slot()).and_then(Option::as_ref) else {
            return Ok(0);
        };
        if !node.children().is_empty() {
            return Err(NetError::InvalidArgument(format!(
                "cannot erase '{}': it still has {} children",
                self.node_name(node),
                node.children().len()
            )));
        }
        if let Node::DirichletProcess(indicator) = node {
            if indicator.seated {
                let (parameters, seat) = (indicator.parameters, indicator.value);
                self.release_seat(parameters, seat)?;
            }
        }
        self.nodes[id.slot()] = None;
        self.live -= 1;
        for node in self.nodes.iter_mut().flatten() {
            node.children_mut().retain(|&c| c != id);
            if let Node::DirichletProcessParameters(params) = node {
                params.managed.retain(|&m| m != id);
            }
        }
        Ok(1)
    }

    /// Structural copy with every cross reference rebuilt.
    ///
    /// Nodes are visited in insertion order; each parent reference is resolved
    /// through the table of values provided by already-copied nodes. The copy
    /// is compacted, so its handles may differ from this network's.
    pub fn deep_copy(&self) -> Result<BayesNetwork, NetError> {
        let mut copy = BayesNetwork {
            nodes: Vec::with_capacity(self.live),
            live: 0,
            domains: self.domains.clone(),
            rng: self.rng.clone(),
        };
        let mut node_table: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        let mut value_table: FxHashMap<ValueRef, NodeId> = FxHashMap::default();

        for old_id in self.node_ids() {
            let node = self.node(old_id)?;
            let mut fresh = node.clone();
            fresh.children_mut().clear();
            match &mut fresh {
                Node::Categorical(n) => {
                    n.probabilities = resolve(&value_table, ValueRef::Table(n.probabilities))?;
                }
                Node::ConditionalCategorical(n) => {
                    for c in n.conditions.iter_mut() {
                        *c = resolve(&value_table, ValueRef::Discrete(*c))?;
                    }
                    n.probabilities =
                        resolve(&value_table, ValueRef::ConditionalTable(n.probabilities))?;
                }
                Node::DirichletProcessParameters(n) => {
                    for m in n.managed.iter_mut() {
                        *m = resolve(&value_table, ValueRef::ConditionalTable(*m))?;
                    }
                }
                Node::DirichletProcess(n) => {
                    n.parameters = resolve(&value_table, ValueRef::Process(n.parameters))?;
                }
                Node::Constant(_) | Node::Dirichlet(_) | Node::ConditionalDirichlet(_) => {}
            }
            let new_id = copy.push(fresh);
            node_table.insert(old_id, new_id);
            for provided in ValueRef::provided_by(old_id, node) {
                value_table.insert(provided, new_id);
            }
        }

        for old_id in self.node_ids() {
            let new_parent = node_table[&old_id];
            for &child in self.node(old_id)?.children() {
                let new_child = node_table.get(&child).copied().ok_or_else(|| {
                    NetError::Logic(format!(
                        "child #{} of node #{} was never copied",
                        child.0, old_id.0
                    ))
                })?;
                copy.node_mut(new_parent)?.children_mut().push(new_child);
            }
        }
        Ok(copy)
    }

    // ------------------------------------------------------------------
    // Local probabilities
    // ------------------------------------------------------------------

    pub(crate) fn probability_table(&self, id: NodeId) -> Result<&ProbabilityTable, NetError> {
        let node = self.node(id)?;
        node.probability_table().ok_or_else(|| {
            NetError::InvalidArgument(format!(
                "{} node #{} does not provide a probability table",
                node.kind_name(),
                id.0
            ))
        })
    }

    pub(crate) fn conditional_table(
        &self,
        id: NodeId,
    ) -> Result<&ConditionalProbabilityTable, NetError> {
        let node = self.node(id)?;
        node.conditional_table().ok_or_else(|| {
            NetError::InvalidArgument(format!(
                "{} node #{} does not provide a conditional probability table",
                node.kind_name(),
                id.0
            ))
        })
    }

    pub(crate) fn current_value(&self, id: NodeId, over: Override) -> Result<DiscreteValue, NetError> {
        match over {
            Some((target, value)) if target == id => Ok(value),
            _ => self.value(id),
        }
    }

    /// Joint value of the condition parents of `node`.
    pub(crate) fn joint_condition(
        &self,
        node: &ConditionalCategoricalNode,
        over: Override,
    ) -> Result<DiscreteValue, NetError> {
        let mut digits = SmallVec::<[usize; 4]>::new();
        let mut radices = SmallVec::<[usize; 4]>::new();
        for &c in &node.conditions {
            let value = self.current_value(c, over)?;
            let domain = value.require_domain()?;
            digits.push(value.index());
            radices.push(self.domains.cardinality(domain));
        }
        Ok(DiscreteValue::new(
            node.condition_domain,
            radix_compose(&digits, &radices),
        ))
    }

    /// Probability of node `id`'s current value given its parents.
    ///
    /// Constants and process parameters contribute 1. Other node kinds have
    /// no local probability.
    pub(crate) fn local_probability(&self, id: NodeId, over: Override) -> Result<f64, NetError> {
        match self.node(id)? {
            Node::Categorical(n) => {
                let value = self.current_value(id, over)?;
                self.probability_table(n.probabilities)?.at(value)
            }
            Node::ConditionalCategorical(n) => {
                let value = self.current_value(id, over)?;
                let condition = self.joint_condition(n, over)?;
                self.conditional_table(n.probabilities)?.at(value, condition)
            }
            Node::Constant(_) | Node::DirichletProcessParameters(_) => Ok(1.0),
            other => Err(NetError::network(format!(
                "cannot request a probability from a node of type {}",
                other.kind_name()
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Sufficient statistics
    // ------------------------------------------------------------------

    /// Prior parameters laid out in the order of `variable`'s values.
    ///
    /// Values added to the domain after the prior was built get zero.
    pub(crate) fn prior_weights(&self, parameters: &Parameters, variable: DomainId) -> Vec<f64> {
        self.domains
            .range(variable)
            .iter()
            .map(|v| parameters.get(&v).copied().unwrap_or(0.0))
            .collect()
    }

    /// Per-value counts of the categorical children of a table node.
    pub(crate) fn table_child_counts(
        &self,
        table_node: NodeId,
        evidence_only: bool,
    ) -> Result<Vec<f64>, NetError> {
        let variable = self.probability_table(table_node)?.variable();
        let mut counts = vec![0.0; self.domains.cardinality(variable)];
        for &child in self.node(table_node)?.children() {
            if let Node::Categorical(c) = self.node(child)? {
                if evidence_only && !c.evidence {
                    continue;
                }
                if let Some(slot) = counts.get_mut(c.value.index()) {
                    *slot += 1.0;
                }
            }
        }
        Ok(counts)
    }

    /// Per-condition, per-value counts of the conditional children of a
    /// conditional table node. Children conditioned on an unseated indicator
    /// belong to no row and are skipped.
    pub(crate) fn row_child_counts(
        &self,
        table_node: NodeId,
        evidence_only: bool,
    ) -> Result<BTreeMap<DiscreteValue, Vec<f64>>, NetError> {
        let variable = self.conditional_table(table_node)?.variable();
        let cardinality = self.domains.cardinality(variable);
        let mut counts: BTreeMap<DiscreteValue, Vec<f64>> = BTreeMap::new();
        for &child in self.node(table_node)?.children() {
            if let Node::ConditionalCategorical(c) = self.node(child)? {
                if evidence_only && !c.evidence {
                    continue;
                }
                if c.conditions.iter().any(|&p| self.is_unseated(p)) {
                    continue;
                }
                let condition = self.joint_condition(c, None)?;
                let row = counts
                    .entry(condition)
                    .or_insert_with(|| vec![0.0; cardinality]);
                if let Some(slot) = row.get_mut(c.value.index()) {
                    *slot += 1.0;
                }
            }
        }
        Ok(counts)
    }

    fn is_unseated(&self, id: NodeId) -> bool {
        matches!(self.node(id), Ok(Node::DirichletProcess(n)) if !n.seated)
    }

    /// Dumps every node, its value and its children.
    pub fn dump(&self) -> NetworkDump<'_> {
        NetworkDump { network: self }
    }
}

fn check_alpha(alpha: f64) -> Result<(), NetError> {
    if alpha.is_finite() && alpha >= 0.0 {
        Ok(())
    } else {
        Err(NetError::InvalidArgument(format!(
            "Dirichlet parameter must be non-negative, got {alpha}"
        )))
    }
}

fn wrong_kind<K: NodeKind>(id: NodeId, node: &Node) -> NetError {
    NetError::InvalidArgument(format!(
        "node #{} is a {} node, not a {} node",
        id.0,
        node.kind_name(),
        K::KIND
    ))
}

/// A value provided by a node, as seen by the nodes that refer to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ValueRef {
    Discrete(NodeId),
    Table(NodeId),
    ConditionalTable(NodeId),
    Process(NodeId),
}

impl ValueRef {
    fn provided_by(id: NodeId, node: &Node) -> SmallVec<[ValueRef; 1]> {
        let mut provided = SmallVec::new();
        if node.discrete_value().is_some() {
            provided.push(ValueRef::Discrete(id));
        }
        if node.probability_table().is_some() {
            provided.push(ValueRef::Table(id));
        }
        if node.conditional_table().is_some() {
            provided.push(ValueRef::ConditionalTable(id));
        }
        if matches!(node, Node::DirichletProcessParameters(_)) {
            provided.push(ValueRef::Process(id));
        }
        provided
    }
}

fn resolve(table: &FxHashMap<ValueRef, NodeId>, wanted: ValueRef) -> Result<NodeId, NetError> {
    table.get(&wanted).copied().ok_or_else(|| {
        NetError::Logic(format!(
            "inconsistent network: parent {wanted:?} does not precede its child"
        ))
    })
}

pub struct NetworkDump<'a> {
    network: &'a BayesNetwork,
}

impl fmt::Display for NetworkDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let net = self.network;
        writeln!(f, "Vertices of the Bayesian network:")?;
        for id in net.node_ids() {
            let Ok(node) = net.node(id) else { continue };
            write!(f, "  #{} {} '{}'", id.0, node.kind_name(), net.node_name(node))?;
            if let Some(value) = node.discrete_value() {
                if !value.is_empty() {
                    write!(f, " = {}", value.display(&net.domains))?;
                }
            }
            if node.is_evidence() && !matches!(node, Node::Constant(_)) {
                write!(f, " [evidence]")?;
            }
            if let Some(table) = node.probability_table() {
                write!(f, " {{")?;
                for (v, p) in table.iter() {
                    write!(f, " {}={p:.4}", v.display(&net.domains))?;
                }
                write!(f, " }}")?;
            }
            if let Node::DirichletProcessParameters(params) = node {
                write!(f, " occupancy:")?;
                for (c, n) in &params.counters {
                    write!(f, " {}={n}", c.display(&net.domains))?;
                }
            }
            let children: Vec<String> = node.children().iter().map(|c| format!("#{}", c.0)).collect();
            if !children.is_empty() {
                write!(f, " -> [{}]", children.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
