//! Exact inference by enumeration.
//!
//! The query node is forced to evidence and, for every value of its domain,
//! the joint probability of all evidence is summed over every assignment of
//! the hidden discrete nodes. Nodes are visited in insertion order, which is a
//! topological order, so each local probability only depends on nodes that
//! are already assigned.
//!
//! The cost is exponential in the number of hidden nodes; this is meant for
//! small networks and as a reference for the sampler.

use tracing::debug;

use super::distribution::CategoricalDistribution;
use super::domain::DomainId;
use super::errors::NetError;
use super::network::BayesNetwork;
use super::node::{Node, NodeId};
use super::value::DiscreteValue;

/// Saved value and evidence flag of one discrete node.
struct Assignment {
    id: NodeId,
    value: DiscreteValue,
    evidence: bool,
}

enum Step {
    /// Contributes a factor of one.
    Skip,
    /// Contributes its local probability.
    Evidence,
    /// Hidden discrete node; sum over its domain.
    Sum(DiscreteValue),
    Invalid(&'static str),
}

impl BayesNetwork {
    /// Posterior distribution of `query` given every evidence node.
    ///
    /// The query must be a categorical or conditional categorical node.
    /// Values and evidence flags of all nodes are restored before returning,
    /// on success and on failure alike. Failures other than network errors and
    /// allocation failures are reported as a network error wrapping the cause.
    pub fn enumerate(&mut self, query: NodeId) -> Result<CategoricalDistribution, NetError> {
        let variable = match self.node(query)? {
            Node::Categorical(n) => n.value.require_domain()?,
            Node::ConditionalCategorical(n) => n.value.require_domain()?,
            other => {
                return Err(NetError::InvalidArgument(format!(
                    "cannot enumerate a {} node",
                    other.kind_name()
                )))
            }
        };
        debug!(query = query.0, nodes = self.size(), "enumerating");

        let saved = self.save_assignments();
        let result = self.enumerate_query(query, variable);
        self.restore_assignments(saved);
        result.map_err(|e| NetError::wrap_network("enumeration failed", e))
    }

    fn enumerate_query(
        &mut self,
        query: NodeId,
        variable: DomainId,
    ) -> Result<CategoricalDistribution, NetError> {
        let order = self.node_ids();
        self.set_evidence(query, true)?;
        let range = self.domains.range(variable);

        let mut weights = Vec::new();
        weights.try_reserve_exact(range.size())?;
        for value in range {
            self.assign(query, value)?;
            weights.push((value, self.enumerate_all(&order)?));
        }
        let mut distribution: CategoricalDistribution = weights.into_iter().collect();
        distribution.normalize();
        Ok(distribution)
    }

    /// Sum-product over `order`, front to back.
    fn enumerate_all(&mut self, order: &[NodeId]) -> Result<f64, NetError> {
        let Some((&head, rest)) = order.split_first() else {
            return Ok(1.0);
        };
        let step = match self.node(head)? {
            Node::Constant(_) | Node::DirichletProcessParameters(_) => Step::Skip,
            Node::Dirichlet(n) if !n.evidence => Step::Skip,
            Node::ConditionalDirichlet(n) if !n.evidence => Step::Skip,
            Node::Categorical(n) if n.evidence => Step::Evidence,
            Node::ConditionalCategorical(n) if n.evidence => Step::Evidence,
            Node::Categorical(n) => Step::Sum(n.value),
            Node::ConditionalCategorical(n) => Step::Sum(n.value),
            other => Step::Invalid(other.kind_name()),
        };

        match step {
            Step::Skip => self.enumerate_all(rest),
            Step::Evidence => {
                let p = self.local_probability(head, None)?;
                if p == 0.0 {
                    return Ok(0.0);
                }
                Ok(p * self.enumerate_all(rest)?)
            }
            Step::Sum(current) => {
                let range = self.domains.range(current.require_domain()?);
                let mut total = 0.0;
                for value in range {
                    self.assign(head, value)?;
                    let p = self.local_probability(head, None)?;
                    if p > 0.0 {
                        total += p * self.enumerate_all(rest)?;
                    }
                }
                self.assign(head, current)?;
                Ok(total)
            }
            Step::Invalid(kind) => Err(NetError::network(format!(
                "cannot request a probability from a node of type {kind}"
            ))),
        }
    }

    /// Writes `value` into a categorical or conditional categorical node
    /// without validation.
    fn assign(&mut self, id: NodeId, value: DiscreteValue) -> Result<(), NetError> {
        match self.node_mut(id)? {
            Node::Categorical(n) => n.value = value,
            Node::ConditionalCategorical(n) => n.value = value,
            other => {
                return Err(NetError::network(format!(
                    "cannot assign a value to a {} node",
                    other.kind_name()
                )))
            }
        }
        Ok(())
    }

    fn save_assignments(&self) -> Vec<Assignment> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| match slot.as_ref()? {
                Node::Categorical(n) => Some((n.value, n.evidence)),
                Node::ConditionalCategorical(n) => Some((n.value, n.evidence)),
                _ => None,
            }
            .map(|(value, evidence)| Assignment {
                id: NodeId(i as u32),
                value,
                evidence,
            }))
            .collect()
    }

    fn restore_assignments(&mut self, saved: Vec<Assignment>) {
        for entry in saved {
            match self.node_mut(entry.id) {
                Ok(Node::Categorical(n)) => {
                    n.value = entry.value;
                    n.evidence = entry.evidence;
                }
                Ok(Node::ConditionalCategorical(n)) => {
                    n.value = entry.value;
                    n.evidence = entry.evidence;
                }
                _ => {}
            }
        }
    }
}
