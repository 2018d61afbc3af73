//! Node kinds of a Bayesian network.
//!
//! Each kind is a payload struct wrapped by [`Node`]. Parent references are
//! [`NodeId`] handles into the owning [`crate::BayesNetwork`]; every parent
//! keeps the reverse reference in its `children` list.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use super::domain::DomainId;
use super::tables::{ConditionalProbabilityTable, ProbabilityTable};
use super::value::DiscreteValue;

/// Stable handle of a node inside one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub(crate) fn slot(self) -> usize {
        self.0 as usize
    }
}

/// Condition parents of a conditional node, ordered by domain name.
pub type ConditionList = SmallVec<[NodeId; 4]>;

/// Dirichlet prior parameters keyed by variable value.
pub type Parameters = BTreeMap<DiscreteValue, f64>;

/// Value held by a constant node.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Discrete(DiscreteValue),
    Probabilities(ProbabilityTable),
    ConditionalProbabilities(ConditionalProbabilityTable),
}

impl From<DiscreteValue> for ConstantValue {
    fn from(value: DiscreteValue) -> Self {
        ConstantValue::Discrete(value)
    }
}

impl From<ProbabilityTable> for ConstantValue {
    fn from(value: ProbabilityTable) -> Self {
        ConstantValue::Probabilities(value)
    }
}

impl From<ConditionalProbabilityTable> for ConstantValue {
    fn from(value: ConditionalProbabilityTable) -> Self {
        ConstantValue::ConditionalProbabilities(value)
    }
}

/// A fixed value; always behaves as evidence with likelihood 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantNode {
    pub value: ConstantValue,
    pub children: Vec<NodeId>,
}

/// A discrete variable drawn from an unconditional probability table.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalNode {
    pub value: DiscreteValue,
    pub evidence: bool,
    /// Node providing a [`ProbabilityTable`].
    pub probabilities: NodeId,
    pub children: Vec<NodeId>,
}

/// A discrete variable drawn from the row of a conditional table selected by
/// the joint value of its condition parents.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalCategoricalNode {
    pub value: DiscreteValue,
    pub evidence: bool,
    pub conditions: ConditionList,
    /// Joint domain of `conditions`.
    pub condition_domain: DomainId,
    /// Node providing a [`ConditionalProbabilityTable`].
    pub probabilities: NodeId,
    pub children: Vec<NodeId>,
}

/// A probability table with a Dirichlet prior.
#[derive(Debug, Clone, PartialEq)]
pub struct DirichletNode {
    pub value: ProbabilityTable,
    pub parameters: Parameters,
    pub evidence: bool,
    pub children: Vec<NodeId>,
}

/// A conditional table whose rows share one Dirichlet prior.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalDirichletNode {
    pub value: ConditionalProbabilityTable,
    pub parameters: Parameters,
    pub evidence: bool,
    pub children: Vec<NodeId>,
}

/// Shared state of one Dirichlet process.
///
/// `counters` holds the number of indicators seated at each component;
/// together with `concentration` it is the Polya-urn normaliser.
#[derive(Debug, Clone, PartialEq)]
pub struct DirichletProcessParametersNode {
    pub name: String,
    pub component_domain: DomainId,
    pub concentration: f64,
    /// Conditional-Dirichlet nodes whose tables are keyed by component.
    pub managed: Vec<NodeId>,
    pub counters: BTreeMap<DiscreteValue, usize>,
    pub children: Vec<NodeId>,
}

impl DirichletProcessParametersNode {
    /// Number of seated indicators.
    pub fn occupancy(&self) -> usize {
        self.counters.values().sum()
    }

    /// Count of indicators seated at `component`.
    pub fn count(&self, component: DiscreteValue) -> usize {
        self.counters.get(&component).copied().unwrap_or(0)
    }
}

/// Component indicator of a Dirichlet process. Never evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct DirichletProcessNode {
    /// Seated component; the end sentinel of the component domain until the
    /// first seating.
    pub value: DiscreteValue,
    /// Whether `value` is counted in the parameters' occupancy.
    pub seated: bool,
    pub parameters: NodeId,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Constant(ConstantNode),
    Categorical(CategoricalNode),
    ConditionalCategorical(ConditionalCategoricalNode),
    Dirichlet(DirichletNode),
    ConditionalDirichlet(ConditionalDirichletNode),
    DirichletProcessParameters(DirichletProcessParametersNode),
    DirichletProcess(DirichletProcessNode),
}

impl Node {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Constant(_) => ConstantNode::KIND,
            Node::Categorical(_) => CategoricalNode::KIND,
            Node::ConditionalCategorical(_) => ConditionalCategoricalNode::KIND,
            Node::Dirichlet(_) => DirichletNode::KIND,
            Node::ConditionalDirichlet(_) => ConditionalDirichletNode::KIND,
            Node::DirichletProcessParameters(_) => DirichletProcessParametersNode::KIND,
            Node::DirichletProcess(_) => DirichletProcessNode::KIND,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match self {
            Node::Constant(n) => &n.children,
            Node::Categorical(n) => &n.children,
            Node::ConditionalCategorical(n) => &n.children,
            Node::Dirichlet(n) => &n.children,
            Node::ConditionalDirichlet(n) => &n.children,
            Node::DirichletProcessParameters(n) => &n.children,
            Node::DirichletProcess(n) => &n.children,
        }
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<NodeId> {
        match self {
            Node::Constant(n) => &mut n.children,
            Node::Categorical(n) => &mut n.children,
            Node::ConditionalCategorical(n) => &mut n.children,
            Node::Dirichlet(n) => &mut n.children,
            Node::ConditionalDirichlet(n) => &mut n.children,
            Node::DirichletProcessParameters(n) => &mut n.children,
            Node::DirichletProcess(n) => &mut n.children,
        }
    }

    /// Parents in reference order; a conditional node lists its conditions
    /// before its table.
    pub fn parents(&self) -> SmallVec<[NodeId; 4]> {
        match self {
            Node::Constant(_)
            | Node::Dirichlet(_)
            | Node::ConditionalDirichlet(_)
            | Node::DirichletProcessParameters(_) => SmallVec::new(),
            Node::Categorical(n) => SmallVec::from_slice(&[n.probabilities]),
            Node::ConditionalCategorical(n) => {
                let mut parents: SmallVec<[NodeId; 4]> = n.conditions.iter().copied().collect();
                parents.push(n.probabilities);
                parents
            }
            Node::DirichletProcess(n) => SmallVec::from_slice(&[n.parameters]),
        }
    }

    /// Evidence flag; constants and process parameters always count as
    /// evidence, indicators never do.
    pub fn is_evidence(&self) -> bool {
        match self {
            Node::Constant(_) | Node::DirichletProcessParameters(_) => true,
            Node::Categorical(n) => n.evidence,
            Node::ConditionalCategorical(n) => n.evidence,
            Node::Dirichlet(n) => n.evidence,
            Node::ConditionalDirichlet(n) => n.evidence,
            Node::DirichletProcess(_) => false,
        }
    }

    /// The discrete value carried by the node, if it carries one.
    pub fn discrete_value(&self) -> Option<DiscreteValue> {
        match self {
            Node::Constant(ConstantNode {
                value: ConstantValue::Discrete(v),
                ..
            }) => Some(*v),
            Node::Categorical(n) => Some(n.value),
            Node::ConditionalCategorical(n) => Some(n.value),
            Node::DirichletProcess(n) => Some(n.value),
            _ => None,
        }
    }

    pub fn probability_table(&self) -> Option<&ProbabilityTable> {
        match self {
            Node::Constant(ConstantNode {
                value: ConstantValue::Probabilities(t),
                ..
            }) => Some(t),
            Node::Dirichlet(n) => Some(&n.value),
            _ => None,
        }
    }

    pub fn conditional_table(&self) -> Option<&ConditionalProbabilityTable> {
        match self {
            Node::Constant(ConstantNode {
                value: ConstantValue::ConditionalProbabilities(t),
                ..
            }) => Some(t),
            Node::ConditionalDirichlet(n) => Some(&n.value),
            _ => None,
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Maps a node payload type to its [`Node`] variant.
pub trait NodeKind: sealed::Sealed + Sized {
    const KIND: &'static str;

    fn from_node(node: &Node) -> Option<&Self>;

    fn from_node_mut(node: &mut Node) -> Option<&mut Self>;
}

macro_rules! node_kind {
    ($ty:ident, $variant:ident, $kind:literal) => {
        impl sealed::Sealed for $ty {}

        impl NodeKind for $ty {
            const KIND: &'static str = $kind;

            fn from_node(node: &Node) -> Option<&Self> {
                match node {
                    Node::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn from_node_mut(node: &mut Node) -> Option<&mut Self> {
                match node {
                    Node::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Node {
            fn from(inner: $ty) -> Self {
                Node::$variant(inner)
            }
        }
    };
}

node_kind!(ConstantNode, Constant, "constant");
node_kind!(CategoricalNode, Categorical, "categorical");
node_kind!(
    ConditionalCategoricalNode,
    ConditionalCategorical,
    "conditional categorical"
);
node_kind!(DirichletNode, Dirichlet, "Dirichlet");
node_kind!(ConditionalDirichletNode, ConditionalDirichlet, "conditional Dirichlet");
node_kind!(
    DirichletProcessParametersNode,
    DirichletProcessParameters,
    "Dirichlet process parameters"
);
node_kind!(DirichletProcessNode, DirichletProcess, "Dirichlet process");
