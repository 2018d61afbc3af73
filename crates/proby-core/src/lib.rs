//! # Proby Core
//!
//! Discrete Bayesian networks with exact enumeration, Gibbs sampling,
//! conjugate parameter learning and Dirichlet-process mixtures.
//!
//! ```
//! use proby_core::{BayesNetwork, ProbabilityTable};
//!
//! let mut net = BayesNetwork::new();
//! let coin = net.boolean("Coin", true)?;
//! let table = ProbabilityTable::for_value(net.domains(), coin)?;
//! let prior = net.add_dirichlet(table, 1.0)?;
//! let toss = net.add_categorical(coin, Some(prior))?;
//! net.set_evidence(toss, true)?;
//! net.learn()?;
//!
//! let query = net.add_categorical(coin, Some(prior))?;
//! let posterior = net.enumerate(query)?;
//! assert!((posterior.get(coin) - 2.0 / 3.0).abs() < 1e-12);
//! # Ok::<(), proby_core::NetError>(())
//! ```

pub mod engine;
pub mod scenarios;

pub use engine::distribution::CategoricalDistribution;
pub use engine::domain::{DomainId, DomainRegistry};
pub use engine::errors::NetError;
pub use engine::gibbs::{ConvergedSample, ConvergenceConfig, SamplerPhase, SamplingConfig};
pub use engine::network::{BayesNetwork, DEFAULT_SEED};
pub use engine::node::{
    CategoricalNode, ConditionalCategoricalNode, ConditionalDirichletNode, ConstantNode,
    ConstantValue, DirichletNode, DirichletProcessNode, DirichletProcessParametersNode, Node,
    NodeId, NodeKind,
};
pub use engine::tables::{ConditionalProbabilityTable, ProbabilityTable};
pub use engine::value::{DiscreteValue, JointValue, Range};
pub use scenarios::{AlarmNodes, BagOptions, Record};
