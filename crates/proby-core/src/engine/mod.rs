//! The inference engine for discrete Bayesian networks.
//!
//! This module provides:
//! - **errors**: the [`NetError`](errors::NetError) type shared by every operation
//! - **domain** / **value**: named domains, discrete values, ranges and joint values
//! - **tables** / **distribution**: probability tables and result distributions
//! - **kernels**: scalar numeric kernels (normalisation, Dirichlet draws, marginals)
//! - **node** / **network**: node kinds and the insertion-ordered node arena
//! - **enumerate**: exact inference by enumeration
//! - **gibbs**: Gibbs sampling, fixed-length and convergence-driven
//! - **learn**: conjugate MAP / ML parameter learning
//! - **process**: Dirichlet-process component management

pub mod distribution;
pub mod domain;
pub mod enumerate;
pub mod errors;
pub mod gibbs;
pub mod kernels;
pub mod learn;
pub mod network;
pub mod node;
pub mod process;
pub mod tables;
pub mod value;
