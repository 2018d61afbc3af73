//! Gibbs sampling over all non-evidence nodes.
//!
//! A run moves through [`SamplerPhase::Init`], [`SamplerPhase::BurnIn`],
//! [`SamplerPhase::Collect`] and [`SamplerPhase::Done`]. Every sweep visits the
//! non-evidence nodes in insertion order and redraws each one from its full
//! conditional given the current values of all other nodes:
//!
//! - categorical nodes: own local probability times the local probabilities
//!   of their children, for every candidate value;
//! - Dirichlet nodes: prior parameters plus one count per child value;
//! - conditional Dirichlet nodes: the same, row by row;
//! - Dirichlet-process indicators: the Polya urn of the `process` module.
//!
//! The collect phase counts the query's value after every sweep.

use rand::Rng;
use tracing::{debug, info, trace};

use super::distribution::CategoricalDistribution;
use super::errors::NetError;
use super::kernels;
use super::network::BayesNetwork;
use super::node::{Node, NodeId};
use super::process::posterior_weights;
use super::value::DiscreteValue;

/// Fixed-length sampling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingConfig {
    /// Sweeps discarded before collection starts.
    pub burn_in: usize,
    /// Sweeps whose query value is counted.
    pub collect: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            burn_in: 100,
            collect: 1000,
        }
    }
}

impl SamplingConfig {
    pub fn validate(self) -> Result<Self, NetError> {
        if self.collect == 0 {
            return Err(NetError::InvalidArgument(
                "sampling must collect at least one sweep".into(),
            ));
        }
        Ok(self)
    }
}

/// Sampling run that stops once successive estimates agree.
///
/// After burn-in the chain is swept in windows of `window` iterations. At the
/// end of each window the normalised estimate is compared with the estimate
/// at the previous window boundary; the run stops when the largest
/// per-value difference drops below `threshold`, or after `max_iterations`
/// collected sweeps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceConfig {
    pub burn_in: usize,
    pub window: usize,
    pub threshold: f64,
    pub max_iterations: usize,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            burn_in: 100,
            window: 100,
            threshold: 1e-3,
            max_iterations: 100_000,
        }
    }
}

impl ConvergenceConfig {
    pub fn validate(self) -> Result<Self, NetError> {
        if self.window == 0 {
            return Err(NetError::InvalidArgument("window must be positive".into()));
        }
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(NetError::InvalidArgument(format!(
                "threshold must be positive and finite, got {}",
                self.threshold
            )));
        }
        if self.max_iterations < self.window {
            return Err(NetError::InvalidArgument(format!(
                "max_iterations ({}) must cover at least one window ({})",
                self.max_iterations, self.window
            )));
        }
        Ok(self)
    }
}

/// Result of [`BayesNetwork::sample_until_converged`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergedSample {
    pub distribution: CategoricalDistribution,
    /// Collected sweeps actually run.
    pub iterations: usize,
    /// Whether the stopping rule fired before `max_iterations`.
    pub converged: bool,
    /// Difference between the last two window estimates.
    pub last_delta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerPhase {
    Init,
    BurnIn,
    Collect,
    Done,
}

/// What a sweep does with one node.
enum Move {
    Discrete(DiscreteValue),
    Table,
    Rows,
    Process,
    Indicator,
    Fixed,
}

impl Move {
    fn for_node(node: &Node) -> Move {
        match node {
            Node::Categorical(n) if !n.evidence => Move::Discrete(n.value),
            Node::ConditionalCategorical(n) if !n.evidence => Move::Discrete(n.value),
            Node::Dirichlet(n) if !n.evidence => Move::Table,
            Node::ConditionalDirichlet(n) if !n.evidence => Move::Rows,
            Node::DirichletProcessParameters(_) => Move::Process,
            Node::DirichletProcess(_) => Move::Indicator,
            _ => Move::Fixed,
        }
    }
}

impl BayesNetwork {
    /// Estimates the distribution of `query` with `collect` sweeps after
    /// `burn_in` discarded sweeps.
    pub fn sample(
        &mut self,
        query: NodeId,
        burn_in: usize,
        collect: usize,
    ) -> Result<CategoricalDistribution, NetError> {
        self.sample_with(query, &SamplingConfig { burn_in, collect })
    }

    pub fn sample_with(
        &mut self,
        query: NodeId,
        config: &SamplingConfig,
    ) -> Result<CategoricalDistribution, NetError> {
        let config = config.validate()?;
        let mut counts = self.empty_estimate(query)?;
        info!(
            query = query.0,
            burn_in = config.burn_in,
            collect = config.collect,
            "gibbs sampling"
        );

        let mut phase = SamplerPhase::Init;
        loop {
            debug!(?phase, "sampler phase");
            phase = match phase {
                SamplerPhase::Init => {
                    self.initialize_chain()?;
                    SamplerPhase::BurnIn
                }
                SamplerPhase::BurnIn => {
                    for _ in 0..config.burn_in {
                        self.sweep()?;
                    }
                    SamplerPhase::Collect
                }
                SamplerPhase::Collect => {
                    for _ in 0..config.collect {
                        self.sweep()?;
                        counts.add(self.value(query)?, 1.0);
                    }
                    SamplerPhase::Done
                }
                SamplerPhase::Done => break,
            };
        }
        counts.normalize();
        Ok(counts)
    }

    /// Samples in windows until two successive estimates differ by less than
    /// `config.threshold` everywhere, or `config.max_iterations` is reached.
    pub fn sample_until_converged(
        &mut self,
        query: NodeId,
        config: &ConvergenceConfig,
    ) -> Result<ConvergedSample, NetError> {
        let config = config.validate()?;
        let mut counts = self.empty_estimate(query)?;
        self.initialize_chain()?;
        for _ in 0..config.burn_in {
            self.sweep()?;
        }

        let mut previous: Option<CategoricalDistribution> = None;
        let mut iterations = 0;
        let mut last_delta = f64::INFINITY;
        let mut converged = false;
        while iterations < config.max_iterations {
            let steps = config.window.min(config.max_iterations - iterations);
            for _ in 0..steps {
                self.sweep()?;
                counts.add(self.value(query)?, 1.0);
            }
            iterations += steps;

            let mut estimate = counts.clone();
            estimate.normalize();
            if let Some(prev) = &previous {
                last_delta = estimate.max_abs_difference(prev);
                trace!(iterations, last_delta, "window estimate");
                if last_delta < config.threshold {
                    converged = true;
                    break;
                }
            }
            previous = Some(estimate);
        }
        info!(iterations, converged, last_delta, "convergence sampling finished");

        counts.normalize();
        Ok(ConvergedSample {
            distribution: counts,
            iterations,
            converged,
            last_delta,
        })
    }

    /// Zero-weight estimate over the query's current domain.
    fn empty_estimate(&self, query: NodeId) -> Result<CategoricalDistribution, NetError> {
        let domain = self.value(query)?.require_domain()?;
        Ok(self.domains.range(domain).iter().map(|v| (v, 0.0)).collect())
    }

    /// Random starting state: uniform values for hidden discrete nodes,
    /// prior draws for hidden tables, prior urn seats for indicators.
    pub(crate) fn initialize_chain(&mut self) -> Result<(), NetError> {
        let order = self.node_ids();
        let mut indicators = Vec::new();
        for &id in &order {
            match Move::for_node(self.node(id)?) {
                Move::Discrete(value) => self.draw_uniform(id, value)?,
                Move::Table => self.draw_table(id, false)?,
                Move::Rows => self.draw_rows(id, false)?,
                Move::Process => self.reset_process(id)?,
                Move::Indicator => indicators.push(id),
                Move::Fixed => {}
            }
        }
        for indicator in indicators {
            self.seat_from_prior(indicator)?;
        }
        Ok(())
    }

    /// One pass over every non-evidence node.
    pub(crate) fn sweep(&mut self) -> Result<(), NetError> {
        for id in self.node_ids() {
            match Move::for_node(self.node(id)?) {
                Move::Discrete(value) => self.resample_discrete(id, value)?,
                Move::Table => self.draw_table(id, true)?,
                Move::Rows => self.draw_rows(id, true)?,
                Move::Indicator => self.resample_indicator(id)?,
                Move::Process | Move::Fixed => {}
            }
        }
        trace!("sweep complete");
        Ok(())
    }

    fn draw_uniform(&mut self, id: NodeId, current: DiscreteValue) -> Result<(), NetError> {
        let cardinality = self.domains.cardinality(current.require_domain()?);
        if cardinality == 0 {
            return Err(NetError::network(format!(
                "node #{} has an empty domain",
                id.0
            )));
        }
        let index = self.rng.gen_range(0..cardinality);
        self.set_value(id, current.with_index(index))
    }

    /// Redraws a categorical node from its full conditional.
    fn resample_discrete(&mut self, id: NodeId, current: DiscreteValue) -> Result<(), NetError> {
        let range = self.domains.range(current.require_domain()?);
        let children = self.node(id)?.children().to_vec();
        let mut weights = Vec::with_capacity(range.size());
        for candidate in range.iter() {
            let over = Some((id, candidate));
            let mut w = self.local_probability(id, over)?;
            for &child in &children {
                if w == 0.0 {
                    break;
                }
                w *= self.local_probability(child, over)?;
            }
            weights.push(w);
        }
        let index = match kernels::draw_index(&mut self.rng, &weights) {
            Some(index) => index,
            // Contradictory evidence leaves no candidate; restart uniformly.
            None => self.rng.gen_range(0..range.size().max(1)),
        };
        self.set_value(id, current.with_index(index))
    }

    /// Redraws a Dirichlet node from its prior, updated with child counts
    /// when `with_children` is set.
    fn draw_table(&mut self, id: NodeId, with_children: bool) -> Result<(), NetError> {
        let prior = match self.node(id)? {
            Node::Dirichlet(n) => self.prior_weights(&n.parameters, n.value.variable()),
            other => {
                return Err(NetError::network(format!(
                    "expected a Dirichlet node, found {}",
                    other.kind_name()
                )))
            }
        };
        let weights = if with_children {
            let counts = self.table_child_counts(id, false)?;
            posterior_weights(&prior, Some(&counts))
        } else {
            prior
        };
        let draw = kernels::sample_dirichlet(&mut self.rng, &weights)?;
        if let Node::Dirichlet(n) = self.node_mut(id)? {
            n.value.assign(&draw);
        }
        Ok(())
    }

    /// Redraws every row of a conditional Dirichlet node.
    fn draw_rows(&mut self, id: NodeId, with_children: bool) -> Result<(), NetError> {
        let (prior, rows) = match self.node(id)? {
            Node::ConditionalDirichlet(n) => (
                self.prior_weights(&n.parameters, n.value.variable()),
                n.value.rows().map(|(c, _)| c).collect::<Vec<_>>(),
            ),
            other => {
                return Err(NetError::network(format!(
                    "expected a conditional Dirichlet node, found {}",
                    other.kind_name()
                )))
            }
        };
        let counts = if with_children {
            self.row_child_counts(id, false)?
        } else {
            Default::default()
        };
        for row in rows {
            let weights = posterior_weights(&prior, counts.get(&row));
            let draw = kernels::sample_dirichlet(&mut self.rng, &weights)?;
            if let Node::ConditionalDirichlet(n) = self.node_mut(id)? {
                n.value.row_mut(row)?.assign(&draw);
            }
        }
        Ok(())
    }
}
