//! Dirichlet-process component management.
//!
//! Indicator nodes pick a mixture component through a Polya urn: an occupied
//! component `c` is chosen with weight `count(c) × Π child likelihoods`, a new
//! component with weight `concentration × Π marginal(m)` where `marginal(m)` is
//! the Dirichlet-multinomial marginal likelihood of the indicator's children
//! under the prior of managed table `m`.
//!
//! Opening a new component first reuses the lowest empty component. Only when
//! every component is occupied does the component domain grow by one, and
//! every managed table is then extended: joint condition keys are recomputed
//! for the new cardinality, existing rows are carried over and the rows of the
//! new component are drawn from the prior updated with the observations
//! already seated there.

use std::collections::BTreeMap;

use smallvec::SmallVec;
use tracing::{debug, trace};

use super::domain::{radix_compose, radix_decompose, DomainId};
use super::errors::NetError;
use super::kernels;
use super::network::BayesNetwork;
use super::node::{
    ConditionalDirichletNode, DirichletProcessNode, DirichletProcessParametersNode, Node, NodeId,
};
use super::tables::ProbabilityTable;
use super::value::DiscreteValue;

impl BayesNetwork {
    /// Weight of opening a new component for `indicator`:
    /// `concentration × Π_m marginal(m)` over the managed tables.
    pub fn new_component_weight(&self, indicator: NodeId) -> Result<f64, NetError> {
        let parameters = self.get::<DirichletProcessNode>(indicator)?.parameters;
        let params = self.get::<DirichletProcessParametersNode>(parameters)?;
        let mut weight = params.concentration;
        for &managed in &params.managed {
            let table_node = self.get::<ConditionalDirichletNode>(managed)?;
            let variable = table_node.value.variable();
            let prior = self.prior_weights(&table_node.parameters, variable);
            let mut counts = vec![0usize; prior.len()];
            for &child in self.node(indicator)?.children() {
                if let Node::ConditionalCategorical(c) = self.node(child)? {
                    if c.probabilities != managed {
                        continue;
                    }
                    if let Some(slot) = counts.get_mut(c.value.index()) {
                        *slot += 1;
                    }
                }
            }
            weight *= kernels::dirichlet_multinomial_marginal(&prior, &counts);
        }
        Ok(weight)
    }

    /// Marks every indicator of `parameters` unseated and zeroes the
    /// occupancy counters.
    pub(crate) fn reset_process(&mut self, parameters: NodeId) -> Result<(), NetError> {
        let indicators = self.node(parameters)?.children().to_vec();
        let params = self.get_mut::<DirichletProcessParametersNode>(parameters)?;
        params.counters.values_mut().for_each(|n| *n = 0);
        for indicator in indicators {
            if let Ok(n) = self.get_mut::<DirichletProcessNode>(indicator) {
                n.seated = false;
            }
        }
        Ok(())
    }

    /// Seats an unseated indicator by a draw from the prior urn.
    pub(crate) fn seat_from_prior(&mut self, indicator: NodeId) -> Result<(), NetError> {
        let parameters = self.get::<DirichletProcessNode>(indicator)?.parameters;
        let params = self.get::<DirichletProcessParametersNode>(parameters)?;
        let (components, mut weights) = occupied(params);
        weights.push(params.concentration);
        self.seat_by_weights(indicator, parameters, &components, &weights)
    }

    /// One Gibbs step for an indicator.
    pub(crate) fn resample_indicator(&mut self, indicator: NodeId) -> Result<(), NetError> {
        let (parameters, seated, seat) = {
            let n = self.get::<DirichletProcessNode>(indicator)?;
            (n.parameters, n.seated, n.value)
        };
        if seated {
            self.release_seat(parameters, seat)?;
            self.get_mut::<DirichletProcessNode>(indicator)?.seated = false;
        }

        let params = self.get::<DirichletProcessParametersNode>(parameters)?;
        let (components, mut weights) = occupied(params);
        let children = self.node(indicator)?.children().to_vec();
        for (component, weight) in components.iter().zip(weights.iter_mut()) {
            for &child in &children {
                *weight *= self.local_probability(child, Some((indicator, *component)))?;
            }
        }
        weights.push(self.new_component_weight(indicator)?);
        trace!(indicator = indicator.0, ?weights, "indicator weights");
        self.seat_by_weights(indicator, parameters, &components, &weights)
    }

    /// Gives back the seat an indicator held at `seat`.
    pub(crate) fn release_seat(
        &mut self,
        parameters: NodeId,
        seat: DiscreteValue,
    ) -> Result<(), NetError> {
        let params = self.get_mut::<DirichletProcessParametersNode>(parameters)?;
        match params.counters.get_mut(&seat) {
            Some(n) if *n > 0 => {
                *n -= 1;
                Ok(())
            }
            _ => Err(NetError::Logic(format!(
                "component {} of '{}' has no seat to release",
                seat.index(),
                params.name
            ))),
        }
    }

    /// Draws from `weights` (one per entry of `components`, plus a trailing
    /// weight for a new component) and seats the indicator accordingly.
    fn seat_by_weights(
        &mut self,
        indicator: NodeId,
        parameters: NodeId,
        components: &[DiscreteValue],
        weights: &[f64],
    ) -> Result<(), NetError> {
        let choice = kernels::draw_index(&mut self.rng, weights).ok_or_else(|| {
            NetError::Numerical("every component weight of the indicator is zero".into())
        })?;
        let (component, created) = match components.get(choice) {
            Some(&existing) => (existing, false),
            None => self.open_component(parameters)?,
        };

        let n = self.get_mut::<DirichletProcessNode>(indicator)?;
        n.value = component;
        n.seated = true;
        let params = self.get_mut::<DirichletProcessParametersNode>(parameters)?;
        *params.counters.entry(component).or_insert(0) += 1;
        let (managed, component_domain) = (params.managed.clone(), params.component_domain);

        if created {
            for table_node in managed {
                self.extend_managed(table_node, component_domain, component.index())?;
            }
            debug!(
                domain = self.domains.name(component_domain),
                component = component.index(),
                "created mixture component"
            );
        } else {
            self.resample_component(parameters, component)?;
        }
        Ok(())
    }

    /// Picks the lowest empty component, or grows the component domain by
    /// one when every component is occupied. The flag tells whether the
    /// component is new.
    fn open_component(&mut self, parameters: NodeId) -> Result<(DiscreteValue, bool), NetError> {
        let params = self.get::<DirichletProcessParametersNode>(parameters)?;
        let component_domain = params.component_domain;
        let empty = self
            .domains
            .range(component_domain)
            .iter()
            .find(|&c| params.count(c) == 0);
        if let Some(component) = empty {
            return Ok((component, false));
        }

        let old_cardinality = self.domains.cardinality(component_domain);
        self.domains.grow(component_domain, old_cardinality + 1)?;
        let component = DiscreteValue::new(component_domain, old_cardinality);
        self.get_mut::<DirichletProcessParametersNode>(parameters)?
            .counters
            .insert(component, 0);
        Ok((component, true))
    }

    /// Redraws every row of every managed table that belongs to `component`
    /// from the prior and the observations currently seated there.
    fn resample_component(
        &mut self,
        parameters: NodeId,
        component: DiscreteValue,
    ) -> Result<(), NetError> {
        let params = self.get::<DirichletProcessParametersNode>(parameters)?;
        let component_domain = params.component_domain;
        for table_node in params.managed.clone() {
            let counts = self.row_child_counts(table_node, false)?;
            let (prior, variable, rows) = {
                let node = self.get::<ConditionalDirichletNode>(table_node)?;
                let variable = node.value.variable();
                let rows: Vec<DiscreteValue> = node.value.rows().map(|(c, _)| c).collect();
                (self.prior_weights(&node.parameters, variable), variable, rows)
            };
            for row in rows {
                if self.component_digit(row, component_domain)? != Some(component.index()) {
                    continue;
                }
                let weights = posterior_weights(&prior, counts.get(&row));
                let draw = kernels::sample_dirichlet(&mut self.rng, &weights)?;
                let mut fresh = ProbabilityTable::new(&self.domains, variable);
                fresh.assign(&draw);
                self.get_mut::<ConditionalDirichletNode>(table_node)?
                    .value
                    .insert_row(row, fresh);
            }
        }
        Ok(())
    }

    /// Re-keys a managed table after the component domain grew from
    /// `old_cardinality` by one.
    fn extend_managed(
        &mut self,
        table_node: NodeId,
        component_domain: DomainId,
        old_cardinality: usize,
    ) -> Result<(), NetError> {
        let counts = self.row_child_counts(table_node, false)?;
        let node = self.get::<ConditionalDirichletNode>(table_node)?;
        let variable = node.value.variable();
        let condition = node.value.condition();
        let prior = self.prior_weights(&node.parameters, variable);
        let old_rows: BTreeMap<DiscreteValue, ProbabilityTable> =
            node.value.rows().map(|(c, t)| (c, t.clone())).collect();

        let members = self.domains.members(condition).to_vec();
        let position = members
            .iter()
            .position(|&m| m == component_domain)
            .ok_or_else(|| {
                NetError::Logic(format!(
                    "managed table is not conditioned on '{}'",
                    self.domains.name(component_domain)
                ))
            })?;
        let new_radices: SmallVec<[usize; 4]> =
            members.iter().map(|&m| self.domains.cardinality(m)).collect();
        let mut old_radices = new_radices.clone();
        old_radices[position] = old_cardinality;

        let total: usize = new_radices.iter().product();
        let mut rows = BTreeMap::new();
        for index in 0..total {
            let digits = radix_decompose(index, &new_radices);
            let key = DiscreteValue::new(condition, index);
            let carried = if digits[position] < old_cardinality {
                let old_key = DiscreteValue::new(condition, radix_compose(&digits, &old_radices));
                old_rows.get(&old_key).cloned()
            } else {
                None
            };
            let row = match carried {
                Some(row) => row,
                None => {
                    let weights = posterior_weights(&prior, counts.get(&key));
                    let draw = kernels::sample_dirichlet(&mut self.rng, &weights)?;
                    let mut fresh = ProbabilityTable::new(&self.domains, variable);
                    fresh.assign(&draw);
                    fresh
                }
            };
            rows.insert(key, row);
        }
        self.get_mut::<ConditionalDirichletNode>(table_node)?
            .value
            .replace_rows(rows);
        Ok(())
    }

    /// Index of the `component_domain` digit of a joint condition key.
    fn component_digit(
        &self,
        key: DiscreteValue,
        component_domain: DomainId,
    ) -> Result<Option<usize>, NetError> {
        Ok(self
            .domains
            .decompose(key)?
            .iter()
            .find(|d| d.domain() == Some(component_domain))
            .map(|d| d.index()))
    }
}

/// Occupied components and their occupancy, in component order.
fn occupied(params: &DirichletProcessParametersNode) -> (Vec<DiscreteValue>, Vec<f64>) {
    params
        .counters
        .iter()
        .filter(|(_, n)| **n > 0)
        .map(|(&c, &n)| (c, n as f64))
        .unzip()
}

/// Prior plus counts, element-wise.
pub(crate) fn posterior_weights(prior: &[f64], counts: Option<&Vec<f64>>) -> Vec<f64> {
    match counts {
        Some(counts) => prior
            .iter()
            .zip(counts.iter().chain(std::iter::repeat(&0.0)))
            .map(|(a, n)| a + n)
            .collect(),
        None => prior.to_vec(),
    }
}
