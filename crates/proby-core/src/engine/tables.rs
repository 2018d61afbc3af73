//! Probability tables: one distribution per variable, or one per condition.

use std::collections::BTreeMap;

use super::domain::{DomainId, DomainRegistry};
use super::errors::NetError;
use super::kernels;
use super::value::DiscreteValue;

/// Prefix of every table name.
pub const TABLE_NAME_PREFIX: &str = "Probabilities";

/// Probabilities over the values of one domain.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityTable {
    name: String,
    variable: DomainId,
    entries: BTreeMap<DiscreteValue, f64>,
}

impl ProbabilityTable {
    /// Uniform table over the current values of `variable`.
    pub fn new(registry: &DomainRegistry, variable: DomainId) -> Self {
        let range = registry.range(variable);
        let p = if range.is_empty() {
            0.0
        } else {
            1.0 / range.size() as f64
        };
        Self {
            name: format!("{TABLE_NAME_PREFIX}{}", registry.name(variable)),
            variable,
            entries: range.iter().map(|v| (v, p)).collect(),
        }
    }

    /// Uniform table over the domain of `value`.
    pub fn for_value(registry: &DomainRegistry, value: DiscreteValue) -> Result<Self, NetError> {
        Ok(Self::new(registry, value.require_domain()?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variable(&self) -> DomainId {
        self.variable
    }

    pub fn at(&self, value: DiscreteValue) -> Result<f64, NetError> {
        self.entries.get(&value).copied().ok_or_else(|| {
            NetError::OutOfRange(format!(
                "value index {} is not in table '{}'",
                value.index(),
                self.name
            ))
        })
    }

    pub fn set(&mut self, value: DiscreteValue, probability: f64) -> Result<(), NetError> {
        self.check_domain(value)?;
        self.entries.insert(value, probability);
        Ok(())
    }

    pub fn add(&mut self, value: DiscreteValue, weight: f64) -> Result<(), NetError> {
        self.check_domain(value)?;
        *self.entries.entry(value).or_insert(0.0) += weight;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DiscreteValue, f64)> + '_ {
        self.entries.iter().map(|(v, p)| (*v, *p))
    }

    pub fn normalize(&mut self) {
        let mut weights: Vec<f64> = self.entries.values().copied().collect();
        kernels::normalize_in_place(&mut weights);
        for (w, p) in self.entries.values_mut().zip(weights) {
            *w = p;
        }
    }

    /// Replaces the table with `weights` laid out in domain order.
    pub fn assign(&mut self, weights: &[f64]) {
        self.entries = weights
            .iter()
            .enumerate()
            .map(|(i, &p)| (DiscreteValue::new(self.variable, i), p))
            .collect();
    }

    fn check_domain(&self, value: DiscreteValue) -> Result<(), NetError> {
        if value.domain() != Some(self.variable) {
            return Err(NetError::OutOfRange(format!(
                "value does not belong to the variable of table '{}'",
                self.name
            )));
        }
        Ok(())
    }
}

/// One [`ProbabilityTable`] per value of a (joint) condition domain.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalProbabilityTable {
    name: String,
    variable: DomainId,
    condition: DomainId,
    rows: BTreeMap<DiscreteValue, ProbabilityTable>,
}

impl ConditionalProbabilityTable {
    /// Uniform rows for every value of `condition`.
    ///
    /// An empty condition domain still gets one row, keyed by index 0.
    pub fn new(registry: &DomainRegistry, variable: DomainId, condition: DomainId) -> Self {
        Self {
            name: format!(
                "{TABLE_NAME_PREFIX}{}{}",
                registry.name(variable),
                registry.name(condition)
            ),
            variable,
            condition,
            rows: Self::uniform_rows(registry, variable, condition),
        }
    }

    /// Table for `variable` given the joint of `conditions`.
    pub fn for_values(
        registry: &mut DomainRegistry,
        variable: DiscreteValue,
        conditions: &[DiscreteValue],
    ) -> Result<Self, NetError> {
        let variable = variable.require_domain()?;
        let members = conditions
            .iter()
            .map(|c| c.require_domain())
            .collect::<Result<Vec<_>, _>>()?;
        let condition = registry.register_joint(&members)?;
        Ok(Self::new(registry, variable, condition))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variable(&self) -> DomainId {
        self.variable
    }

    pub fn condition(&self) -> DomainId {
        self.condition
    }

    pub fn row(&self, condition: DiscreteValue) -> Result<&ProbabilityTable, NetError> {
        self.rows.get(&condition).ok_or_else(|| self.missing_row(condition))
    }

    pub fn row_mut(&mut self, condition: DiscreteValue) -> Result<&mut ProbabilityTable, NetError> {
        let err = self.missing_row(condition);
        self.rows.get_mut(&condition).ok_or(err)
    }

    pub fn at(&self, value: DiscreteValue, condition: DiscreteValue) -> Result<f64, NetError> {
        self.row(condition)?.at(value)
    }

    pub fn rows(&self) -> impl Iterator<Item = (DiscreteValue, &ProbabilityTable)> + '_ {
        self.rows.iter().map(|(c, t)| (*c, t))
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = (DiscreteValue, &mut ProbabilityTable)> + '_ {
        self.rows.iter_mut().map(|(c, t)| (*c, t))
    }

    pub fn insert_row(&mut self, condition: DiscreteValue, row: ProbabilityTable) {
        self.rows.insert(condition, row);
    }

    /// Swaps in a complete new row set; used when the condition domain grows.
    pub(crate) fn replace_rows(&mut self, rows: BTreeMap<DiscreteValue, ProbabilityTable>) {
        self.rows = rows;
    }

    /// Drops every row and recreates uniform rows for the current condition
    /// range.
    pub fn reset(&mut self, registry: &DomainRegistry) {
        self.rows = Self::uniform_rows(registry, self.variable, self.condition);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn uniform_rows(
        registry: &DomainRegistry,
        variable: DomainId,
        condition: DomainId,
    ) -> BTreeMap<DiscreteValue, ProbabilityTable> {
        let range = registry.range(condition);
        if range.is_empty() {
            let placeholder = DiscreteValue::new(condition, 0);
            return BTreeMap::from([(placeholder, ProbabilityTable::new(registry, variable))]);
        }
        range
            .iter()
            .map(|c| (c, ProbabilityTable::new(registry, variable)))
            .collect()
    }

    fn missing_row(&self, condition: DiscreteValue) -> NetError {
        NetError::OutOfRange(format!(
            "condition index {} is not in table '{}'",
            condition.index(),
            self.name
        ))
    }
}
