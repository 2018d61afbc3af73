//! Categorical distributions returned by inference.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;

use super::domain::DomainRegistry;
use super::kernels;
use super::value::DiscreteValue;

/// Ordered value → weight map.
///
/// Weights are unnormalised until [`CategoricalDistribution::normalize`] is
/// called; inference results are always normalised.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoricalDistribution {
    entries: BTreeMap<DiscreteValue, f64>,
}

impl CategoricalDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: DiscreteValue, weight: f64) {
        self.entries.insert(value, weight);
    }

    /// Adds `weight` to the entry for `value`, creating it at zero.
    pub fn add(&mut self, value: DiscreteValue, weight: f64) {
        *self.entries.entry(value).or_insert(0.0) += weight;
    }

    /// Weight of `value`; absent values have weight zero.
    pub fn get(&self, value: DiscreteValue) -> f64 {
        self.entries.get(&value).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DiscreteValue, f64)> + '_ {
        self.entries.iter().map(|(v, w)| (*v, *w))
    }

    pub fn total(&self) -> f64 {
        self.entries.values().sum()
    }

    /// Rescales to sum to one; an all-zero distribution becomes uniform.
    pub fn normalize(&mut self) {
        let mut weights: Vec<f64> = self.entries.values().copied().collect();
        kernels::normalize_in_place(&mut weights);
        for (w, p) in self.entries.values_mut().zip(weights) {
            *w = p;
        }
    }

    /// Draws a value with probability proportional to its weight.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<DiscreteValue> {
        let weights: Vec<f64> = self.entries.values().copied().collect();
        let i = kernels::draw_index(rng, &weights)?;
        self.entries.keys().nth(i).copied()
    }

    /// Expected value index under the normalised weights.
    pub fn mean(&self) -> f64 {
        let (indices, probs) = self.indexed_probabilities();
        indices.iter().zip(&probs).map(|(&i, p)| i as f64 * p).sum()
    }

    pub fn variance(&self) -> f64 {
        let (indices, probs) = self.indexed_probabilities();
        let mu: f64 = indices.iter().zip(&probs).map(|(&i, p)| i as f64 * p).sum();
        indices
            .iter()
            .zip(&probs)
            .map(|(&i, p)| (i as f64 - mu).powi(2) * p)
            .sum()
    }

    pub fn standard_deviation(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Largest per-value absolute difference to `other`.
    pub fn max_abs_difference(&self, other: &CategoricalDistribution) -> f64 {
        self.entries
            .keys()
            .chain(other.entries.keys())
            .map(|&v| (self.get(v) - other.get(v)).abs())
            .fold(0.0, f64::max)
    }

    /// Value with the largest weight (first one on ties).
    pub fn mode(&self) -> Option<DiscreteValue> {
        self.entries
            .iter()
            .fold(None, |best: Option<(DiscreteValue, f64)>, (&v, &w)| match best {
                Some((_, bw)) if bw >= w => best,
                _ => Some((v, w)),
            })
            .map(|(v, _)| v)
    }

    /// Renders as a sequence of ` (name:index,probability) ` pairs.
    pub fn display<'a>(&'a self, registry: &'a DomainRegistry) -> DistributionDisplay<'a> {
        DistributionDisplay {
            distribution: self,
            registry,
        }
    }

    fn indexed_probabilities(&self) -> (Vec<usize>, Vec<f64>) {
        let indices = self.entries.keys().map(|v| v.index()).collect();
        let mut probs: Vec<f64> = self.entries.values().copied().collect();
        kernels::normalize_in_place(&mut probs);
        (indices, probs)
    }
}

impl FromIterator<(DiscreteValue, f64)> for CategoricalDistribution {
    fn from_iter<I: IntoIterator<Item = (DiscreteValue, f64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

pub struct DistributionDisplay<'a> {
    distribution: &'a CategoricalDistribution,
    registry: &'a DomainRegistry,
}

impl fmt::Display for DistributionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (value, p) in self.distribution.iter() {
            write!(f, " ({},{}) ", value.display(self.registry), p)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::domain::DomainRegistry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn flavor(registry: &mut DomainRegistry) -> Vec<DiscreteValue> {
        let id = registry.register("Flavor", 3).unwrap();
        registry.range(id).iter().collect()
    }

    #[test]
    fn normalize_produces_probabilities() {
        let mut registry = DomainRegistry::new();
        let v = flavor(&mut registry);
        let mut d = CategoricalDistribution::new();
        d.add(v[0], 1.0);
        d.add(v[2], 3.0);
        d.add(v[2], 4.0);
        d.normalize();
        assert!((d.total() - 1.0).abs() < 1e-12);
        assert!((d.get(v[2]) - 0.875).abs() < 1e-12);
        assert_eq!(d.get(v[1]), 0.0);
        assert_eq!(d.mode(), Some(v[2]));
    }

    #[test]
    fn draw_follows_weights() {
        let mut registry = DomainRegistry::new();
        let v = flavor(&mut registry);
        let d: CategoricalDistribution = [(v[0], 0.0), (v[1], 1.0), (v[2], 0.0)]
            .into_iter()
            .collect();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            assert_eq!(d.draw(&mut rng), Some(v[1]));
        }
    }

    #[test]
    fn summary_statistics() {
        let mut registry = DomainRegistry::new();
        let v = flavor(&mut registry);
        let d: CategoricalDistribution = [(v[0], 1.0), (v[2], 1.0)].into_iter().collect();
        assert!((d.mean() - 1.0).abs() < 1e-12);
        assert!((d.variance() - 1.0).abs() < 1e-12);
        assert!((d.standard_deviation() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn display_lists_pairs() {
        let mut registry = DomainRegistry::new();
        let v = flavor(&mut registry);
        let d: CategoricalDistribution = [(v[1], 0.5)].into_iter().collect();
        assert_eq!(d.display(&registry).to_string(), " (Flavor:1,0.5) ");
    }
}
