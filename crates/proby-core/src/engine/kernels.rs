//! Numeric kernels for probability vectors.
//!
//! Scalar reference implementations shared by the distribution types, the
//! Gibbs sampler, the learner and the Dirichlet-process manager.

use rand::Rng;
use rand_distr::{Distribution, Gamma};

use super::errors::NetError;

/// Tolerance used when checking that a vector sums to one.
pub const NORMALIZATION_EPSILON: f64 = 1e-9;

/// Rescales `weights` to sum to one.
///
/// A vector whose total is zero (or not finite) becomes uniform.
pub fn normalize_in_place(weights: &mut [f64]) {
    if weights.is_empty() {
        return;
    }
    let total: f64 = weights.iter().sum();
    if total > 0.0 && total.is_finite() {
        for w in weights.iter_mut() {
            *w /= total;
        }
    } else {
        let uniform = 1.0 / weights.len() as f64;
        weights.iter_mut().for_each(|w| *w = uniform);
    }
}

/// Inverse-CDF draw over unnormalised non-negative weights.
///
/// Zero-weight entries are never returned. Returns `None` when every weight
/// is zero.
pub fn draw_index<R: Rng + ?Sized>(rng: &mut R, weights: &[f64]) -> Option<usize> {
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    let target = rng.gen::<f64>() * total;
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        cumulative += w;
        last_positive = Some(i);
        if target < cumulative {
            return Some(i);
        }
    }
    // Rounding can leave `target` a hair above the final cumulative sum.
    last_positive
}

/// Draws one probability vector from `Dirichlet(parameters)` by normalising
/// independent `Gamma(a_k, 1)` variates.
///
/// Non-positive parameters produce a zero component; if every component is
/// zero the result is uniform.
pub fn sample_dirichlet<R: Rng + ?Sized>(
    rng: &mut R,
    parameters: &[f64],
) -> Result<Vec<f64>, NetError> {
    let mut draws = Vec::with_capacity(parameters.len());
    for &a in parameters {
        if !a.is_finite() {
            return Err(NetError::Numerical(format!(
                "Dirichlet parameter {a} is not finite"
            )));
        }
        if a <= 0.0 {
            draws.push(0.0);
            continue;
        }
        let gamma = Gamma::new(a, 1.0)
            .map_err(|e| NetError::Numerical(format!("Gamma({a}, 1): {e}")))?;
        draws.push(gamma.sample(rng));
    }
    normalize_in_place(&mut draws);
    Ok(draws)
}

/// Dirichlet-multinomial marginal likelihood of a count vector.
///
/// `Π_v Π_{i<count_v} (α_v + i) / Π_{i<total} (Σα + i)`, evaluated in log
/// space. An all-zero count vector has marginal 1; a positive count under a
/// zero parameter has marginal 0.
pub fn dirichlet_multinomial_marginal(parameters: &[f64], counts: &[usize]) -> f64 {
    if parameters
        .iter()
        .zip(counts)
        .any(|(&alpha, &count)| alpha <= 0.0 && count > 0)
    {
        return 0.0;
    }
    let alpha_sum: f64 = parameters.iter().sum();
    let mut log_marginal = 0.0;
    let mut total = 0usize;
    for (&alpha, &count) in parameters.iter().zip(counts) {
        for i in 0..count {
            log_marginal += (alpha + i as f64).ln();
        }
        total += count;
    }
    for i in 0..total {
        log_marginal -= (alpha_sum + i as f64).ln();
    }
    log_marginal.exp()
}
