//! Shared fixtures for the integration tests.

use proby_core::Record;

pub fn assert_close(actual: f64, expected: f64, tol: f64, label: &str) {
    assert!(
        (actual - expected).abs() <= tol,
        "{} mismatch: expected {:.15}, got {:.15}, diff={:.3e}",
        label,
        expected,
        actual,
        (actual - expected).abs()
    );
}

/// One data row from `(column, value)` pairs.
pub fn record(pairs: &[(&str, &str)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// `count` copies of the same row.
pub fn repeated(count: usize, pairs: &[(&str, &str)]) -> Vec<Record> {
    (0..count).map(|_| record(pairs)).collect()
}
