//! Error types for network construction, inference and learning.

use std::collections::TryReserveError;

use thiserror::Error;

/// Errors produced by the Bayesian network engine.
///
/// Every public operation returns `Result<T, NetError>`; library code never
/// panics on user input. The enum is `#[non_exhaustive]` so variants can be
/// added without breaking downstream matches.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum NetError {
    /// The graph is internally inconsistent (e.g. a parent that cannot be
    /// resolved during a deep copy).
    #[error("logic error: {0}")]
    Logic(String),

    /// An algorithm precondition was violated.
    ///
    /// Enumeration wraps unexpected failures of its recursion into this
    /// variant and keeps the original failure as `source`.
    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<NetError>>,
    },

    /// Unknown value, condition, node handle or name.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// A caller passed an argument the operation cannot accept.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A value without a domain was used where a domain is required.
    #[error("empty value: {0}")]
    EmptyValue(String),

    /// A domain was inserted twice into the same joint value.
    #[error("already present: {0}")]
    AlreadyPresent(String),

    /// Invalid distribution parameters (NaN/Inf, non-positive shape).
    #[error("numerical error: {0}")]
    Numerical(String),

    /// A buffer reservation failed.
    #[error("allocation failure: {0}")]
    Allocation(#[from] TryReserveError),
}

impl NetError {
    pub(crate) fn network(message: impl Into<String>) -> Self {
        NetError::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps `cause` as a network error unless it already is one, or is an
    /// allocation failure; those two pass through untouched.
    pub(crate) fn wrap_network(context: &str, cause: NetError) -> Self {
        match cause {
            NetError::Network { .. } | NetError::Allocation(_) => cause,
            other => NetError::Network {
                message: format!("{context}: {other}"),
                source: Some(Box::new(other)),
            },
        }
    }

    /// True for errors reporting a violated algorithm precondition.
    pub fn is_network(&self) -> bool {
        matches!(self, NetError::Network { .. })
    }
}
