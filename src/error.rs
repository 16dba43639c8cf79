//! Error types for the calculation layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Calc Error Enum ==
/// Unified error type for caching and scheduling.
///
/// Cache misses are not errors; `CacheStore::get` reports them as `None`.
/// The enum is `Clone` so one failed computation can be handed to every
/// caller that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalcError {
    /// Rejected by a caller-supplied calculation function
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An argument could not be turned into a cache key
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Work abandoned because its owner was torn down
    #[error("Calculation cancelled")]
    Cancelled,

    /// A queued calculation panicked
    #[error("Calculation panicked: {0}")]
    TaskPanicked(String),

    /// No tokio runtime available to host the queue drain task
    #[error("No tokio runtime available")]
    NoRuntime,
}

impl CalcError {
    /// Shorthand for calculation functions rejecting their arguments.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        CalcError::InvalidInput(msg.into())
    }
}

impl From<serde_json::Error> for CalcError {
    fn from(err: serde_json::Error) -> Self {
        CalcError::KeyDerivation(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the calculation layer.
pub type Result<T> = std::result::Result<T, CalcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_message() {
        let err = CalcError::invalid_input("rate must be finite");
        assert_eq!(err.to_string(), "Invalid input: rate must be finite");
    }

    #[test]
    fn test_serde_error_maps_to_key_derivation() {
        let bad = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: CalcError = bad.into();
        assert!(matches!(err, CalcError::KeyDerivation(_)));
    }
}
