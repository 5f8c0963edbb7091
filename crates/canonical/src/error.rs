use thiserror::Error;

/// Errors raised by normalizer configuration checks.
///
/// Normalization itself never fails; only an invalid configuration is
/// rejected, and only when a caller validates it up front.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CanonicalError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
