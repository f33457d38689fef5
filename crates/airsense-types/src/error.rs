//! Parse errors for sensor wire data.

use thiserror::Error;

/// Errors that can occur when parsing raw characteristic data.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// Not enough bytes to parse the value.
    #[error("insufficient bytes: expected {expected}, got {actual}")]
    InsufficientBytes { expected: usize, actual: usize },

    /// A field contained a value outside its valid range.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}
