//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Why a purchase order or quarantine command was refused. HTTP and
/// transport failures are the client crate's concern.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Missing or malformed user input; shown inline next to the field.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Status change or action not offered from the current status.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Unparseable id, status or action name.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("not found")]
    NotFound,

    /// Command would create something that already exists.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// `"<field> is required"`, the message shown next to an empty input.
    pub fn required(field: &str) -> Self {
        Self::Validation(format!("{field} is required"))
    }
}
