//! Domain error model.

use thiserror::Error;

/// Result type used across the ledger core.
pub type DomainResult<T> = Result<T, DomainError>;

/// Error returned by every core operation.
///
/// Callers distinguish failures through [`DomainError::kind`], never by parsing
/// the message text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A required field was missing or malformed (e.g. non-positive quantity).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced category, item or user does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness or referential constraint would be violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A sale or write-off asked for more units than are on hand.
    #[error("Insufficient stock. Available: {available}, requested: {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    /// The authorization gate rejected the caller.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Credentials or session could not be verified.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The storage layer failed.
    #[error("internal failure: {0}")]
    Internal(String),
}

/// Fieldless classification of [`DomainError`] for status-code mapping.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Conflict,
    InsufficientStock,
    Forbidden,
    Unauthenticated,
    InternalFailure,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn insufficient_stock(available: i64, requested: i64) -> Self {
        Self::InsufficientStock {
            available,
            requested,
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_) | DomainError::InvalidId(_) => ErrorKind::InvalidInput,
            DomainError::NotFound(_) => ErrorKind::NotFound,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            DomainError::Forbidden(_) => ErrorKind::Forbidden,
            DomainError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            DomainError::Internal(_) => ErrorKind::InternalFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_reports_both_amounts() {
        let err = DomainError::insufficient_stock(3, 5);
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(err.to_string(), "Insufficient stock. Available: 3, requested: 5");
    }

    #[test]
    fn invalid_id_is_reported_as_invalid_input() {
        assert_eq!(DomainError::invalid_id("ItemId: bad").kind(), ErrorKind::InvalidInput);
        assert_eq!(DomainError::validation("x").kind(), ErrorKind::InvalidInput);
    }
}
