//! Unified error types for the marketplace.
//!
//! Domain errors (validation, not found, authorization, conflict) are meant to
//! be shown to the caller as-is. Store, transaction and configuration faults are
//! logged by the HTTP layer and surfaced as a generic failure.

use sea_orm::DbErr;
use thiserror::Error;

/// All failures produced by the marketplace core.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input. Never retried.
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// Referenced entity is absent or soft-deleted.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of entity ("advertisement", "vehicle", "user")
        entity: &'static str,
        /// Identifier that was looked up
        id: i64,
    },

    /// Actor lacks the required relationship to the entity.
    #[error("Not authorized: {message}")]
    Authorization {
        /// Why access was denied
        message: String,
    },

    /// A state-machine precondition was violated.
    #[error("Conflict: {message}")]
    Conflict {
        /// Which precondition failed
        message: String,
    },

    /// Underlying store failure.
    #[error("Database error: {0}")]
    Persistence(#[from] DbErr),

    /// An atomic unit failed after work was attempted; it has been rolled back.
    #[error("Transaction failed and was rolled back: {message}")]
    Transaction {
        /// Underlying cause
        message: String,
    },

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// I/O failure (binding the listener, reading files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::Authorization`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    /// Whether this is a system fault rather than a caller-visible domain outcome.
    #[must_use]
    pub const fn is_system_fault(&self) -> bool {
        matches!(
            self,
            Self::Persistence(_) | Self::Transaction { .. } | Self::Config { .. } | Self::Io(_)
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
