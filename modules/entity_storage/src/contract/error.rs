//! Contract error types for entity storage
//!
//! Specification errors are caller bugs and are never retried. Store errors
//! are passed through from SeaORM untouched so the caller owns retry policy.

use sea_orm::DbErr;

/// Entity storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Setter or creator does not resolve to a field-initialization shape
    #[error("invalid setter specification: {reason}")]
    InvalidSpecification {
        /// What made the specification unusable
        reason: String,
    },

    /// Setter binds no fields
    #[error("setter specification must bind at least one field")]
    EmptySpecification,

    /// Stored version differs from the version the caller last read
    #[error("version conflict on row {id}: expected version {expected}")]
    VersionConflict {
        /// Row identity
        id: i64,
        /// Version held by the caller
        expected: i64,
    },

    /// Underlying store rejected the operation
    #[error(transparent)]
    Store(#[from] DbErr),
}

impl StorageError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidSpecification {
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by the caller's specification
    pub fn is_specification_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSpecification { .. } | Self::EmptySpecification
        )
    }
}
