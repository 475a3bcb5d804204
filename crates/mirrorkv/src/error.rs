//! Error types for MirrorKV
//!
//! Mutations and open can fail; cache-only reads never do. Absence is
//! signaled through `Option`/`bool` results, not errors.

use thiserror::Error;

/// Common result type for MirrorKV operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for MirrorKV
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Durable(#[from] mirrorkv_durable::DurableError),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Check if this error came from the durable medium rather than from
    /// argument validation.
    #[must_use]
    pub fn is_durable(&self) -> bool {
        matches!(self, Self::Durable(_))
    }
}
