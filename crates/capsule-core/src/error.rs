//! # Error Types
//!
//! Errors raised while constructing or serializing core values. Resolution of
//! file descriptors never fails and therefore has no error variant here.

use thiserror::Error;

/// Top-level error type for capsule-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A content id failed validation.
    #[error("invalid content id {value:?}: {reason}")]
    InvalidContentId {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A logical file path is empty after normalization.
    #[error("invalid logical path {0:?}")]
    InvalidPath(String),

    /// A timestamp could not be parsed.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// The rejected input.
        value: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// Manifest (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
