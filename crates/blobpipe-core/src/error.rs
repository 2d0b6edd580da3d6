//! Error types for blobpipe core operations.
//!
//! This module defines the error types used throughout the `blobpipe-core` crate.

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in blobpipe core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A digest string is not of the form `algorithm:encoded`.
    #[error("Invalid digest '{digest}': {reason}")]
    InvalidDigest {
        /// The rejected digest string.
        digest: String,
        /// Reason the digest was rejected.
        reason: String,
    },

    /// A label could not be applied to a content record.
    #[error("Invalid label '{key}': {reason}")]
    InvalidLabel {
        /// Label key.
        key: String,
        /// Reason the label was rejected.
        reason: String,
    },
}
