//! Error types for pipe, resolver and copy operations.

use std::io;

use thiserror::Error;

/// Result type alias using [`RemotesError`] as the error type.
pub type Result<T> = std::result::Result<T, RemotesError>;

/// Errors that can occur while moving content through a pipe.
#[derive(Debug, Error)]
pub enum RemotesError {
    /// The resolver could not resolve a reference.
    #[error("Failed to resolve '{reference}': {reason}")]
    Resolution {
        /// Reference that failed to resolve.
        reference: String,
        /// Reason reported by the resolver.
        reason: String,
    },

    /// An operation was called out of order.
    #[error("Precondition violated: {reason}")]
    Precondition {
        /// What was violated.
        reason: String,
    },

    /// Read or write on a pipe whose end has been closed.
    #[error("read/write on closed pipe")]
    ChannelClosed,

    /// The writer closed the pipe with an error.
    #[error("Pipe aborted by writer: {reason}")]
    Aborted {
        /// Reason given by the writer.
        reason: String,
    },

    /// The operation is not supported by this writer.
    #[error("{operation} is not supported")]
    NotSupported {
        /// Name of the rejected operation.
        operation: String,
    },

    /// A commit option failed; the commit did not happen.
    #[error("Commit option failed: {source}")]
    CommitOption {
        /// Error returned by the option.
        #[source]
        source: blobpipe_core::Error,
    },

    /// Copied byte count differs from the descriptor.
    #[error("Size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Size from the descriptor.
        expected: u64,
        /// Bytes actually copied.
        actual: u64,
    },

    /// Copied content hashes to a different digest than the descriptor.
    #[error("Digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch {
        /// Digest from the descriptor.
        expected: String,
        /// Digest of the copied bytes.
        actual: String,
    },

    /// I/O error from a source stream or sink.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RemotesError {
    /// Creates a resolution error for `reference`.
    pub fn resolution(reference: impl Into<String>, reason: impl ToString) -> Self {
        Self::Resolution {
            reference: reference.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns `true` for errors raised by a closed or aborted pipe.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::ChannelClosed | Self::Aborted { .. })
    }
}

impl From<RemotesError> for io::Error {
    fn from(err: RemotesError) -> Self {
        match err {
            RemotesError::Io(err) => err,
            err if err.is_closed() => Self::new(io::ErrorKind::BrokenPipe, err),
            err => Self::other(err),
        }
    }
}
