//! Error types for bzwrite operations.
//!
//! Every fallible operation in the workspace returns [`BzError`]. The
//! variants follow the failure classes of the writer: misuse of a closed
//! writer, rejected arguments, broken internal invariants, blocks that
//! cannot be represented within format limits, and I/O on the sink.

use std::io;
use thiserror::Error;

/// The main error type for bzwrite operations.
#[derive(Debug, Error)]
pub enum BzError {
    /// I/O error from the underlying sink.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A write was attempted after `close()`.
    #[error("Write attempted on a closed writer")]
    ClosedWriter,

    /// An argument was rejected before any state was changed.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected argument.
        message: String,
    },

    /// An invariant inside a transform stage or the pipeline was violated.
    #[error("Internal consistency violation: {message}")]
    InternalConsistency {
        /// Description of the violated invariant.
        message: String,
    },

    /// A block's derived structures exceed the limits of the format.
    #[error("Encoding failed: {message}")]
    EncodingFailed {
        /// Description of the exceeded limit.
        message: String,
    },

    /// The background pipeline stopped; `close()` reports the cause.
    #[error("Encoding pipeline stopped; close the writer to obtain the cause")]
    PipelineAborted,
}

/// Result type alias for bzwrite operations.
pub type Result<T> = std::result::Result<T, BzError>;

impl BzError {
    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an internal consistency error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalConsistency {
            message: message.into(),
        }
    }

    /// Create an encoding failure error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }
}

impl From<BzError> for io::Error {
    fn from(err: BzError) -> Self {
        match err {
            BzError::Io(inner) => inner,
            BzError::ClosedWriter | BzError::PipelineAborted => {
                io::Error::new(io::ErrorKind::BrokenPipe, err)
            }
            BzError::InvalidArgument { .. } => io::Error::new(io::ErrorKind::InvalidInput, err),
            other => io::Error::other(other),
        }
    }
}
