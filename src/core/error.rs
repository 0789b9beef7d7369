//! Error types for the OSC crate.

use thiserror::Error;

use crate::codec::{DecodeError, EncodeError};
#[cfg(feature = "transport")]
use crate::transport::TransportError;

/// Top-level OSC errors.
///
/// Codec errors are local to one frame or packet. Connectivity failures are
/// only surfaced after the retry policy has been exhausted.
#[derive(Debug, Error)]
pub enum OscError {
    /// A received frame violates the OSC grammar.
    #[error("malformed packet: {0}")]
    Malformed(#[from] DecodeError),

    /// Attempted to encode a packet that fails its validity invariant.
    #[error(transparent)]
    Invalid(#[from] EncodeError),

    /// The peer could not be reached within the configured attempts.
    #[error("connectivity failure after {attempts} attempt(s): {reason}")]
    ConnectivityFailure {
        /// Number of connection attempts made.
        attempts: u32,
        /// Last failure observed.
        reason: String,
    },

    /// Write attempted on a session the peer already closed.
    #[error("write to closed session")]
    ClosedSession,

    /// Transport error that is neither a connectivity fault nor a closed session.
    #[cfg(feature = "transport")]
    #[error("transport error: {0}")]
    Transport(TransportError),

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "transport")]
impl From<TransportError> for OscError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ClosedSession(_) => OscError::ClosedSession,
            TransportError::Io(io) => OscError::Io(io),
            other => OscError::Transport(other),
        }
    }
}

/// Result type for OSC operations.
pub type OscResult<T> = Result<T, OscError>;
