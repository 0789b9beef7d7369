//! Transport layer error types.
//!
//! Socket errors are classified once, here, so the client can tell an
//! unreachable peer (retry) from a session the peer closed (report only).

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Transport layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Peer could not be reached (refused, host or network unreachable).
    #[error("peer unreachable: {0}")]
    Unreachable(io::Error),

    /// Write attempted on a session that has already ended.
    #[error("session closed: {0}")]
    ClosedSession(io::Error),

    /// Connection attempt did not complete in time.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Stream frame larger than the configured maximum.
    #[error("frame of {size} bytes exceeds maximum of {max}")]
    FrameTooLarge {
        /// Declared frame size.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Stream frame length prefix is negative.
    #[error("negative frame length: {0}")]
    NegativeFrameLength(i32),

    /// Any other I/O error.
    #[error("i/o error: {0}")]
    Io(io::Error),
}

impl TransportError {
    /// Sort an I/O error into the transport taxonomy.
    pub fn classify(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::AddrNotAvailable => TransportError::Unreachable(err),
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof => TransportError::ClosedSession(err),
            io::ErrorKind::TimedOut => TransportError::ConnectTimeout(Duration::ZERO),
            _ => TransportError::Io(err),
        }
    }

    /// Check if this error should drive the reconnect policy.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Unreachable(_) | TransportError::ConnectTimeout(_)
        )
    }

    /// Check if this error means the peer ended the session.
    pub fn is_closed_session(&self) -> bool {
        matches!(self, TransportError::ClosedSession(_))
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        Self::classify(err)
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn io(kind: io::ErrorKind) -> io::Error {
        io::Error::new(kind, "test")
    }

    #[test]
    fn test_unreachable_errors_are_retryable() {
        for kind in [
            io::ErrorKind::ConnectionRefused,
            io::ErrorKind::HostUnreachable,
            io::ErrorKind::NetworkUnreachable,
        ] {
            let err = TransportError::classify(io(kind));
            assert!(err.is_retryable(), "{kind:?}");
            assert!(!err.is_closed_session(), "{kind:?}");
        }
        assert!(TransportError::ConnectTimeout(Duration::from_secs(1)).is_retryable());
    }

    #[test]
    fn test_closed_session_errors_are_not_retryable() {
        for kind in [
            io::ErrorKind::BrokenPipe,
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::ConnectionAborted,
        ] {
            let err = TransportError::classify(io(kind));
            assert!(err.is_closed_session(), "{kind:?}");
            assert!(!err.is_retryable(), "{kind:?}");
        }
    }

    #[test]
    fn test_other_errors() {
        let err = TransportError::from(io(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, TransportError::Io(_)));
        assert!(!err.is_retryable());
    }
}
