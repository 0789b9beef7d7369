//! Server session bookkeeping.
//!
//! One session exists per accepted TCP connection, and one for the lifetime
//! of a bound UDP socket. Counters are logged when the session closes.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::transport::Transport;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerSessionId(u64);

impl ServerSessionId {
    /// Allocate the next identifier.
    pub fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ServerSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Per-endpoint receive session.
#[derive(Debug)]
pub struct ServerSession {
    id: ServerSessionId,

    /// Peer address for stream sessions; bound address for datagram ones.
    addr: SocketAddr,

    transport: Transport,

    frames_received: u64,

    bytes_received: u64,

    decode_errors: u64,

    created_at: Instant,
}

impl ServerSession {
    /// Create a new session.
    pub fn new(addr: SocketAddr, transport: Transport) -> Self {
        Self {
            id: ServerSessionId::next(),
            addr,
            transport,
            frames_received: 0,
            bytes_received: 0,
            decode_errors: 0,
            created_at: Instant::now(),
        }
    }

    /// Get the session ID.
    pub fn id(&self) -> ServerSessionId {
        self.id
    }

    /// Get the session address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the transport kind.
    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Record one received frame of `len` bytes.
    pub fn record_frame(&mut self, len: usize) {
        self.frames_received += 1;
        self.bytes_received += len as u64;
    }

    /// Record a frame that failed to decode.
    pub fn record_decode_error(&mut self) {
        self.decode_errors += 1;
    }

    /// Frames received so far.
    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    /// Payload bytes received so far.
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Frames dropped as malformed.
    pub fn decode_errors(&self) -> u64 {
        self.decode_errors
    }

    /// Get session age.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    #[test]
    fn test_session_ids_unique() {
        let a = ServerSession::new(addr(), Transport::Stream);
        let b = ServerSession::new(addr(), Transport::Stream);
        assert_ne!(a.id(), b.id());
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_session_id_display() {
        let id = ServerSessionId(0x2a);
        assert_eq!(id.to_string(), "0000002a");
    }

    #[test]
    fn test_session_counters() {
        let mut session = ServerSession::new(addr(), Transport::Datagram);
        session.record_frame(12);
        session.record_frame(20);
        session.record_decode_error();

        assert_eq!(session.frames_received(), 2);
        assert_eq!(session.bytes_received(), 32);
        assert_eq!(session.decode_errors(), 1);
        assert_eq!(session.transport(), Transport::Datagram);
        assert_eq!(session.addr(), addr());
    }

    #[test]
    fn test_session_age() {
        let session = ServerSession::new(addr(), Transport::Stream);
        std::thread::sleep(Duration::from_millis(5));
        assert!(session.age() >= Duration::from_millis(5));
    }
}
