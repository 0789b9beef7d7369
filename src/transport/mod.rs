//! Transport layer shared by the client and server.
//!
//! - **Framing**: [`Transport`] selection, [`encode_frame`] and
//!   [`FrameBuffer`] for length-prefixed streams
//! - **Links**: [`Link`] wrapping a connected UDP socket or TCP stream
//! - **Connection state**: [`ConnectionState`], [`RetryPolicy`] and the
//!   shared [`AttemptCounter`]
//! - **Errors**: [`TransportError`] with retry/closed-session classification
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Client / Server                  │
//! ├─────────────────────────────────────────┤
//! │         Transport Layer                 │  ← This module
//! │   framing, links, connection state      │
//! ├─────────────────────────────────────────┤
//! │         Binary Codec                    │
//! ├─────────────────────────────────────────┤
//! │           UDP / TCP                     │
//! └─────────────────────────────────────────┘
//! ```

mod connection;
mod error;
mod framing;
mod socket;

pub use connection::*;
pub use error::*;
pub use framing::*;
pub use socket::*;
