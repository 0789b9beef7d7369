//! # OSC Protocol
//!
//! **O**pen **S**ound **C**ontrol packets and transport.
//!
//! OSC is a message format for real-time control of media software and
//! devices. This crate provides:
//!
//! - **Packet model**: [`Message`](packet::Message) with typed
//!   [`Argument`](packet::Argument)s, nestable [`Bundle`](packet::Bundle)s
//!   and NTP [`TimeTag`](packet::TimeTag)s
//! - **Binary codec**: bit-exact, 4-byte aligned, big-endian encoding
//! - **Client**: reconnecting UDP/TCP sender with a pending queue
//! - **Server**: UDP/TCP receiver dispatching to registered listeners
//!
//! ## Feature Flags
//!
//! - `transport` (default): framing, socket links, connection state
//! - `client` (default): [`client::OscClient`]
//! - `server` (default): [`server::OscServer`]
//!
//! The packet model and codec are always available and have no async
//! dependency.
//!
//! ## Modules
//!
//! - [`core`]: Capability traits, constants and error types
//! - [`packet`]: Packet model
//! - [`codec`]: Encoder and decoder
//! - [`transport`]: Framing and links (requires `transport` feature)
//! - [`client`]: Transport client (requires `client` feature)
//! - [`server`]: Transport server (requires `server` feature)
//!
//! ## Example Usage
//!
//! ```rust
//! use osc_protocol::prelude::*;
//!
//! let bundle = Bundle::with_timetag(TimeTag::from_unix_millis(1_700_000_000_250))
//!     .with_packet(Message::new("/synth/1/freq").with_arg(440.0f32))
//!     .with_packet(Message::new("/synth/1/gate").with_arg(true));
//!
//! let bytes = encode(&bundle.clone().into()).unwrap();
//! assert_eq!(bytes.len() % 4, 0);
//!
//! let decoded = decode(&bytes).unwrap();
//! assert_eq!(decoded, Packet::Bundle(bundle));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Packet model and codec (always included)
pub mod codec;
pub mod packet;

// Transport layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Client API (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

// Server API (feature-gated)
#[cfg(feature = "server")]
#[cfg_attr(docsrs, doc(cfg(feature = "server")))]
pub mod server;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core traits and types
    pub use crate::core::{
        BasicPacketFactory, Listener, OscError, OscResult, PacketFactory, unpack_bundle,
    };

    // Packet model and codec
    pub use crate::codec::{DecodeError, EncodeError, decode, decode_with, encode};
    pub use crate::packet::{Argument, Bundle, Message, Packet, TimeTag};

    // Transport types (when enabled)
    #[cfg(feature = "transport")]
    pub use crate::transport::{ConnectionState, Transport, TransportError};

    #[cfg(feature = "client")]
    pub use crate::client::{ClientConfig, OscClient, OscClientBuilder};

    #[cfg(feature = "server")]
    pub use crate::server::{ListenerId, OscServer, OscServerBuilder, ServerConfig};
}

// Re-export commonly used items at crate root
pub use crate::core::{Listener, OscError, OscResult, PacketFactory};
pub use crate::packet::{Argument, Bundle, Message, Packet, TimeTag};

#[cfg(feature = "transport")]
pub use crate::transport::{ConnectionState, Transport};
