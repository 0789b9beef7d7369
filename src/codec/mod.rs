//! OSC binary codec.
//!
//! Pure functions between [`Packet`](crate::packet::Packet) values and wire
//! bytes. No I/O happens here; framing for stream transports lives in
//! [`transport`](crate::transport).
//!
//! # Wire format
//!
//! ```text
//! Message:  OSC-string address | OSC-string ",tags" | arguments...
//! Bundle:   "#bundle\0" | NTP time tag (8 bytes BE) | (u32 BE length, packet)*
//! ```
//!
//! All numeric fields are big-endian and every item is padded to 4 bytes.

mod decode;
mod encode;
mod error;

pub use decode::{decode, decode_with};
pub use encode::{encode, encode_into};
pub use error::*;
