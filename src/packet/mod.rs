//! OSC packet model.
//!
//! A [`Packet`] is either a [`Message`] (address pattern plus typed
//! arguments) or a [`Bundle`] (time tag plus ordered child packets). Packets
//! are plain values: they are built by application code or the decoder and
//! handed across component boundaries by move or shared reference.

mod argument;
mod bundle;
mod message;
mod timetag;

pub use argument::Argument;
pub use bundle::Bundle;
pub use message::Message;
pub use timetag::TimeTag;

use crate::codec::InvalidReason;
use crate::core::{ALIGNMENT, LENGTH_PREFIX_SIZE};

/// An OSC packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// A single message.
    Message(Message),
    /// A time-tagged bundle of packets.
    Bundle(Bundle),
}

impl Packet {
    /// Check if this packet is a bundle.
    pub fn is_bundle(&self) -> bool {
        matches!(self, Packet::Bundle(_))
    }

    /// Check the packet's validity invariant.
    pub fn is_valid(&self) -> bool {
        self.invalid_reason().is_none()
    }

    /// First reason the packet cannot be encoded, if any.
    pub fn invalid_reason(&self) -> Option<InvalidReason> {
        match self {
            Packet::Message(message) => message.invalid_reason(),
            Packet::Bundle(bundle) => bundle.invalid_reason(),
        }
    }

    /// Encoded size in bytes, excluding any stream length prefix.
    pub fn wire_size(&self) -> usize {
        match self {
            Packet::Message(message) => message.wire_size(),
            Packet::Bundle(bundle) => bundle.wire_size(),
        }
    }

    /// Get the message, if this packet is one.
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Packet::Message(message) => Some(message),
            Packet::Bundle(_) => None,
        }
    }

    /// Get the bundle, if this packet is one.
    pub fn as_bundle(&self) -> Option<&Bundle> {
        match self {
            Packet::Bundle(bundle) => Some(bundle),
            Packet::Message(_) => None,
        }
    }
}

impl From<Message> for Packet {
    fn from(message: Message) -> Self {
        Packet::Message(message)
    }
}

impl From<Bundle> for Packet {
    fn from(bundle: Bundle) -> Self {
        Packet::Bundle(bundle)
    }
}

/// Round `len` up to the next multiple of 4.
pub fn padded_len(len: usize) -> usize {
    (len + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

/// Encoded size of an OSC-string: bytes, terminator, padding.
pub fn string_size(s: &str) -> usize {
    padded_len(s.len() + 1)
}

/// Encoded size of an OSC-blob: length prefix, bytes, padding.
pub fn blob_size(bytes: &[u8]) -> usize {
    LENGTH_PREFIX_SIZE + padded_len(bytes.len())
}
