//! OSC bundles.

use super::{Message, Packet, TimeTag};
use crate::codec::InvalidReason;
use crate::core::{BUNDLE_HEADER_SIZE, LENGTH_PREFIX_SIZE, MAX_NESTING_DEPTH};

/// A time-tagged, ordered collection of packets.
///
/// Children may themselves be bundles, up to [`MAX_NESTING_DEPTH`] levels in
/// total. Each child is framed by its own 4-byte length on the wire; invalid
/// children are not encoded and do not count toward
/// [`wire_size`](Self::wire_size) or [`depth`](Self::depth).
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    timetag: Option<TimeTag>,
    packets: Vec<Packet>,
    /// Header plus every encodable child with its length prefix.
    size: usize,
    /// Bundle levels, this one included, along the deepest encodable path.
    depth: usize,
}

impl Default for Bundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Bundle {
    /// Create an empty bundle to be applied immediately.
    pub fn new() -> Self {
        Self::with_timetag(TimeTag::Immediate)
    }

    /// Create an empty bundle with the given time tag.
    pub fn with_timetag(timetag: TimeTag) -> Self {
        Self {
            timetag: Some(timetag),
            packets: Vec::new(),
            size: BUNDLE_HEADER_SIZE,
            depth: 1,
        }
    }

    /// Create a bundle from an optional time tag and its children.
    ///
    /// A bundle without a time tag can be built but is not valid.
    pub fn from_packets<I, P>(timetag: Option<TimeTag>, packets: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Packet>,
    {
        let mut bundle = Self {
            timetag,
            packets: Vec::new(),
            size: BUNDLE_HEADER_SIZE,
            depth: 1,
        };
        for packet in packets {
            bundle.add_packet(packet);
        }
        bundle
    }

    /// Time tag, if one is set.
    pub fn timetag(&self) -> Option<TimeTag> {
        self.timetag
    }

    /// Set or clear the time tag.
    pub fn set_timetag(&mut self, timetag: Option<TimeTag>) {
        self.timetag = timetag;
    }

    /// Children in order.
    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    /// Consume the bundle, returning its children.
    pub fn into_packets(self) -> Vec<Packet> {
        self.packets
    }

    /// Append a child packet.
    pub fn add_packet(&mut self, packet: impl Into<Packet>) {
        let packet = packet.into();
        if packet.is_valid() {
            self.size += LENGTH_PREFIX_SIZE + packet.wire_size();
            if let Packet::Bundle(inner) = &packet {
                self.depth = self.depth.max(inner.depth + 1);
            }
        }
        self.packets.push(packet);
    }

    /// Builder-style [`add_packet`](Self::add_packet).
    pub fn with_packet(mut self, packet: impl Into<Packet>) -> Self {
        self.add_packet(packet);
        self
    }

    /// A bundle is valid when it has an encodable time tag and at least one
    /// child, and does not nest too deeply.
    pub fn is_valid(&self) -> bool {
        self.invalid_reason().is_none()
    }

    /// First reason the bundle cannot be encoded, if any.
    pub fn invalid_reason(&self) -> Option<InvalidReason> {
        match self.timetag {
            None => Some(InvalidReason::MissingTimetag),
            Some(timetag) if !timetag.is_encodable() => Some(InvalidReason::TimetagOutOfRange),
            Some(_) if self.packets.is_empty() => Some(InvalidReason::EmptyBundle),
            Some(_) if self.depth > MAX_NESTING_DEPTH => Some(InvalidReason::NestingTooDeep),
            Some(_) => None,
        }
    }

    /// Nesting depth: 1 for a bundle holding only messages.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of bytes the bundle occupies when encoded.
    pub fn wire_size(&self) -> usize {
        self.size
    }

    /// Leaf messages, depth-first in original order.
    pub fn messages(&self) -> Vec<&Message> {
        let mut out = Vec::new();
        collect_messages(self, &mut out);
        out
    }
}

fn collect_messages<'a>(bundle: &'a Bundle, out: &mut Vec<&'a Message>) {
    for packet in &bundle.packets {
        match packet {
            Packet::Message(message) => out.push(message),
            Packet::Bundle(inner) => collect_messages(inner, out),
        }
    }
}
