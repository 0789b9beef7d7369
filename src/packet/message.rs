//! OSC messages.

use std::fmt;

use super::argument::Argument;
use super::string_size;
use crate::codec::InvalidReason;
use crate::core::{BUNDLE_TAG, MAX_NESTING_DEPTH, TYPE_TAG_PREFIX};

/// An OSC message: address pattern plus typed arguments.
///
/// The type-tag string is maintained alongside the arguments, so the two can
/// never disagree. The encoded payload size is cached as arguments are added.
///
/// # Example
///
/// ```
/// use osc_protocol::packet::Message;
///
/// let msg = Message::new("/foo").with_arg(42);
/// assert_eq!(msg.type_tags(), ",i");
/// assert_eq!(msg.wire_size(), 16);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    address: String,
    type_tags: String,
    arguments: Vec<Argument>,
    /// Encoded size of `arguments`.
    data_size: usize,
}

impl Message {
    /// Create a message with no arguments.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            type_tags: TYPE_TAG_PREFIX.to_string(),
            arguments: Vec::new(),
            data_size: 0,
        }
    }

    /// Address pattern.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Replace the address pattern.
    pub fn set_address(&mut self, address: impl Into<String>) {
        self.address = address.into();
    }

    /// Type-tag string, including the leading comma.
    pub fn type_tags(&self) -> &str {
        &self.type_tags
    }

    /// Arguments in order. Arrays appear as a single entry.
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Append an argument and its type tag.
    pub fn add_argument(&mut self, argument: impl Into<Argument>) {
        let argument = argument.into();
        argument.write_type_tag(&mut self.type_tags);
        self.data_size += argument.wire_size();
        self.arguments.push(argument);
    }

    /// Builder-style [`add_argument`](Self::add_argument).
    pub fn with_arg(mut self, argument: impl Into<Argument>) -> Self {
        self.add_argument(argument);
        self
    }

    /// Consume the message, returning its arguments.
    pub fn into_arguments(self) -> Vec<Argument> {
        self.arguments
    }

    /// A message is valid when it can be encoded and decoded back unchanged.
    pub fn is_valid(&self) -> bool {
        self.invalid_reason().is_none()
    }

    /// First reason the message cannot be encoded, if any.
    ///
    /// The address must be non-empty and must not be `#bundle`. `Char`
    /// arguments must be ASCII and arrays may nest at most
    /// [`MAX_NESTING_DEPTH`] levels.
    pub fn invalid_reason(&self) -> Option<InvalidReason> {
        if self.address.is_empty() {
            return Some(InvalidReason::EmptyAddress);
        }
        if self.address == BUNDLE_TAG {
            return Some(InvalidReason::ReservedAddress);
        }
        if let Some(c) = self.arguments.iter().find_map(Argument::non_ascii_char) {
            return Some(InvalidReason::NonAsciiChar(c));
        }
        let depth = self.arguments.iter().map(Argument::nesting_depth).max();
        if depth.unwrap_or(0) > MAX_NESTING_DEPTH {
            return Some(InvalidReason::NestingTooDeep);
        }
        None
    }

    /// Number of bytes the message occupies when encoded.
    pub fn wire_size(&self) -> usize {
        string_size(&self.address) + string_size(&self.type_tags) + self.data_size
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)?;
        if !self.arguments.is_empty() {
            f.write_str(" |")?;
            for argument in &self.arguments {
                write!(f, " {argument}")?;
            }
        }
        Ok(())
    }
}
