//! Codec error types.
//!
//! Decode errors are scoped to a single frame: the caller drops the frame
//! and carries on. Encode errors abort that one encode.

use thiserror::Error;

/// Structural violations found while decoding a frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fixed-size field runs past the end of the buffer.
    #[error("unexpected end of data: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes the field requires.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// OSC-string has no NUL terminator within bounds.
    #[error("string is not null-terminated")]
    UnterminatedString,

    /// OSC-string is not valid UTF-8.
    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// Declared length prefix exceeds the remaining buffer.
    #[error("declared length {declared} exceeds {remaining} remaining bytes")]
    LengthOverflow {
        /// Length from the prefix.
        declared: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// Length prefix is negative.
    #[error("negative length prefix: {0}")]
    NegativeLength(i32),

    /// Type tag is not part of the supported grammar.
    #[error("unknown type tag: {0:?}")]
    UnknownTypeTag(char),

    /// Type-tag string does not start with a comma.
    #[error("type-tag string must start with ','")]
    MissingTypeTagPrefix,

    /// `[` without a matching `]`.
    #[error("array is missing its closing ']'")]
    UnclosedArray,

    /// `]` without a matching `[`.
    #[error("unmatched ']' in type tags")]
    UnmatchedArrayClose,

    /// `c` payload is not an ASCII code point.
    #[error("invalid character code: {0:#x}")]
    InvalidChar(u32),

    /// Bundles or arrays nest deeper than the decoder allows.
    #[error("nesting exceeds {max} levels")]
    NestingTooDeep {
        /// Deepest nesting accepted.
        max: usize,
    },
}

/// Why a packet failed its validity invariant.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// Message address is empty.
    #[error("empty address")]
    EmptyAddress,

    /// Message address is the bundle marker, which would decode as a bundle.
    #[error("address is reserved for bundles")]
    ReservedAddress,

    /// `c` argument outside the ASCII range.
    #[error("character {0:?} is not ASCII")]
    NonAsciiChar(char),

    /// Arrays or bundles nest deeper than the decoder accepts.
    #[error("nesting too deep")]
    NestingTooDeep,

    /// Bundle time tag lies past the end of NTP era 0 (2036-02-07).
    #[error("time tag out of range")]
    TimetagOutOfRange,

    /// Bundle has no time tag.
    #[error("bundle has no time tag")]
    MissingTimetag,

    /// Bundle has no children.
    #[error("bundle has no packets")]
    EmptyBundle,
}

/// Errors that can occur when encoding a packet.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// The packet fails its validity invariant.
    #[error("invalid packet: {0}")]
    InvalidPacket(InvalidReason),
}

/// Result type for decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type for encoding.
pub type EncodeResult<T> = Result<T, EncodeError>;
