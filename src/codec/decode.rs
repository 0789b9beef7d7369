//! Packet decoding.
//!
//! Decoding works on an in-memory frame. A leading OSC-string equal to
//! `#bundle` selects the bundle path; anything else is a message address.
//! Bundle elements are decoded recursively from the span their length
//! prefix delimits. Bundles and arrays may each nest at most
//! [`MAX_NESTING_DEPTH`] levels.

use super::error::{DecodeError, DecodeResult};
use crate::core::{
    ALIGNMENT, BUNDLE_TAG, BasicPacketFactory, MAX_NESTING_DEPTH, PacketFactory, TAG_ARRAY_CLOSE, TAG_ARRAY_OPEN,
    TAG_BLOB, TAG_CHAR, TAG_FALSE, TAG_FLOAT32, TAG_FLOAT64, TAG_INT32, TAG_INT64, TAG_STRING,
    TAG_SYMBOL, TAG_TRUE, TYPE_TAG_PREFIX,
};
use crate::packet::{Argument, Bundle, Message, Packet, TimeTag};

/// Decode one frame into a plain [`Packet`].
pub fn decode(buf: &[u8]) -> DecodeResult<Packet> {
    decode_with(buf, &BasicPacketFactory)
}

/// Decode one frame, building packets through `factory`.
pub fn decode_with<F: PacketFactory + ?Sized>(buf: &[u8], factory: &F) -> DecodeResult<Packet> {
    let mut reader = Reader::new(buf);
    read_packet(&mut reader, factory, 0)
}

/// `depth` counts the bundles enclosing this packet.
fn read_packet<F: PacketFactory + ?Sized>(
    reader: &mut Reader<'_>,
    factory: &F,
    depth: usize,
) -> DecodeResult<Packet> {
    let head = reader.read_string()?;
    if head == BUNDLE_TAG {
        let depth = nest(depth)?;
        read_bundle(reader, factory, depth).map(Packet::Bundle)
    } else {
        read_message(head, reader, factory).map(Packet::Message)
    }
}

fn read_bundle<F: PacketFactory + ?Sized>(
    reader: &mut Reader<'_>,
    factory: &F,
    depth: usize,
) -> DecodeResult<Bundle> {
    let timetag = TimeTag::from_ntp(reader.read_u64()?);
    let mut bundle = factory.create_bundle(timetag);

    while reader.remaining() > 0 {
        let len = reader.read_length()?;
        let mut element = Reader::new(reader.take(len)?);
        bundle.add_packet(read_packet(&mut element, factory, depth)?);
    }
    Ok(bundle)
}

fn read_message<F: PacketFactory + ?Sized>(
    address: &str,
    reader: &mut Reader<'_>,
    factory: &F,
) -> DecodeResult<Message> {
    let mut message = factory.create_message(address);

    // Legacy senders omit the type-tag string for argument-less messages
    if reader.remaining() == 0 {
        return Ok(message);
    }

    let tags = reader.read_string()?;
    let tags = tags
        .strip_prefix(TYPE_TAG_PREFIX)
        .ok_or(DecodeError::MissingTypeTagPrefix)?;

    let mut tags = tags.chars();
    while let Some(tag) = tags.next() {
        if tag == TAG_ARRAY_CLOSE {
            return Err(DecodeError::UnmatchedArrayClose);
        }
        let argument = read_argument(tag, &mut tags, reader, 0)?;
        message.add_argument(factory.map_argument(argument));
    }
    Ok(message)
}

/// Read the argument for `tag`; arrays consume tags up to their matching `]`.
///
/// `depth` counts the arrays enclosing this argument.
fn read_argument(
    tag: char,
    tags: &mut std::str::Chars<'_>,
    reader: &mut Reader<'_>,
    depth: usize,
) -> DecodeResult<Argument> {
    let argument = match tag {
        TAG_INT32 => Argument::Int(reader.read_i32()?),
        TAG_FLOAT32 => Argument::Float(f32::from_bits(reader.read_u32()?)),
        TAG_STRING => Argument::String(reader.read_string()?.to_owned()),
        TAG_SYMBOL => Argument::Symbol(reader.read_string()?.to_owned()),
        TAG_INT64 => Argument::Long(reader.read_u64()? as i64),
        TAG_FLOAT64 => Argument::Double(f64::from_bits(reader.read_u64()?)),
        TAG_BLOB => Argument::Blob(reader.read_blob()?.to_vec()),
        TAG_CHAR => {
            let code = reader.read_u32()?;
            let c = char::from_u32(code).filter(char::is_ascii);
            Argument::Char(c.ok_or(DecodeError::InvalidChar(code))?)
        }
        TAG_TRUE => Argument::Bool(true),
        TAG_FALSE => Argument::Bool(false),
        TAG_ARRAY_OPEN => {
            let depth = nest(depth)?;
            let mut elements = Vec::new();
            loop {
                match tags.next() {
                    Some(TAG_ARRAY_CLOSE) => break,
                    Some(inner) => elements.push(read_argument(inner, tags, reader, depth)?),
                    None => return Err(DecodeError::UnclosedArray),
                }
            }
            Argument::Array(elements)
        }
        other => return Err(DecodeError::UnknownTypeTag(other)),
    };
    Ok(argument)
}

fn nest(depth: usize) -> DecodeResult<usize> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(DecodeError::NestingTooDeep {
            max: MAX_NESTING_DEPTH,
        });
    }
    Ok(depth + 1)
}

/// Bounds-checked cursor over a frame.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize) -> DecodeResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(DecodeError::UnexpectedEof {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn read_u32(&mut self) -> DecodeResult<u32> {
        self.read_array().map(u32::from_be_bytes)
    }

    fn read_i32(&mut self) -> DecodeResult<i32> {
        self.read_array().map(i32::from_be_bytes)
    }

    fn read_u64(&mut self) -> DecodeResult<u64> {
        self.read_array().map(u64::from_be_bytes)
    }

    /// Read a 4-byte length prefix and check it against the remaining bytes.
    fn read_length(&mut self) -> DecodeResult<usize> {
        let declared = self.read_i32()?;
        let len = usize::try_from(declared).map_err(|_| DecodeError::NegativeLength(declared))?;
        if len > self.remaining() {
            return Err(DecodeError::LengthOverflow {
                declared: len,
                remaining: self.remaining(),
            });
        }
        Ok(len)
    }

    /// Read a NUL-terminated string and skip its padding.
    fn read_string(&mut self) -> DecodeResult<&'a str> {
        let rest = &self.buf[self.pos..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(DecodeError::UnterminatedString)?;
        let s = std::str::from_utf8(&rest[..nul]).map_err(|_| DecodeError::InvalidUtf8)?;

        // Terminator included; a short final pad is tolerated
        let consumed = (nul + 1).next_multiple_of(ALIGNMENT).min(rest.len());
        self.pos += consumed;
        Ok(s)
    }

    fn read_blob(&mut self) -> DecodeResult<&'a [u8]> {
        let len = self.read_length()?;
        let data = self.take(len)?;
        let pad = len.next_multiple_of(ALIGNMENT) - len;
        self.pos += pad.min(self.remaining());
        Ok(data)
    }
}
