//! Frame boundaries for each transport kind.
//!
//! Datagram transports carry exactly one packet per datagram. Stream
//! transports prefix every top-level packet with its 4-byte big-endian
//! length:
//!
//! ```text
//! +------------------+--------------------------+
//! | Length (BE32)    | Packet (Length bytes)    |
//! +------------------+--------------------------+
//! ```

use super::error::{TransportError, TransportResult};
use crate::codec::{self, EncodeResult};
use crate::core::LENGTH_PREFIX_SIZE;
use crate::packet::Packet;

/// Transport kind selected at client/server construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Transport {
    /// UDP: one packet per datagram, no length prefix.
    #[default]
    Datagram,
    /// TCP: length-prefixed packets on a byte stream.
    Stream,
}

impl Transport {
    /// Check if packets on this transport carry a length prefix.
    pub fn is_length_prefixed(self) -> bool {
        matches!(self, Transport::Stream)
    }
}

/// Encode `packet` as one frame for `transport`.
pub fn encode_frame(packet: &Packet, transport: Transport) -> EncodeResult<Vec<u8>> {
    if !transport.is_length_prefixed() {
        return codec::encode(packet);
    }

    let mut buf = Vec::with_capacity(LENGTH_PREFIX_SIZE + packet.wire_size());
    buf.extend_from_slice(&[0u8; LENGTH_PREFIX_SIZE]);
    let written = codec::encode_into(packet, &mut buf)?;
    buf[..LENGTH_PREFIX_SIZE].copy_from_slice(&(written as u32).to_be_bytes());
    Ok(buf)
}

/// Reassembles length-prefixed frames from a byte stream.
///
/// Bytes are pushed in as they arrive; complete frames are pulled out one at
/// a time, in order. A negative or oversized length prefix leaves the stream
/// unrecoverable and is returned as an error.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    max_frame_size: usize,
}

impl FrameBuffer {
    /// Create an empty buffer accepting frames up to `max_frame_size` bytes.
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_frame_size,
        }
    }

    /// Append received bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Number of bytes buffered but not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Pop the next complete frame, without its length prefix.
    ///
    /// Returns `Ok(None)` until enough bytes have arrived.
    pub fn next_frame(&mut self) -> TransportResult<Option<Vec<u8>>> {
        if self.buf.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let declared = i32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]);
        let len =
            usize::try_from(declared).map_err(|_| TransportError::NegativeFrameLength(declared))?;
        if len > self.max_frame_size {
            return Err(TransportError::FrameTooLarge {
                size: len,
                max: self.max_frame_size,
            });
        }

        let end = LENGTH_PREFIX_SIZE + len;
        if self.buf.len() < end {
            return Ok(None);
        }

        let frame = self.buf[LENGTH_PREFIX_SIZE..end].to_vec();
        self.buf.drain(..end);
        Ok(Some(frame))
    }
}
