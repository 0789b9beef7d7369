//! Packet encoding.
//!
//! Encoding is a read-only traversal of the packet. Every string is written
//! with a NUL terminator and zero-padded to a 4-byte boundary; every blob is
//! a big-endian length, the bytes, then padding. Bundle children always get
//! their own length prefix.

use super::error::{EncodeError, EncodeResult};
use crate::core::{ALIGNMENT, BUNDLE_TAG};
use crate::packet::{Argument, Bundle, Message, Packet};

/// Encode a packet into a fresh buffer.
///
/// The buffer is exactly [`Packet::wire_size`] bytes long.
pub fn encode(packet: &Packet) -> EncodeResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(packet.wire_size());
    encode_into(packet, &mut buf)?;
    Ok(buf)
}

/// Encode a packet, appending to `buf`.
///
/// Returns the number of bytes written. Nothing is written on error.
pub fn encode_into(packet: &Packet, buf: &mut Vec<u8>) -> EncodeResult<usize> {
    check_valid(packet)?;
    let start = buf.len();
    write_packet(packet, buf);
    Ok(buf.len() - start)
}

fn check_valid(packet: &Packet) -> EncodeResult<()> {
    match packet.invalid_reason() {
        Some(reason) => Err(EncodeError::InvalidPacket(reason)),
        None => Ok(()),
    }
}

fn write_packet(packet: &Packet, buf: &mut Vec<u8>) {
    match packet {
        Packet::Message(message) => write_message(message, buf),
        Packet::Bundle(bundle) => write_bundle(bundle, buf),
    }
}

fn write_bundle(bundle: &Bundle, buf: &mut Vec<u8>) {
    write_string(BUNDLE_TAG, buf);
    let timetag = bundle.timetag().unwrap_or_default();
    buf.extend_from_slice(&timetag.to_ntp().to_be_bytes());

    for child in bundle.packets().iter().filter(|p| p.is_valid()) {
        buf.extend_from_slice(&(child.wire_size() as u32).to_be_bytes());
        write_packet(child, buf);
    }
}

fn write_message(message: &Message, buf: &mut Vec<u8>) {
    write_string(message.address(), buf);
    write_string(message.type_tags(), buf);
    for argument in message.arguments() {
        write_argument(argument, buf);
    }
}

fn write_argument(argument: &Argument, buf: &mut Vec<u8>) {
    match argument {
        Argument::Int(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Argument::Float(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Argument::String(s) | Argument::Symbol(s) => write_string(s, buf),
        Argument::Long(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Argument::Double(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Argument::Blob(bytes) => write_blob(bytes, buf),
        Argument::Char(c) => buf.extend_from_slice(&u32::from(*c).to_be_bytes()),
        Argument::Bool(_) => {}
        // No framing: the bracket span in the type tags says how many elements follow
        Argument::Array(elements) => {
            for element in elements {
                write_argument(element, buf);
            }
        }
    }
}

fn write_string(s: &str, buf: &mut Vec<u8>) {
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
    pad(s.len() + 1, buf);
}

fn write_blob(bytes: &[u8], buf: &mut Vec<u8>) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
    pad(bytes.len(), buf);
}

fn pad(written: usize, buf: &mut Vec<u8>) {
    let rem = written % ALIGNMENT;
    if rem > 0 {
        buf.resize(buf.len() + ALIGNMENT - rem, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::InvalidReason;
    use crate::packet::TimeTag;

    #[test]
    fn test_encode_play() {
        let bytes = encode(&Message::new("/play").into()).unwrap();
        assert_eq!(bytes, hex::decode("2f706c61790000002c000000").unwrap());
        assert_eq!(bytes.len(), 12);
    }

    #[test]
    fn test_encode_int_argument() {
        let bytes = encode(&Message::new("/foo").with_arg(42).into()).unwrap();
        assert_eq!(
            bytes,
            hex::decode("2f666f6f000000002c6900000000002a").unwrap()
        );
    }

    #[test]
    fn test_encode_string_blob_and_booleans() {
        let msg = Message::new("/s")
            .with_arg("hello")
            .with_arg(true)
            .with_arg(vec![1u8, 2, 3])
            .with_arg(false);
        let bytes = encode(&msg.into()).unwrap();
        let expected = concat!(
            "2f730000",                 // "/s"
            "2c73546246000000",         // ",sTbF"
            "68656c6c6f000000",         // "hello"
            "0000000301020300",         // blob len 3, bytes, 1 pad
        );
        assert_eq!(bytes, hex::decode(expected).unwrap());
    }

    #[test]
    fn test_encode_numeric_types() {
        let msg = Message::new("/n")
            .with_arg(1.0f32)
            .with_arg(-2i64)
            .with_arg(0.5f64)
            .with_arg('A');
        let bytes = encode(&msg.into()).unwrap();
        let expected = concat!(
            "2f6e0000",
            "2c666864630000",
            "00",
            "3f800000",
            "fffffffffffffffe",
            "3fe0000000000000",
            "00000041",
        );
        assert_eq!(bytes, hex::decode(expected).unwrap());
    }

    #[test]
    fn test_encode_array_has_no_framing() {
        let msg = Message::new("/a").with_arg(Argument::Array(vec![
            Argument::Int(1),
            Argument::Int(2),
        ]));
        let bytes = encode(&msg.into()).unwrap();
        let expected = concat!("2f610000", "2c5b69695d000000", "00000001", "00000002");
        assert_eq!(bytes, hex::decode(expected).unwrap());
    }

    #[test]
    fn test_encode_immediate_bundle() {
        let bundle = Bundle::new().with_packet(Message::new("/play"));
        let bytes = encode(&bundle.into()).unwrap();
        let expected = concat!(
            "2362756e646c6500",         // "#bundle"
            "0000000000000001",         // immediately
            "0000000c",                 // child length
            "2f706c61790000002c000000",
        );
        assert_eq!(bytes, hex::decode(expected).unwrap());
    }

    #[test]
    fn test_encode_timed_bundle_header() {
        let bundle = Bundle::with_timetag(TimeTag::At(500)).with_packet(Message::new("/x"));
        let bytes = encode(&bundle.into()).unwrap();
        // 2208988800 = 0x83aa7e80, half a second = 0x80000000
        assert_eq!(&bytes[8..16], &hex::decode("83aa7e8080000000").unwrap()[..]);
    }

    #[test]
    fn test_invalid_packets_rejected() {
        assert_eq!(
            encode(&Message::new("").into()),
            Err(EncodeError::InvalidPacket(InvalidReason::EmptyAddress))
        );
        assert_eq!(
            encode(&Bundle::new().into()),
            Err(EncodeError::InvalidPacket(InvalidReason::EmptyBundle))
        );
        let untimed = Bundle::from_packets(None, [Message::new("/a")]);
        assert_eq!(
            encode(&untimed.into()),
            Err(EncodeError::InvalidPacket(InvalidReason::MissingTimetag))
        );
    }

    #[test]
    fn test_unencodable_messages_rejected() {
        assert_eq!(
            encode(&Message::new("#bundle").into()),
            Err(EncodeError::InvalidPacket(InvalidReason::ReservedAddress))
        );
        assert_eq!(
            encode(&Message::new("/c").with_arg('ß').into()),
            Err(EncodeError::InvalidPacket(InvalidReason::NonAsciiChar('ß')))
        );
    }

    #[test]
    fn test_timetag_past_ntp_era_rejected() {
        use crate::core::NTP_ERA_END_UNIX_SECS;

        let last = NTP_ERA_END_UNIX_SECS * 1000 - 1;
        let bundle = Bundle::with_timetag(TimeTag::At(last)).with_packet(Message::new("/x"));
        let bytes = encode(&bundle.into()).unwrap();
        assert_eq!(&bytes[8..12], &hex::decode("ffffffff").unwrap()[..]);

        for millis in [NTP_ERA_END_UNIX_SECS * 1000, 2_208_988_800_000] {
            let bundle = Bundle::with_timetag(TimeTag::At(millis)).with_packet(Message::new("/x"));
            assert_eq!(
                encode(&bundle.into()),
                Err(EncodeError::InvalidPacket(InvalidReason::TimetagOutOfRange))
            );
        }
    }

    #[test]
    fn test_invalid_children_skipped() {
        let mut bundle = Bundle::new();
        bundle.add_packet(Message::new("/a"));
        bundle.add_packet(Message::new(""));
        bundle.add_packet(Message::new("/b"));
        let packet: Packet = bundle.into();

        let bytes = encode(&packet).unwrap();
        assert_eq!(bytes.len(), packet.wire_size());
        assert_eq!(bytes.len(), 16 + 2 * (4 + 8));
    }

    #[test]
    fn test_encode_into_appends_and_leaves_buffer_on_error() {
        let mut buf = vec![0xAA];
        let written = encode_into(&Message::new("/play").into(), &mut buf).unwrap();
        assert_eq!(written, 12);
        assert_eq!(buf.len(), 13);

        assert!(encode_into(&Message::new("").into(), &mut buf).is_err());
        assert_eq!(buf.len(), 13);
    }

    #[test]
    fn test_size_matches_encoded_length() {
        let inner = Bundle::with_timetag(TimeTag::At(42))
            .with_packet(Message::new("/deep").with_arg("abcd").with_arg(vec![9u8; 5]));
        let packets: Vec<Packet> = vec![
            Message::new("/x").into(),
            Message::new("/mix").with_arg(0.25f32).with_arg("").into(),
            Bundle::new().with_packet(inner).with_packet(Message::new("/y")).into(),
        ];
        for packet in packets {
            let bytes = encode(&packet).unwrap();
            assert_eq!(bytes.len(), packet.wire_size());
            assert_eq!(bytes.len() % 4, 0);
        }
    }
}
