//! Protocol constants for Open Sound Control 1.0.
//!
//! Wire-format values are fixed by the protocol and MUST NOT be changed.
//! The transport defaults can be overridden through the client and server
//! builders.

use std::time::Duration;

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// Every OSC-string, blob and packet is aligned to this many bytes.
pub const ALIGNMENT: usize = 4;

/// Bundle marker string (without its terminator).
pub const BUNDLE_TAG: &str = "#bundle";

/// Size of the encoded bundle marker (`"#bundle\0"`).
pub const BUNDLE_TAG_SIZE: usize = 8;

/// Size of an encoded NTP time tag.
pub const TIMETAG_SIZE: usize = 8;

/// Bundle header size: marker plus time tag.
pub const BUNDLE_HEADER_SIZE: usize = BUNDLE_TAG_SIZE + TIMETAG_SIZE;

/// Size of the length prefix written before bundle elements and stream frames.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// First character of every type-tag string.
pub const TYPE_TAG_PREFIX: char = ',';

/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch (1970-01-01).
pub const NTP_UNIX_OFFSET_SECS: u64 = 2_208_988_800;

/// Raw 64-bit time tag meaning "immediately": 63 zero bits followed by a one.
pub const IMMEDIATE_TIMETAG: u64 = 1;

/// First Unix second past NTP era 0 (2036-02-07T06:28:16Z). Later instants
/// cannot be encoded.
pub const NTP_ERA_END_UNIX_SECS: u64 = (1 << 32) - NTP_UNIX_OFFSET_SECS;

/// Deepest nesting of bundles, or of arrays within one message, the decoder
/// accepts.
pub const MAX_NESTING_DEPTH: usize = 32;

// =============================================================================
// TYPE TAGS
// =============================================================================

/// 32-bit big-endian two's complement integer.
pub const TAG_INT32: char = 'i';

/// 32-bit IEEE-754 float.
pub const TAG_FLOAT32: char = 'f';

/// OSC-string.
pub const TAG_STRING: char = 's';

/// Alternate string type ("symbol").
pub const TAG_SYMBOL: char = 'S';

/// 64-bit big-endian two's complement integer.
pub const TAG_INT64: char = 'h';

/// 64-bit IEEE-754 float.
pub const TAG_FLOAT64: char = 'd';

/// OSC-blob.
pub const TAG_BLOB: char = 'b';

/// ASCII character sent as 32 bits.
pub const TAG_CHAR: char = 'c';

/// True, no payload bytes.
pub const TAG_TRUE: char = 'T';

/// False, no payload bytes.
pub const TAG_FALSE: char = 'F';

/// Beginning of an array.
pub const TAG_ARRAY_OPEN: char = '[';

/// End of an array.
pub const TAG_ARRAY_CLOSE: char = ']';

// =============================================================================
// TRANSPORT DEFAULTS
// =============================================================================

/// How long a single connection attempt may take.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How many connection attempts are made before the client gives up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;

/// Fixed wait between connection attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Datagram receive buffer; the largest UDP payload.
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 65535;

/// Largest stream frame a server session will accept.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;
