//! Bundle time tags.
//!
//! On the wire a time tag is a 64-bit NTP timestamp: seconds since
//! 1900-01-01 in the high 32 bits and the fractional second in the low 32
//! bits. In memory it is either the "immediately" sentinel or an instant with
//! millisecond precision counted from the Unix epoch.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::core::{IMMEDIATE_TIMETAG, NTP_ERA_END_UNIX_SECS, NTP_UNIX_OFFSET_SECS};

/// When the contents of a bundle should take effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimeTag {
    /// Apply with no delay. Encoded as 63 zero bits followed by a one.
    #[default]
    Immediate,
    /// Milliseconds since the Unix epoch.
    At(u64),
}

impl TimeTag {
    /// Time tag for the current system time.
    pub fn now() -> Self {
        Self::from(SystemTime::now())
    }

    /// Time tag `millis` milliseconds after the Unix epoch.
    pub fn from_unix_millis(millis: u64) -> Self {
        TimeTag::At(millis)
    }

    /// Check for the "immediately" sentinel.
    pub fn is_immediate(self) -> bool {
        matches!(self, TimeTag::Immediate)
    }

    /// Milliseconds since the Unix epoch, or `None` for `Immediate`.
    pub fn unix_millis(self) -> Option<u64> {
        match self {
            TimeTag::Immediate => None,
            TimeTag::At(millis) => Some(millis),
        }
    }

    /// Check that the instant falls inside NTP era 0.
    ///
    /// Only encodable time tags survive an encode/decode cycle; the encoder
    /// rejects bundles carrying any other.
    pub fn is_encodable(self) -> bool {
        match self {
            TimeTag::Immediate => true,
            TimeTag::At(millis) => millis / 1000 < NTP_ERA_END_UNIX_SECS,
        }
    }

    /// Convert to a `SystemTime`, or `None` for `Immediate`.
    pub fn to_system_time(self) -> Option<SystemTime> {
        self.unix_millis()
            .map(|millis| UNIX_EPOCH + Duration::from_millis(millis))
    }

    /// Encode to the raw 64-bit NTP representation.
    ///
    /// Seconds past the end of NTP era 0 are truncated modulo 2^32; check
    /// [`is_encodable`](Self::is_encodable) first when that matters.
    pub fn to_ntp(self) -> u64 {
        match self {
            TimeTag::Immediate => IMMEDIATE_TIMETAG,
            TimeTag::At(millis) => {
                let seconds = (millis / 1000).wrapping_add(NTP_UNIX_OFFSET_SECS) as u32;
                let fraction = ((millis % 1000) << 32) / 1000;
                (u64::from(seconds) << 32) | fraction
            }
        }
    }

    /// Decode from the raw 64-bit NTP representation.
    ///
    /// Instants before the Unix epoch clamp to the epoch. The fractional
    /// second is rounded half-up to the nearest millisecond, so every
    /// whole-millisecond instant survives an encode/decode cycle exactly.
    pub fn from_ntp(raw: u64) -> Self {
        if raw == IMMEDIATE_TIMETAG {
            return TimeTag::Immediate;
        }

        let seconds = raw >> 32;
        let fraction = raw & 0xFFFF_FFFF;

        let unix_seconds = seconds.saturating_sub(NTP_UNIX_OFFSET_SECS);
        let fraction_ms = (fraction * 1000 + (1 << 31)) >> 32;
        TimeTag::At(unix_seconds * 1000 + fraction_ms)
    }
}

impl From<SystemTime> for TimeTag {
    fn from(time: SystemTime) -> Self {
        let millis = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        TimeTag::At(millis)
    }
}

impl fmt::Display for TimeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeTag::Immediate => f.write_str("immediately"),
            TimeTag::At(millis) => write!(f, "{}.{:03}", millis / 1000, millis % 1000),
        }
    }
}
