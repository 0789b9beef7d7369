//! Connection state and reconnect policy for outbound links.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::core::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};

/// Client connection lifecycle.
///
/// ```text
/// Disconnected -> Connecting -> Connected
///                     |  ^
///                     v  | (retry after delay)
///                   Connecting ... -> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No link and no attempt in progress.
    #[default]
    Disconnected,
    /// A connection attempt is in progress or scheduled.
    Connecting,
    /// Link established; sends go straight to the peer.
    Connected,
    /// Every attempt failed; no further retries.
    Failed,
}

impl ConnectionState {
    /// Check if packets can be sent immediately.
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Bounded attempts with a fixed delay between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total connection attempts, including the first.
    pub max_attempts: u32,
    /// Wait between consecutive attempts.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Attempt counter for one connection cycle, shared with `disconnect`.
///
/// `poison` jumps the counter to the maximum so no further attempt is begun.
#[derive(Debug)]
pub struct AttemptCounter {
    current: AtomicU32,
    max: u32,
}

impl AttemptCounter {
    /// Create a counter allowing `max` attempts.
    pub fn new(max: u32) -> Self {
        Self {
            current: AtomicU32::new(0),
            max,
        }
    }

    /// Claim the next attempt. Returns its 1-based number, or `None` once
    /// the budget is spent or the counter was poisoned.
    pub fn begin(&self) -> Option<u32> {
        self.current
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max).then_some(n + 1)
            })
            .ok()
            .map(|previous| previous + 1)
    }

    /// Attempts made so far (the maximum once poisoned).
    pub fn attempts(&self) -> u32 {
        self.current.load(Ordering::Acquire)
    }

    /// Check if any attempts remain.
    pub fn has_remaining(&self) -> bool {
        self.attempts() < self.max
    }

    /// Deny all further attempts.
    pub fn poison(&self) {
        self.current.store(self.max, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 6);
        assert_eq!(policy.retry_delay, Duration::from_secs(10));
    }

    #[test]
    fn test_counter_budget() {
        let counter = AttemptCounter::new(3);
        assert_eq!(counter.begin(), Some(1));
        assert_eq!(counter.begin(), Some(2));
        assert!(counter.has_remaining());
        assert_eq!(counter.begin(), Some(3));
        assert_eq!(counter.begin(), None);
        assert!(!counter.has_remaining());
        assert_eq!(counter.attempts(), 3);
    }

    #[test]
    fn test_poison_denies_attempts() {
        let counter = AttemptCounter::new(6);
        assert_eq!(counter.begin(), Some(1));
        counter.poison();
        assert_eq!(counter.begin(), None);
        assert_eq!(counter.attempts(), 6);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Failed.is_connected());
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }
}
