//! Timestamp type used throughout the protocol.
//!
//! Timestamps are Unix epoch seconds (UTC). Consensus round deadlines and
//! attestation windows are measured against these, so components take `now`
//! as an argument rather than reading the clock themselves — tests pass
//! synthetic times.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// The current system time.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before Unix epoch")
            .as_secs();
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Seconds elapsed from this timestamp to `now` (0 if `now` is earlier).
    pub fn elapsed(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// Whether `window_secs` have passed since this timestamp.
    pub fn window_elapsed(&self, window_secs: u64, now: Timestamp) -> bool {
        now.0 >= self.0.saturating_add(window_secs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_saturates() {
        let later = Timestamp::new(100);
        let earlier = Timestamp::new(50);
        assert_eq!(earlier.elapsed(later), 50);
        assert_eq!(later.elapsed(earlier), 0);
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let t = Timestamp::new(100);
        assert!(!t.window_elapsed(30, Timestamp::new(129)));
        assert!(t.window_elapsed(30, Timestamp::new(130)));
    }
}
