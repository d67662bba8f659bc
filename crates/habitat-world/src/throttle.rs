//! Rate limiting for recurring warnings.
//!
//! Shortages repeat every pulse until someone fixes them. A [`LogThrottle`]
//! lets the first warning for a key through and then stays quiet for a
//! configured number of pulses.

use std::collections::BTreeMap;

/// Default quiet period between repeated warnings with the same key.
pub const DEFAULT_MIN_GAP_PULSES: u64 = 100;

/// Remembers when each keyed warning was last emitted.
#[derive(Debug, Clone)]
pub struct LogThrottle {
    last: BTreeMap<String, u64>,
    min_gap_pulses: u64,
}

impl Default for LogThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_GAP_PULSES)
    }
}

impl LogThrottle {
    /// Create a throttle with the given quiet period.
    pub const fn new(min_gap_pulses: u64) -> Self {
        Self {
            last: BTreeMap::new(),
            min_gap_pulses,
        }
    }

    /// Whether a warning for `key` may be logged at `pulse_id`. Records the emission.
    pub fn should_log(&mut self, key: &str, pulse_id: u64) -> bool {
        let allowed = self
            .last
            .get(key)
            .is_none_or(|last| pulse_id.saturating_sub(*last) >= self.min_gap_pulses);
        if allowed {
            self.last.insert(key.to_owned(), pulse_id);
        }
        allowed
    }
}
