//! Explicit time-bounded caches.
//!
//! Values that are expensive to derive (a mission's resource manifest, the
//! best trade profit toward a settlement) are stored together with the
//! simulated time until which they stay valid. Invalidation is explicit:
//! the owner drops the cached entry when the underlying state changes.

use serde::{Deserialize, Serialize};

/// A value paired with its validity horizon in absolute millisols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cached<T> {
    value: T,
    valid_until: f64,
}

impl<T> Cached<T> {
    /// Cache `value` computed at `now` for `ttl` millisols.
    pub fn new(value: T, now: f64, ttl: f64) -> Self {
        Self {
            value,
            valid_until: now + ttl.max(0.0),
        }
    }

    /// Whether the value is still valid at `now`.
    pub fn is_fresh(&self, now: f64) -> bool {
        now < self.valid_until
    }

    /// The value if still valid at `now`.
    pub fn fresh(&self, now: f64) -> Option<&T> {
        self.is_fresh(now).then_some(&self.value)
    }

    /// The value regardless of age.
    pub const fn value(&self) -> &T {
        &self.value
    }

    /// Absolute millisol at which the value expires.
    pub const fn valid_until(&self) -> f64 {
        self.valid_until
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_after_ttl() {
        let cached = Cached::new(42_u32, 100.0, 50.0);
        assert_eq!(cached.fresh(120.0), Some(&42));
        assert_eq!(cached.fresh(150.0), None);
    }

    #[test]
    fn value_survives_expiry() {
        let cached = Cached::new(7.5_f64, 0.0, 10.0);
        assert!(!cached.is_fresh(10.0));
        assert!((cached.value() - 7.5).abs() < 1e-12);
        assert!((cached.valid_until() - 10.0).abs() < 1e-12);
    }
}
