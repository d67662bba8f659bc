//! Planar surface coordinates.
//!
//! Distances are abstract surface distance units (the scheduler only needs
//! them to be consistent with vehicle speed and fuel economy).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A point on the planetary surface.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Coordinates {
    /// East-west position.
    pub x: f64,
    /// North-south position.
    pub y: f64,
}

impl Coordinates {
    /// Create coordinates.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// The point reached by moving up to `step` units toward `target`.
    ///
    /// Moving at least the full remaining distance lands exactly on
    /// `target`, so arrival checks are not subject to rounding drift.
    pub fn towards(self, target: Self, step: f64) -> Self {
        let remaining = self.distance_to(target);
        if step <= 0.0 {
            return self;
        }
        if step >= remaining || remaining <= f64::EPSILON {
            return target;
        }
        let fraction = step / remaining;
        Self {
            x: (target.x - self.x).mul_add(fraction, self.x),
            y: (target.y - self.y).mul_add(fraction, self.y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Coordinates::new(0.0, 0.0);
        let b = Coordinates::new(3.0, 4.0);
        assert!((a.distance_to(b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn towards_partial_and_overshoot() {
        let a = Coordinates::new(0.0, 0.0);
        let b = Coordinates::new(100.0, 0.0);
        let mid = a.towards(b, 40.0);
        assert!((mid.x - 40.0).abs() < 1e-9);
        assert_eq!(a.towards(b, 250.0), b);
        assert_eq!(a.towards(b, -1.0), a);
    }
}
