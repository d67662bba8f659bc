//! Type-safe identifier wrappers.
//!
//! Settlements and missions are identified by UUID v7 (time-ordered)
//! newtypes. Units (workers and vehicles) use a dense [`UnitId`] handed out
//! by the simulation context's unit registry, which enforces the maximum
//! addressable unit count.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
        )]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a settlement (one dispatcher work-unit each).
    SettlementId
}

define_id! {
    /// Unique identifier for a mission.
    MissionId
}

/// Dense identifier for a unit owned by a settlement (person, robot, vehicle).
///
/// Values are allocated sequentially by the unit registry; the registry
/// refuses to hand out more than its configured maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct UnitId(pub u32);

impl UnitId {
    /// Return the raw index.
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for UnitId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unit-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let settlement = SettlementId::new();
        let mission = MissionId::new();
        assert_ne!(settlement.into_inner(), Uuid::nil());
        assert_ne!(mission.into_inner(), Uuid::nil());
    }

    #[test]
    fn ids_are_time_ordered() {
        let first = MissionId::new();
        let second = MissionId::new();
        assert!(first <= second);
    }

    #[test]
    fn unit_id_display() {
        assert_eq!(UnitId(7).to_string(), "unit-7");
    }
}
