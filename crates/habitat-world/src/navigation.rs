//! Navigation points for mission travel plans.

use habitat_types::{Coordinates, SettlementId};
use serde::{Deserialize, Serialize};

/// A destination on a mission's travel plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavPoint {
    /// Where the point is.
    pub location: Coordinates,
    /// The settlement at this point, if any.
    pub settlement: Option<SettlementId>,
    /// Human-readable description for logs and views.
    pub description: String,
}

impl NavPoint {
    /// A navpoint at a settlement.
    pub fn settlement(id: SettlementId, location: Coordinates, name: &str) -> Self {
        Self {
            location,
            settlement: Some(id),
            description: name.to_owned(),
        }
    }

    /// A navpoint at an open surface site.
    pub fn site(location: Coordinates, description: impl Into<String>) -> Self {
        Self {
            location,
            settlement: None,
            description: description.into(),
        }
    }
}
