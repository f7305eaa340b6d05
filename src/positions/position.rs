//! Bus position record

use serde::{Deserialize, Serialize};

/// Latest known location of one bus
///
/// Serialized with the wire field names used by both endpoints:
/// `{"busId": "...", "lat": 55.75, "lng": 37.6, "route": "120"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Unique bus identifier, never empty
    pub bus_id: String,
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
    /// Route name the bus is serving
    pub route: String,
}

impl Position {
    /// Create a new position
    pub fn new(bus_id: impl Into<String>, lat: f64, lng: f64, route: impl Into<String>) -> Self {
        Self {
            bus_id: bus_id.into(),
            lat,
            lng,
            route: route.into(),
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{} ({}, {})", self.bus_id, self.route, self.lat, self.lng)
    }
}
