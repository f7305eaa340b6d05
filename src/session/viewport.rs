//! Subscriber viewport

/// Rectangular lat/lng region a browser is looking at
///
/// The default is all-zero, a degenerate box that only contains `(0, 0)`,
/// so a browser sees nothing until it sends its first `newBounds`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub south_lat: f64,
    pub north_lat: f64,
    pub west_lng: f64,
    pub east_lng: f64,
}

impl Viewport {
    /// Whether a point lies inside the box, edges included
    pub fn is_inside(&self, lat: f64, lng: f64) -> bool {
        (self.south_lat..=self.north_lat).contains(&lat)
            && (self.west_lng..=self.east_lng).contains(&lng)
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}..{}] x [{}..{}]",
            self.south_lat, self.north_lat, self.west_lng, self.east_lng
        )
    }
}
