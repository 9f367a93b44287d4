use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Fallback location used when acquisition is impossible: central Guayaquil,
/// Ecuador. Callers degrade to this instead of retrying a denied permission.
pub const DEFAULT_LOCATION: Coordinates = Coordinates {
    latitude: -2.1709979,
    longitude: -79.9223592,
    accuracy: None,
    timestamp: None,
};

/// A geographic fix as reported by the device, or a bare lat/lon pair.
///
/// `accuracy` is the platform's radius estimate in meters; `timestamp` is
/// when the fix was taken. Both are absent for synthetic coordinates such as
/// [`DEFAULT_LOCATION`] or map-click positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude, accuracy: None, timestamp: None }
    }

    /// True when both components are inside the geographic range.
    pub fn in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// True for coordinates the subsystem will cache or draw.
    ///
    /// Exactly (0,0) is treated as the "no fix" sentinel and reported
    /// invalid, even though the point is geographically real. A fix taken at
    /// the equator/prime-meridian intersection is therefore rejected; this
    /// mirrors how the rest of the application signals a missing location
    /// and must not be changed without a product decision.
    pub fn is_valid(&self) -> bool {
        self.in_range() && !(self.latitude == 0.0 && self.longitude == 0.0)
    }

    /// Display form with 6 decimals, e.g. `-2.170998, -79.922359`.
    pub fn format(&self) -> String {
        format!("{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

impl From<(f64, f64)> for Coordinates {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}
