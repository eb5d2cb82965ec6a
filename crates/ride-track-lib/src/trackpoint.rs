//! A single GPS fix as read from an uploaded track

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One GPS fix of a recorded ride.
///
/// Produced only by the parser and never mutated afterwards. Elevation and timestamp
/// are kept optional: a missing value stays missing instead of being defaulted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trackpoint {
    /// Latitude in degrees (WGS84)
    pub latitude: f64,
    /// Longitude in degrees (WGS84)
    pub longitude: f64,
    /// Elevation in meters, if the device recorded one
    pub elevation: Option<f64>,
    /// Fix time, if the device recorded one
    pub timestamp: Option<DateTime<Utc>>,
    /// Position in file order, starting at 0
    pub sequence_index: usize,
}

impl Trackpoint {
    pub fn new(
        latitude: f64,
        longitude: f64,
        elevation: Option<f64>,
        timestamp: Option<DateTime<Utc>>,
        sequence_index: usize,
    ) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
            timestamp,
            sequence_index,
        }
    }
}
