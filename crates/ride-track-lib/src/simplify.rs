//! Douglas-Peucker simplification of a parsed track
//!
//! Points are projected to Web Mercator and the ground tolerance is scaled to
//! projected meters at the track's mean latitude, which is accurate enough over the
//! extent of a single ride. The Douglas-Peucker pass itself is `geo`'s
//! [`SimplifyIdx`], which reports retained indices directly.

use crate::{Trackpoint, utils};
use geo::{Coord, LineString, SimplifyIdx};
use serde::{Deserialize, Serialize};

/// Reduced track for storage and map rendering.
///
/// A strict subsequence of the input (by `sequence_index`) that always keeps the first
/// and last input points. Only ever produced by [`simplify`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimplifiedTrack {
    /// Tolerance in meters this track was simplified with
    pub tolerance_m: f64,
    /// Retained points in input order
    pub points: Vec<Trackpoint>,
}

impl SimplifiedTrack {
    /// Number of retained points
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `sequence_index` of every retained point
    pub fn sequence_indices(&self) -> Vec<usize> {
        self.points.iter().map(|p| p.sequence_index).collect()
    }
}

/// Simplify `points` so that no dropped point deviates more than `tolerance_m` meters
/// from the retained polyline.
///
/// Deterministic for identical input and tolerance. Inputs with fewer than three points
/// are returned unchanged. A negative or NaN tolerance is treated as zero.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn simplify(points: &[Trackpoint], tolerance_m: f64) -> SimplifiedTrack {
    let retained = douglas_peucker_indices(points, tolerance_m);
    SimplifiedTrack {
        tolerance_m,
        points: retained.into_iter().map(|i| points[i].clone()).collect(),
    }
}

/// Indices (into `points`) kept by Douglas-Peucker, ascending
pub fn douglas_peucker_indices(points: &[Trackpoint], tolerance_m: f64) -> Vec<usize> {
    let n = points.len();
    if n < 3 {
        return (0..n).collect();
    }

    let mean_lat = points.iter().map(|p| p.latitude).sum::<f64>() / n as f64;
    // geo keeps every point for a non-positive epsilon, while a zero tolerance should
    // still drop points lying exactly on the chord
    let tolerance =
        (tolerance_m.max(0.0) * utils::mercator_scale(mean_lat)).max(f64::MIN_POSITIVE);

    let projected: LineString<f64> = points
        .iter()
        .map(|p| Coord::from(utils::wgs84_to_mercator(p.latitude, p.longitude)))
        .collect();

    projected.simplify_idx(tolerance)
}
