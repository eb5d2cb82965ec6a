//! Ride statistics over the full (unsimplified) track
//!
//! Statistics are all-or-nothing: a track where any point lacks a timestamp yields
//! `None`, never a partially filled [`RouteStatistics`]. A missing timestamp is a
//! valid input, not an error.

use crate::climbs::{self, Climb};
use crate::{StatsConfig, Trackpoint, distance};
use serde::{Deserialize, Serialize};

/// Aggregate statistics of one ride
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteStatistics {
    /// Sum of horizontal distance between consecutive points
    pub distance_km: f64,
    /// Sum of positive elevation deltas
    pub elevation_gain_m: f64,
    /// Sum of negative elevation deltas, as a positive magnitude
    pub elevation_loss_m: f64,
    /// Distance over moving time
    pub avg_speed_kmh: f64,
    /// Fastest moving segment
    pub max_speed_kmh: f64,
    /// Last timestamp minus first timestamp
    pub total_time_minutes: f64,
    /// Elapsed time of segments faster than the moving threshold
    pub moving_time_minutes: f64,
    /// Horizontal-distance weighted average gradient
    pub avg_gradient_pct: f64,
    /// Steepest segment gradient
    pub max_gradient_pct: f64,
    /// Most significant climbs, largest elevation gain first
    pub top_climbs: Vec<Climb>,
}

impl RouteStatistics {
    /// True when every numeric field is a finite number
    pub fn is_finite(&self) -> bool {
        [
            self.distance_km,
            self.elevation_gain_m,
            self.elevation_loss_m,
            self.avg_speed_kmh,
            self.max_speed_kmh,
            self.total_time_minutes,
            self.moving_time_minutes,
            self.avg_gradient_pct,
            self.max_gradient_pct,
        ]
        .iter()
        .all(|v| v.is_finite())
            && self.top_climbs.iter().all(Climb::is_finite)
    }
}

/// Measurements between two consecutive trackpoints
#[derive(Clone, Copy, Debug)]
pub(crate) struct Segment {
    /// Position of the first point in the input slice
    pub start: usize,
    /// Position of the second point in the input slice
    pub end: usize,
    pub horizontal_m: f64,
    pub vertical_m: Option<f64>,
    /// Seconds between the two fixes; zero when either timestamp is missing, negative
    /// when the fixes are out of order
    pub elapsed_s: f64,
}

impl Segment {
    pub fn between(points: &[Trackpoint], start: usize) -> Self {
        let (a, b) = (&points[start], &points[start + 1]);
        let elapsed_s = match (a.timestamp, b.timestamp) {
            (Some(t0), Some(t1)) => (t1 - t0).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        };
        Self {
            start,
            end: start + 1,
            horizontal_m: distance::horizontal_distance(a, b),
            vertical_m: distance::vertical_delta(a, b),
            elapsed_s,
        }
    }

    #[inline]
    pub fn gradient_pct(&self) -> Option<f64> {
        distance::gradient_pct(self.vertical_m, self.horizontal_m)
    }

    /// Instantaneous speed; non-positive elapsed time reads as standing still
    #[inline]
    pub fn speed_kmh(&self) -> f64 {
        if self.elapsed_s > 0.0 {
            self.horizontal_m / self.elapsed_s * 3.6
        } else {
            0.0
        }
    }

    #[inline]
    pub fn is_moving(&self, threshold_kmh: f64) -> bool {
        self.elapsed_s > 0.0 && self.speed_kmh() > threshold_kmh
    }
}

/// Split a track into its consecutive point pairs
pub(crate) fn segments(points: &[Trackpoint]) -> Vec<Segment> {
    (0..points.len().saturating_sub(1))
        .map(|start| Segment::between(points, start))
        .collect()
}

/// Compute ride statistics.
///
/// Returns `None` for an empty track or when any point lacks a timestamp.
/// Out-of-order or duplicate timestamps never produce negative time: such segments
/// count as not moving, total time is floored at zero and moving time is capped at
/// total time.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn compute_statistics(points: &[Trackpoint], config: &StatsConfig) -> Option<RouteStatistics> {
    if points.iter().any(|p| p.timestamp.is_none()) {
        return None;
    }
    let first = points.first()?.timestamp?;
    let last = points.last()?.timestamp?;
    let total_s = ((last - first).num_milliseconds() as f64 / 1000.0).max(0.0);

    let segments = segments(points);

    let mut distance_m = 0.0;
    let mut gain_m = 0.0;
    let mut loss_m = 0.0;
    let mut moving_s = 0.0;
    let mut max_speed_kmh: f64 = 0.0;
    let mut graded_horizontal_m = 0.0;
    let mut graded_vertical_m = 0.0;
    let mut max_gradient_pct: f64 = 0.0;

    for segment in &segments {
        distance_m += segment.horizontal_m;

        if let Some(vertical) = segment.vertical_m {
            if vertical > 0.0 {
                gain_m += vertical;
            } else {
                loss_m -= vertical;
            }
        }

        if segment.is_moving(config.moving_speed_threshold_kmh) {
            moving_s += segment.elapsed_s;
            max_speed_kmh = max_speed_kmh.max(segment.speed_kmh());
        }

        if let (Some(gradient), Some(vertical)) = (segment.gradient_pct(), segment.vertical_m) {
            graded_horizontal_m += segment.horizontal_m;
            graded_vertical_m += vertical;
            max_gradient_pct = max_gradient_pct.max(gradient);
        }
    }

    let moving_s = moving_s.min(total_s);
    let distance_km = distance_m / 1000.0;
    let avg_speed_kmh = if moving_s > 0.0 {
        distance_km / (moving_s / 3600.0)
    } else {
        0.0
    };
    let avg_gradient_pct = if graded_horizontal_m > 0.0 {
        graded_vertical_m / graded_horizontal_m * 100.0
    } else {
        0.0
    };

    Some(RouteStatistics {
        distance_km,
        elevation_gain_m: gain_m,
        elevation_loss_m: loss_m,
        avg_speed_kmh,
        max_speed_kmh,
        total_time_minutes: total_s / 60.0,
        moving_time_minutes: moving_s / 60.0,
        avg_gradient_pct,
        max_gradient_pct,
        top_climbs: climbs::detect_climbs(points, &segments, &config.climbs),
    })
}
