//! Point-to-point distance and gradient math
//!
//! Horizontal (ground) distance is the only denominator used for gradients and the
//! only basis for ride distance. [`slope_distance`] exists for callers that want the
//! 3D length of a segment, but feeding it into a gradient inflates steep segments,
//! so nothing in the statistics engine uses it.

use crate::Trackpoint;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle ground distance between two points in meters, ignoring elevation.
///
/// Uses the Haversine formula for accurate distance calculation on a sphere.
#[inline]
pub fn horizontal_distance(a: &Trackpoint, b: &Trackpoint) -> f64 {
    haversine_m(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Haversine distance in meters between two WGS84 coordinates given in degrees
#[inline]
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Signed elevation change from `a` to `b` in meters.
///
/// `None` when either point has no elevation.
#[inline]
pub fn vertical_delta(a: &Trackpoint, b: &Trackpoint) -> Option<f64> {
    Some(b.elevation? - a.elevation?)
}

/// 3D segment length in meters (hypotenuse of horizontal distance and elevation change).
///
/// Falls back to the horizontal distance when elevation is missing. Never use this as
/// a gradient denominator.
#[inline]
pub fn slope_distance(a: &Trackpoint, b: &Trackpoint) -> f64 {
    let horizontal = horizontal_distance(a, b);
    match vertical_delta(a, b) {
        Some(vertical) => horizontal.hypot(vertical),
        None => horizontal,
    }
}

/// Gradient in percent from elevation change over horizontal distance.
///
/// Undefined (`None`) when elevation is missing or the horizontal distance is zero.
#[inline]
pub fn gradient_pct(vertical: Option<f64>, horizontal: f64) -> Option<f64> {
    let vertical = vertical?;
    if horizontal <= 0.0 {
        return None;
    }
    Some(vertical / horizontal * 100.0)
}

/// Gradient in percent between two points, see [`gradient_pct`]
#[inline]
pub fn segment_gradient_pct(a: &Trackpoint, b: &Trackpoint) -> Option<f64> {
    gradient_pct(vertical_delta(a, b), horizontal_distance(a, b))
}
