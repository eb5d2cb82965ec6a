//! GPX decoding into trackpoints
//!
//! The parser knows nothing about the rest of the pipeline: it turns a raw byte stream
//! into an ordered [`Trackpoint`] sequence and fails with
//! [`IngestError::InvalidTrackFormat`] when the document is unusable.

use crate::{IngestError, Result, Trackpoint};
use chrono::{DateTime, Utc};

/// Output of the parser: the document name (if any) and its points in file order
#[derive(Clone, Debug)]
pub struct ParsedTrack {
    pub name: Option<String>,
    pub points: Vec<Trackpoint>,
}

/// Parse a GPX document.
///
/// Track points of all tracks and segments are concatenated in file order. A document
/// with no track points falls back to its route points. `sequence_index` is assigned
/// from 0 in the resulting order.
///
/// # Errors
/// [`IngestError::InvalidTrackFormat`] when the XML cannot be decoded, when it holds
/// no points at all, or when a point carries an impossible coordinate or timestamp.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn parse_gpx(bytes: &[u8]) -> Result<ParsedTrack> {
    let gpx = gpx::read(bytes)?;

    let name = gpx
        .metadata
        .as_ref()
        .and_then(|metadata| metadata.name.clone())
        .or_else(|| gpx.tracks.iter().find_map(|track| track.name.clone()))
        .or_else(|| gpx.routes.iter().find_map(|route| route.name.clone()));

    let mut waypoints: Vec<&gpx::Waypoint> = gpx
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .flat_map(|segment| segment.points.iter())
        .collect();

    if waypoints.is_empty() {
        waypoints = gpx
            .routes
            .iter()
            .flat_map(|route| route.points.iter())
            .collect();
    }

    if waypoints.is_empty() {
        return Err(IngestError::InvalidTrackFormat(
            "document contains no track points".to_string(),
        ));
    }

    let points = waypoints
        .into_iter()
        .enumerate()
        .map(|(index, waypoint)| to_trackpoint(index, waypoint))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(points = points.len(), name = ?name, "Parsed GPX document");

    Ok(ParsedTrack { name, points })
}

fn to_trackpoint(index: usize, waypoint: &gpx::Waypoint) -> Result<Trackpoint> {
    let position = waypoint.point();
    let (latitude, longitude) = (position.y(), position.x());

    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(IngestError::InvalidTrackFormat(format!(
            "point {index}: latitude {latitude} out of range"
        )));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(IngestError::InvalidTrackFormat(format!(
            "point {index}: longitude {longitude} out of range"
        )));
    }

    let elevation = waypoint.elevation.filter(|e| e.is_finite());
    let timestamp = waypoint
        .time
        .as_ref()
        .map(|fix_time| convert_time(index, fix_time))
        .transpose()?;

    Ok(Trackpoint::new(latitude, longitude, elevation, timestamp, index))
}

fn convert_time(index: usize, fix_time: &gpx::Time) -> Result<DateTime<Utc>> {
    let odt: ::time::OffsetDateTime = fix_time.clone().into();
    DateTime::from_timestamp(odt.unix_timestamp(), odt.nanosecond()).ok_or_else(|| {
        IngestError::InvalidTrackFormat(format!("point {index}: timestamp out of range"))
    })
}
