//! Shared fixtures for unit tests

use crate::Trackpoint;
use crate::distance::EARTH_RADIUS_M;
use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};

pub const BASE_LAT: f64 = 45.0;
pub const BASE_LON: f64 = 10.0;

/// Start time of every synthetic ride
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
}

/// Degrees of latitude spanning `meters` along a meridian
pub fn meters_to_lat_deg(meters: f64) -> f64 {
    meters / (EARTH_RADIUS_M * std::f64::consts::PI / 180.0)
}

pub fn point(
    index: usize,
    lat: f64,
    lon: f64,
    elevation: Option<f64>,
    offset_s: Option<i64>,
) -> Trackpoint {
    let timestamp = offset_s.map(|s| base_time() + Duration::seconds(s));
    Trackpoint::new(lat, lon, elevation, timestamp, index)
}

/// A northbound track with `spacing_m` between fixes and `dt_s` seconds between
/// timestamps (`None` for untimed tracks). `elevation` maps the point index to its
/// elevation.
pub fn straight_track(
    n: usize,
    spacing_m: f64,
    dt_s: Option<i64>,
    elevation: impl Fn(usize) -> Option<f64>,
) -> Vec<Trackpoint> {
    (0..n)
        .map(|i| {
            point(
                i,
                BASE_LAT + meters_to_lat_deg(spacing_m * i as f64),
                BASE_LON,
                elevation(i),
                dt_s.map(|dt| dt * i as i64),
            )
        })
        .collect()
}

/// Render points as a GPX 1.1 document with a single track
pub fn gpx_document(points: &[Trackpoint]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="ride-track-tests" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Test ride</name>
    <trkseg>
"#,
    );
    for p in points {
        xml.push_str(&format!(
            r#"      <trkpt lat="{}" lon="{}">"#,
            p.latitude, p.longitude
        ));
        if let Some(elevation) = p.elevation {
            xml.push_str(&format!("<ele>{elevation}</ele>"));
        }
        if let Some(timestamp) = p.timestamp {
            xml.push_str(&format!(
                "<time>{}</time>",
                timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
            ));
        }
        xml.push_str("</trkpt>\n");
    }
    xml.push_str("    </trkseg>\n  </trk>\n</gpx>\n");
    xml
}
