//! Climb segmentation
//!
//! A single pass over consecutive segments. A climb opens on the first segment at or
//! above `min_gradient_pct` and grows with every later qualifying segment. Segments
//! below the threshold (or without elevation) are held as a pending dip; a qualifying
//! segment absorbs the dip into the climb, while a dip longer than `gap_tolerance_m`
//! closes the climb at its last qualifying segment. Zero-length segments are ignored.
//! Closed climbs shorter than `min_distance_m`, or whose overall gradient falls below
//! `min_gradient_pct`, are dropped.

use crate::stats::Segment;
use crate::{ClimbConfig, Trackpoint};
use serde::{Deserialize, Serialize};

/// A maximal stretch of sustained ascent
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Climb {
    /// `sequence_index` of the first point of the climb
    pub start_index: usize,
    /// `sequence_index` of the last point of the climb
    pub end_index: usize,
    pub distance_km: f64,
    /// Net elevation change from start to end
    pub elevation_gain_m: f64,
    pub avg_gradient_pct: f64,
    /// Human-readable summary, e.g. "2.4 km at 6.1% average, +146 m"
    pub description: String,
}

impl Climb {
    pub fn is_finite(&self) -> bool {
        self.distance_km.is_finite()
            && self.elevation_gain_m.is_finite()
            && self.avg_gradient_pct.is_finite()
    }
}

/// Climb being grown by the scan
struct Candidate {
    start: usize,
    end: usize,
    distance_m: f64,
    pending_dip_m: f64,
}

impl Candidate {
    fn open(segment: &Segment) -> Self {
        Self {
            start: segment.start,
            end: segment.end,
            distance_m: segment.horizontal_m,
            pending_dip_m: 0.0,
        }
    }

    fn extend(&mut self, segment: &Segment) {
        self.distance_m += self.pending_dip_m + segment.horizontal_m;
        self.pending_dip_m = 0.0;
        self.end = segment.end;
    }
}

/// Detect climbs and return the `top_n` with the largest elevation gain.
///
/// Ties in gain keep track order.
pub(crate) fn detect_climbs(
    points: &[Trackpoint],
    segments: &[Segment],
    config: &ClimbConfig,
) -> Vec<Climb> {
    let mut climbs = Vec::new();
    let mut current: Option<Candidate> = None;

    for segment in segments {
        if segment.horizontal_m <= 0.0 {
            continue;
        }
        let qualifies = segment
            .gradient_pct()
            .is_some_and(|gradient| gradient >= config.min_gradient_pct);

        if let Some(candidate) = current.as_mut() {
            if qualifies {
                candidate.extend(segment);
                continue;
            }
            candidate.pending_dip_m += segment.horizontal_m;
            if candidate.pending_dip_m > config.gap_tolerance_m
                && let Some(closed) = current.take()
            {
                climbs.extend(finish(points, closed, config));
            }
        } else if qualifies {
            current = Some(Candidate::open(segment));
        }
    }
    if let Some(candidate) = current.take() {
        climbs.extend(finish(points, candidate, config));
    }

    tracing::trace!(found = climbs.len(), "Climb detection finished");

    climbs.sort_by(|a, b| {
        b.elevation_gain_m
            .total_cmp(&a.elevation_gain_m)
            .then(a.start_index.cmp(&b.start_index))
    });
    climbs.truncate(config.top_n);
    climbs
}

fn finish(points: &[Trackpoint], candidate: Candidate, config: &ClimbConfig) -> Option<Climb> {
    if candidate.distance_m < config.min_distance_m || candidate.distance_m <= 0.0 {
        return None;
    }

    let start = &points[candidate.start];
    let end = &points[candidate.end];
    let gain_m = end.elevation? - start.elevation?;
    let avg_gradient_pct = gain_m / candidate.distance_m * 100.0;
    if avg_gradient_pct < config.min_gradient_pct {
        return None;
    }

    let distance_km = candidate.distance_m / 1000.0;
    Some(Climb {
        start_index: start.sequence_index,
        end_index: end.sequence_index,
        distance_km,
        elevation_gain_m: gain_m,
        avg_gradient_pct,
        description: format!("{distance_km:.1} km at {avg_gradient_pct:.1}% average, +{gain_m:.0} m"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::segments;
    use crate::testing::straight_track;

    /// Build a 50 m spaced track from (length_m, gradient_pct) sections
    fn profile(sections: &[(f64, f64)]) -> Vec<Trackpoint> {
        let mut elevations = vec![200.0];
        for &(length_m, gradient_pct) in sections {
            let steps = (length_m / 50.0).round() as usize;
            for _ in 0..steps {
                let last = *elevations.last().unwrap_or(&0.0);
                elevations.push(last + 50.0 * gradient_pct / 100.0);
            }
        }
        let n = elevations.len();
        straight_track(n, 50.0, Some(10), |i| Some(elevations[i]))
    }

    fn climbs_of(track: &[Trackpoint], config: &ClimbConfig) -> Vec<Climb> {
        detect_climbs(track, &segments(track), config)
    }

    #[test]
    fn test_single_climb() {
        let track = profile(&[(500.0, 0.0), (1_000.0, 6.0), (500.0, 0.0)]);
        let climbs = climbs_of(&track, &ClimbConfig::default());

        assert_eq!(climbs.len(), 1);
        let climb = &climbs[0];
        assert_eq!(climb.start_index, 10);
        assert_eq!(climb.end_index, 30);
        assert!((climb.distance_km - 1.0).abs() < 1e-6);
        assert!((climb.elevation_gain_m - 60.0).abs() < 1e-6);
        assert!((climb.avg_gradient_pct - 6.0).abs() < 1e-6);
        assert_eq!(climb.description, "1.0 km at 6.0% average, +60 m");
    }

    #[test]
    fn test_short_dip_is_merged() {
        let track = profile(&[(600.0, 5.0), (50.0, 0.0), (600.0, 5.0)]);
        let climbs = climbs_of(&track, &ClimbConfig::default());

        assert_eq!(climbs.len(), 1);
        assert!((climbs[0].distance_km - 1.25).abs() < 1e-6);
        assert!((climbs[0].elevation_gain_m - 60.0).abs() < 1e-6);
        assert_eq!(climbs[0].start_index, 0);
        assert_eq!(climbs[0].end_index, track.len() - 1);
    }

    #[test]
    fn test_long_dip_splits_climbs() {
        let track = profile(&[(600.0, 5.0), (200.0, 0.0), (800.0, 5.0)]);
        let climbs = climbs_of(&track, &ClimbConfig::default());

        assert_eq!(climbs.len(), 2);
        // Larger gain first
        assert!((climbs[0].elevation_gain_m - 40.0).abs() < 1e-6);
        assert!((climbs[1].elevation_gain_m - 30.0).abs() < 1e-6);
        assert!(climbs[0].start_index > climbs[1].end_index);
    }

    #[test]
    fn test_trailing_dip_is_not_part_of_climb() {
        let track = profile(&[(1_000.0, 4.0), (100.0, -2.0)]);
        let climbs = climbs_of(&track, &ClimbConfig::default());

        assert_eq!(climbs.len(), 1);
        assert_eq!(climbs[0].end_index, 20);
        assert!((climbs[0].distance_km - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_short_and_gentle_ascents_ignored() {
        let short = profile(&[(300.0, 8.0), (500.0, 0.0)]);
        assert!(climbs_of(&short, &ClimbConfig::default()).is_empty());

        let gentle = profile(&[(2_000.0, 2.0)]);
        assert!(climbs_of(&gentle, &ClimbConfig::default()).is_empty());

        let descent = profile(&[(2_000.0, -6.0)]);
        assert!(climbs_of(&descent, &ClimbConfig::default()).is_empty());
    }

    #[test]
    fn test_top_n_truncation_and_ranking() {
        let mut sections = Vec::new();
        for gradient in [4.0, 9.0, 5.0, 8.0, 6.0, 7.0, 10.0] {
            sections.push((600.0, gradient));
            sections.push((300.0, 0.0));
        }
        let track = profile(&sections);
        let climbs = climbs_of(&track, &ClimbConfig::default());

        assert_eq!(climbs.len(), 5);
        let gradients: Vec<i64> = climbs
            .iter()
            .map(|c| c.avg_gradient_pct.round() as i64)
            .collect();
        assert_eq!(gradients, vec![10, 9, 8, 7, 6]);

        let config = ClimbConfig {
            top_n: 0,
            ..ClimbConfig::default()
        };
        assert!(climbs_of(&track, &config).is_empty());
    }

    #[test]
    fn test_missing_elevation_acts_as_dip() {
        let mut track = profile(&[(1_200.0, 6.0)]);
        // Knock out elevation in the middle: segments 11 and 12 lose their gradient
        track[12].elevation = None;
        let config = ClimbConfig {
            gap_tolerance_m: 150.0,
            ..ClimbConfig::default()
        };
        let climbs = climbs_of(&track, &config);

        assert_eq!(climbs.len(), 1);
        assert_eq!(climbs[0].start_index, 0);
        assert_eq!(climbs[0].end_index, track.len() - 1);
    }
}
