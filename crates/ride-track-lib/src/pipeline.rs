//! The pure, synchronous processing pipeline: parse, then simplify and compute
//! statistics side by side
//!
//! Nothing here knows about modes, workers or storage. Each run owns its trackpoints.

use crate::parser::parse_gpx;
use crate::simplify::simplify;
use crate::stats::compute_statistics;
use crate::{IngestConfig, IngestError, Result, RouteStatistics, SimplifiedTrack, TrackBounds};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Pipeline stage, used to locate internal failures in logs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Simplify,
    Statistics,
    Persist,
    /// Failure that cannot be attributed to a single stage, e.g. a panic
    Pipeline,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Parse => "parse",
            Stage::Simplify => "simplify",
            Stage::Statistics => "statistics",
            Stage::Persist => "persist",
            Stage::Pipeline => "pipeline",
        })
    }
}

/// Everything a successful run attaches to its track file
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineOutput {
    pub name: Option<String>,
    pub raw_point_count: usize,
    pub simplified: SimplifiedTrack,
    pub statistics: Option<RouteStatistics>,
    pub bounds: Option<TrackBounds>,
}

/// Run the pipeline over raw GPX bytes
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn run(bytes: &[u8], config: &IngestConfig) -> Result<PipelineOutput> {
    let parsed = parse_gpx(bytes)?;
    let points = parsed.points;

    // Both consume the full track; neither depends on the other
    let (simplified, statistics) = rayon::join(
        || simplify(&points, config.simplify_tolerance_m),
        || compute_statistics(&points, &config.stats),
    );

    if simplified.len() > points.len() {
        return Err(IngestError::Internal {
            stage: Stage::Simplify,
            message: format!(
                "simplified track has {} points, input has {}",
                simplified.len(),
                points.len()
            ),
        });
    }
    if let Some(stats) = &statistics
        && !stats.is_finite()
    {
        return Err(IngestError::Internal {
            stage: Stage::Statistics,
            message: format!("non-finite statistics: {stats:?}"),
        });
    }

    Ok(PipelineOutput {
        name: parsed.name,
        raw_point_count: points.len(),
        bounds: TrackBounds::from_points(&points),
        simplified,
        statistics,
    })
}

/// [`run`], with a panic anywhere in the pipeline turned into an internal error
pub fn run_guarded(bytes: &[u8], config: &IngestConfig) -> Result<PipelineOutput> {
    guard(|| run(bytes, config))
}

pub(crate) fn guard<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(IngestError::Internal {
                stage: Stage::Pipeline,
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{gpx_document, straight_track};

    #[test]
    fn test_run_timed_track() {
        let track = straight_track(50, 20.0, Some(5), |i| Some(100.0 + i as f64 * 0.5));
        let output = run(gpx_document(&track).as_bytes(), &IngestConfig::default()).unwrap();

        assert_eq!(output.raw_point_count, 50);
        assert!(output.simplified.len() <= 50);
        assert_eq!(output.simplified.points[0].sequence_index, 0);
        assert_eq!(output.simplified.points.last().unwrap().sequence_index, 49);
        assert_eq!(output.name.as_deref(), Some("Test ride"));
        assert!(output.bounds.is_some());

        let stats = output.statistics.unwrap();
        assert!((stats.distance_km - 0.98).abs() < 1e-3);
    }

    #[test]
    fn test_run_untimed_track_has_no_statistics() {
        let track = straight_track(10, 20.0, None, |_| Some(5.0));
        let output = run(gpx_document(&track).as_bytes(), &IngestConfig::default()).unwrap();
        assert!(output.statistics.is_none());
        assert_eq!(output.raw_point_count, 10);
    }

    #[test]
    fn test_run_invalid_input() {
        let result = run(b"<gpx>", &IngestConfig::default());
        assert!(matches!(result, Err(IngestError::InvalidTrackFormat(_))));
    }

    #[test]
    fn test_guard_converts_panics() {
        let result: Result<()> = guard(|| panic!("boom"));
        match result {
            Err(IngestError::Internal { stage, message }) => {
                assert_eq!(stage, Stage::Pipeline);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let ok = guard(|| Ok(7));
        assert_eq!(ok.unwrap(), 7);
    }
}
