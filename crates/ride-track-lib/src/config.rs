//! Tunable thresholds for the ingestion pipeline
//!
//! Every operational value lives here with its documented default; nothing else in the
//! crate hard-codes a threshold.

use crate::{IngestError, ModePolicy, Result};
use serde::{Deserialize, Serialize};

/// Top-level configuration for an [`Ingestor`](crate::Ingestor)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Maximum perpendicular deviation in meters for Douglas-Peucker.
    /// Default: 5 m
    pub simplify_tolerance_m: f64,
    /// Statistics and climb detection thresholds
    pub stats: StatsConfig,
    /// Inline vs deferred size threshold
    pub mode: ModePolicy,
    /// Bounds for deferred execution
    pub workers: WorkerConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            simplify_tolerance_m: 5.0,
            stats: StatsConfig::default(),
            mode: ModePolicy::default(),
            workers: WorkerConfig::default(),
        }
    }
}

/// Thresholds for [`compute_statistics`](crate::stats::compute_statistics)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// A segment counts as moving when its speed exceeds this value.
    /// Default: 1 km/h
    pub moving_speed_threshold_kmh: f64,
    pub climbs: ClimbConfig,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            moving_speed_threshold_kmh: 1.0,
            climbs: ClimbConfig::default(),
        }
    }
}

/// Climb segmentation thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimbConfig {
    /// Segments at or above this gradient extend a climb. Default: 3 %
    pub min_gradient_pct: f64,
    /// Minimum horizontal length of a reported climb. Default: 500 m
    pub min_distance_m: f64,
    /// Cumulative horizontal distance below `min_gradient_pct` tolerated inside a climb
    /// before it ends. Default: 100 m
    pub gap_tolerance_m: f64,
    /// Number of climbs kept, most elevation gain first. Default: 5
    pub top_n: usize,
}

impl Default for ClimbConfig {
    fn default() -> Self {
        Self {
            min_gradient_pct: 3.0,
            min_distance_m: 500.0,
            gap_tolerance_m: 100.0,
            top_n: 5,
        }
    }
}

/// Bounded worker pool settings for deferred runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Pipelines allowed to run at the same time. Default: 2
    pub workers: usize,
    /// Jobs allowed to wait for a worker; submissions beyond this are rejected.
    /// Default: 32
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 32,
        }
    }
}

impl IngestConfig {
    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        non_negative("simplify_tolerance_m", self.simplify_tolerance_m)?;
        non_negative(
            "stats.moving_speed_threshold_kmh",
            self.stats.moving_speed_threshold_kmh,
        )?;

        let climbs = &self.stats.climbs;
        non_negative("stats.climbs.min_gradient_pct", climbs.min_gradient_pct)?;
        non_negative("stats.climbs.min_distance_m", climbs.min_distance_m)?;
        non_negative("stats.climbs.gap_tolerance_m", climbs.gap_tolerance_m)?;

        if self.workers.workers == 0 {
            return Err(IngestError::InvalidConfig(
                "workers.workers must be at least 1".to_string(),
            ));
        }
        if self.workers.queue_capacity == 0 {
            return Err(IngestError::InvalidConfig(
                "workers.queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(IngestError::InvalidConfig(format!(
            "{name} must be a finite, non-negative number (got {value})"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = IngestConfig::default();
        assert_eq!(config.simplify_tolerance_m, 5.0);
        assert_eq!(config.stats.moving_speed_threshold_kmh, 1.0);
        assert_eq!(config.stats.climbs.min_gradient_pct, 3.0);
        assert_eq!(config.stats.climbs.min_distance_m, 500.0);
        assert_eq!(config.stats.climbs.gap_tolerance_m, 100.0);
        assert_eq!(config.stats.climbs.top_n, 5);
        assert_eq!(config.mode.async_threshold_bytes, 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = IngestConfig::default();
        config.simplify_tolerance_m = -1.0;
        assert!(matches!(config.validate(), Err(IngestError::InvalidConfig(_))));

        let mut config = IngestConfig::default();
        config.stats.climbs.min_distance_m = f64::NAN;
        assert!(matches!(config.validate(), Err(IngestError::InvalidConfig(_))));

        let mut config = IngestConfig::default();
        config.workers.queue_capacity = 0;
        assert!(matches!(config.validate(), Err(IngestError::InvalidConfig(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: IngestConfig =
            serde_json::from_str(r#"{"stats": {"climbs": {"top_n": 3}}}"#).unwrap();
        assert_eq!(config.stats.climbs.top_n, 3);
        assert_eq!(config.stats.climbs.min_gradient_pct, 3.0);
        assert_eq!(config.simplify_tolerance_m, 5.0);
    }
}
