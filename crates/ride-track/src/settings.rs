use clap::Parser;
use ride_track_lib::{ClimbConfig, IngestConfig, ModePolicy, StatsConfig, WorkerConfig};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Ride Track - ingest GPX ride recordings and print their statistics as JSON
pub struct Settings {
    /// GPX files to ingest
    #[clap(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Trip the uploaded tracks belong to
    #[clap(long, value_name = "ID")]
    pub trip: String,

    /// JSON file to persist track file records in (in-memory when omitted)
    #[clap(long, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Douglas-Peucker tolerance in meters
    #[clap(long, default_value = "5.0")]
    pub tolerance: f64,

    /// Segments faster than this count as moving (km/h)
    #[clap(long, default_value = "1.0")]
    pub moving_threshold: f64,

    /// Minimum gradient of a climb (%)
    #[clap(long, default_value = "3.0")]
    pub climb_min_gradient: f64,

    /// Minimum length of a climb (m)
    #[clap(long, default_value = "500.0")]
    pub climb_min_distance: f64,

    /// Distance below the gradient threshold tolerated inside a climb (m)
    #[clap(long, default_value = "100.0")]
    pub climb_gap_tolerance: f64,

    /// Number of climbs to report
    #[clap(long, default_value = "5")]
    pub top_climbs: usize,

    /// Files of at least this many bytes are processed in the background
    #[clap(long, default_value = "1048576")]
    pub async_threshold: u64,

    /// Background pipelines allowed to run at once
    #[clap(long, default_value = "2")]
    pub workers: usize,

    /// Background jobs allowed to wait for a worker
    #[clap(long, default_value = "32")]
    pub queue_capacity: usize,
}

impl Settings {
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    pub fn to_config(&self) -> IngestConfig {
        IngestConfig {
            simplify_tolerance_m: self.tolerance,
            stats: StatsConfig {
                moving_speed_threshold_kmh: self.moving_threshold,
                climbs: ClimbConfig {
                    min_gradient_pct: self.climb_min_gradient,
                    min_distance_m: self.climb_min_distance,
                    gap_tolerance_m: self.climb_gap_tolerance,
                    top_n: self.top_climbs,
                },
            },
            mode: ModePolicy::new(self.async_threshold),
            workers: WorkerConfig {
                workers: self.workers,
                queue_capacity: self.queue_capacity,
            },
        }
    }
}
