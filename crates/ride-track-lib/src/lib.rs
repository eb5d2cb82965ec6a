//! Ride Track Library - GPS track ingestion and ride statistics
//!
//! This library turns an uploaded GPX document into the data a ride diary shows:
//! a reduced polyline for storage and map rendering, and aggregate ride statistics
//! (distance, elevation, speed, gradient and the most significant climbs).
//!
//! # Architecture
//!
//! - **[`parser`]**: GPX bytes to an ordered sequence of [`Trackpoint`]s
//! - **[`distance`]**: horizontal (ground) distance, vertical delta and gradient
//! - **[`simplify`]**: Douglas-Peucker reduction to a [`SimplifiedTrack`]
//! - **[`stats`]**: [`RouteStatistics`] and climb segmentation over the full track
//! - **[`pipeline`]**: parse, then simplify and compute statistics in parallel
//! - **[`ModePolicy`]**: inline vs deferred execution chosen from the upload size
//! - **[`Ingestor`]**: wires the pipeline, the bounded worker pool, the
//!   [`TrackFileStore`] and the [`MetricsObserver`]
//!
//! Data flows one way: bytes -> trackpoints -> {simplified track, statistics} -> stored
//! [`TrackFile`]. The mode policy only decides *where* the pipeline runs.

mod climbs;
mod config;
pub mod distance;
mod ingest;
mod metrics;
pub mod parser;
pub mod pipeline;
mod policy;
pub mod simplify;
pub mod stats;
mod store;
#[cfg(test)]
mod testing;
mod track_file;
mod trackpoint;
pub mod utils;
mod worker;

// Public API exports
pub use climbs::Climb;
pub use config::{ClimbConfig, IngestConfig, StatsConfig, WorkerConfig};
pub use ingest::{Ingestor, Receipt, TrackResult};
pub use metrics::{MemoryObserver, MetricEvent, MetricsObserver, NoopObserver, TracingObserver};
pub use parser::ParsedTrack;
pub use pipeline::{PipelineOutput, Stage};
pub use policy::{ModeDecision, ModePolicy, ModeReason, ProcessingMode};
pub use simplify::SimplifiedTrack;
pub use stats::RouteStatistics;
pub use store::{FileStore, MemoryStore, StoreError, StoreResult, TrackFileStore};
pub use track_file::{ErrorInfo, ErrorKind, ProcessingStatus, TrackBounds, TrackFile, TrackFileId, TripId};
pub use trackpoint::Trackpoint;
pub use worker::WorkerPool;

/// Error types for track ingestion
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Invalid track format: {0}")]
    InvalidTrackFormat(String),

    #[error("Internal error during {stage}: {message}")]
    Internal { stage: Stage, message: String },

    #[error("Processing queue is full ({capacity} jobs waiting)")]
    QueueSaturated { capacity: usize },

    #[error("Processing queue is shutting down")]
    ShuttingDown,

    #[error("Deferred processing requires a running tokio runtime")]
    NoRuntime,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Illegal status transition: {from} -> {to}")]
    InvalidTransition {
        from: ProcessingStatus,
        to: ProcessingStatus,
    },

    #[error("Track file not found: {0}")]
    NotFound(TrackFileId),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl IngestError {
    /// Coarse classification recorded on a failed [`TrackFile`].
    ///
    /// Only malformed input is reported as [`ErrorKind::InvalidFormat`]; everything
    /// else is an internal failure whose details stay in the logs.
    pub fn classify(&self) -> ErrorKind {
        match self {
            IngestError::InvalidTrackFormat(_) => ErrorKind::InvalidFormat,
            _ => ErrorKind::InternalError,
        }
    }
}

impl From<gpx::errors::GpxError> for IngestError {
    fn from(err: gpx::errors::GpxError) -> Self {
        IngestError::InvalidTrackFormat(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
