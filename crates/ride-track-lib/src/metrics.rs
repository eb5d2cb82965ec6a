//! Structured processing metrics and the observers that receive them
//!
//! Events are observational only: an observer can never influence the pipeline. The
//! [`Ingestor`](crate::Ingestor) takes any [`MetricsObserver`] at construction, so
//! tests can capture events without a logging backend.

use crate::{ErrorKind, ModeReason, ProcessingMode, TrackFileId};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MetricEvent {
    UploadReceived {
        track_file_id: TrackFileId,
        file_size_bytes: u64,
    },
    ModeDecided {
        mode: ProcessingMode,
        reason: ModeReason,
        file_size_bytes: u64,
        threshold_bytes: u64,
    },
    ProcessingCompleted {
        track_file_id: TrackFileId,
        mode: ProcessingMode,
        duration_ms: f64,
        raw_point_count: usize,
        simplified_point_count: usize,
        distance_km: Option<f64>,
        success: bool,
    },
    ProcessingFailed {
        track_file_id: TrackFileId,
        mode: ProcessingMode,
        duration_ms: f64,
        error_kind: ErrorKind,
    },
    /// A deferred upload was rejected because the worker queue was full
    QueueSaturated { queue_capacity: usize, file_size_bytes: u64 },
}

/// Sink for [`MetricEvent`]s
pub trait MetricsObserver: Send + Sync {
    fn record(&self, event: &MetricEvent);
}

/// Logs every event on the `ride_track::metrics` target
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl MetricsObserver for TracingObserver {
    fn record(&self, event: &MetricEvent) {
        match event {
            MetricEvent::UploadReceived {
                track_file_id,
                file_size_bytes,
            } => {
                tracing::info!(
                    target: "ride_track::metrics",
                    %track_file_id,
                    file_size_bytes,
                    "upload received"
                );
            }
            MetricEvent::ModeDecided {
                mode,
                reason,
                file_size_bytes,
                threshold_bytes,
            } => {
                tracing::info!(
                    target: "ride_track::metrics",
                    %mode,
                    ?reason,
                    file_size_bytes,
                    threshold_bytes,
                    "processing mode decided"
                );
            }
            MetricEvent::ProcessingCompleted {
                track_file_id,
                mode,
                duration_ms,
                raw_point_count,
                simplified_point_count,
                distance_km,
                success,
            } => {
                tracing::info!(
                    target: "ride_track::metrics",
                    %track_file_id,
                    %mode,
                    duration_ms,
                    raw_point_count,
                    simplified_point_count,
                    distance_km = ?distance_km,
                    success,
                    "processing completed"
                );
            }
            MetricEvent::ProcessingFailed {
                track_file_id,
                mode,
                duration_ms,
                error_kind,
            } => {
                tracing::info!(
                    target: "ride_track::metrics",
                    %track_file_id,
                    %mode,
                    duration_ms,
                    %error_kind,
                    "processing failed"
                );
            }
            MetricEvent::QueueSaturated {
                queue_capacity,
                file_size_bytes,
            } => {
                tracing::warn!(
                    target: "ride_track::metrics",
                    queue_capacity,
                    file_size_bytes,
                    "processing queue saturated"
                );
            }
        }
    }
}

/// Discards every event
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl MetricsObserver for NoopObserver {
    fn record(&self, _event: &MetricEvent) {}
}

/// Keeps events in memory, in arrival order
#[derive(Debug, Default)]
pub struct MemoryObserver {
    events: Mutex<Vec<MetricEvent>>,
}

impl MemoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far
    pub fn events(&self) -> Vec<MetricEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl MetricsObserver for MemoryObserver {
    fn record(&self, event: &MetricEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

impl<F> MetricsObserver for F
where
    F: Fn(&MetricEvent) + Send + Sync,
{
    fn record(&self, event: &MetricEvent) {
        self(event)
    }
}

impl MetricsObserver for tokio::sync::mpsc::UnboundedSender<MetricEvent> {
    fn record(&self, event: &MetricEvent) {
        // A dropped receiver only means nobody is listening anymore
        if self.send(event.clone()).is_err() {
            tracing::trace!("metrics receiver dropped");
        }
    }
}
