//! Ingestion orchestrator
//!
//! Creates the [`TrackFile`], picks the processing mode from the declared file size
//! and either runs the pipeline on the calling thread or hands it to the bounded
//! [`WorkerPool`]. Every pipeline outcome, panics included, ends as a COMPLETED or
//! FAILED record; errors only escape [`Ingestor::ingest`] when no record was created
//! (queue saturated, shutting down, PENDING write refused). A record whose move to
//! PROCESSING cannot be written is failed on the spot.
//!
//! Once a record is PROCESSING it cannot be cancelled, and FAILED records are never
//! retried: reprocessing takes a fresh upload.

use crate::pipeline::{self, PipelineOutput, Stage};
use crate::{
    ErrorInfo, IngestConfig, IngestError, MetricEvent, MetricsObserver, ProcessingMode,
    ProcessingStatus, Result, RouteStatistics, SimplifiedTrack, TrackFile, TrackFileId,
    TrackFileStore, TripId, WorkerPool,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;

/// Answer of [`Ingestor::ingest`]
#[derive(Debug)]
pub struct Receipt {
    pub track_file_id: TrackFileId,
    /// Terminal for inline runs, PROCESSING for deferred ones
    pub status: ProcessingStatus,
    /// Resolves to the terminal status of a deferred run
    pub completion: Option<oneshot::Receiver<ProcessingStatus>>,
}

impl Receipt {
    fn terminal(track_file_id: TrackFileId, status: ProcessingStatus) -> Self {
        Self {
            track_file_id,
            status,
            completion: None,
        }
    }

    /// Wait for the terminal status
    pub async fn finished(self) -> Result<ProcessingStatus> {
        match self.completion {
            None => Ok(self.status),
            Some(completion) => completion.await.map_err(|_| IngestError::Internal {
                stage: Stage::Pipeline,
                message: "worker dropped the completion signal".to_string(),
            }),
        }
    }
}

/// What a caller polling for a track file gets back
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackResult {
    pub track_file_id: TrackFileId,
    pub status: ProcessingStatus,
    pub name: Option<String>,
    pub raw_point_count: usize,
    pub simplified_point_count: usize,
    pub simplified_track: Option<SimplifiedTrack>,
    pub statistics: Option<RouteStatistics>,
    pub error: Option<ErrorInfo>,
}

impl From<TrackFile> for TrackResult {
    fn from(file: TrackFile) -> Self {
        Self {
            track_file_id: file.id,
            status: file.status,
            name: file.name,
            raw_point_count: file.raw_point_count,
            simplified_point_count: file.simplified_point_count,
            simplified_track: file.simplified_track,
            statistics: file.statistics,
            error: file.error,
        }
    }
}

/// Deferred unit of work: one PROCESSING record and the bytes it came from
struct Job {
    file: TrackFile,
    bytes: Vec<u8>,
    done: oneshot::Sender<ProcessingStatus>,
}

/// State shared between the calling path and the workers
struct Shared {
    config: IngestConfig,
    store: Arc<dyn TrackFileStore>,
    observer: Arc<dyn MetricsObserver>,
}

/// Counts reported once a run has been persisted
struct Summary {
    raw_point_count: usize,
    simplified_point_count: usize,
    distance_km: Option<f64>,
}

pub struct Ingestor {
    shared: Arc<Shared>,
    pool: WorkerPool<Job>,
}

impl Ingestor {
    /// Validate `config` and start the worker pool on the current tokio runtime
    pub fn start(
        config: IngestConfig,
        store: Arc<dyn TrackFileStore>,
        observer: Arc<dyn MetricsObserver>,
    ) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared {
            config,
            store,
            observer,
        });
        let worker_shared = Arc::clone(&shared);
        let pool = WorkerPool::start(&shared.config.workers, move |job: Job| {
            let status = worker_shared.process(job.file, &job.bytes, ProcessingMode::Deferred);
            // The caller may have dropped its receipt
            let _ = job.done.send(status);
        })?;

        Ok(Self { shared, pool })
    }

    /// Accept an upload.
    ///
    /// `file_size` drives the mode decision. Inline uploads return with a terminal
    /// status; deferred ones return PROCESSING plus a completion receiver.
    ///
    /// # Errors
    /// [`IngestError::QueueSaturated`] or [`IngestError::ShuttingDown`] when a deferred
    /// upload cannot be queued, [`IngestError::Store`] when the PENDING record cannot
    /// be written. No record exists in either case. Later failures, including a
    /// refused PROCESSING write, are never returned here; they are recorded on the
    /// track file.
    pub fn ingest(&self, bytes: Vec<u8>, trip_id: TripId, file_size: u64) -> Result<Receipt> {
        let mut file = TrackFile::new(trip_id, file_size);
        let id = file.id;
        self.shared.observer.record(&MetricEvent::UploadReceived {
            track_file_id: id,
            file_size_bytes: file_size,
        });

        if bytes.len() as u64 != file_size {
            tracing::warn!(
                track_file_id = %id,
                declared = file_size,
                actual = bytes.len(),
                "Declared file size differs from payload size"
            );
        }

        let decision = self.shared.config.mode.decide(file_size);
        self.shared.observer.record(&MetricEvent::ModeDecided {
            mode: decision.mode,
            reason: decision.reason,
            file_size_bytes: decision.file_size_bytes,
            threshold_bytes: decision.threshold_bytes,
        });
        tracing::debug!(track_file_id = %id, mode = %decision.mode, "Processing mode selected");

        match decision.mode {
            ProcessingMode::Inline => {
                self.shared.store.save(&file)?;
                if let Err(err) = self.shared.mark_processing(&mut file) {
                    let status = self.shared.fail(file, &err, ProcessingMode::Inline, 0.0);
                    return Ok(Receipt::terminal(id, status));
                }

                let status = self.shared.process(file, &bytes, ProcessingMode::Inline);
                Ok(Receipt::terminal(id, status))
            }
            ProcessingMode::Deferred => {
                let permit = match self.pool.reserve() {
                    Ok(permit) => permit,
                    Err(err) => {
                        if let IngestError::QueueSaturated { capacity } = err {
                            self.shared.observer.record(&MetricEvent::QueueSaturated {
                                queue_capacity: capacity,
                                file_size_bytes: file_size,
                            });
                        }
                        tracing::warn!(track_file_id = %id, "Deferred upload rejected: {err}");
                        return Err(err);
                    }
                };

                self.shared.store.save(&file)?;
                if let Err(err) = self.shared.mark_processing(&mut file) {
                    // Dropping the permit hands the queue slot back
                    let status = self.shared.fail(file, &err, ProcessingMode::Deferred, 0.0);
                    return Ok(Receipt::terminal(id, status));
                }

                let (done, completion) = oneshot::channel();
                permit.send(Job { file, bytes, done });
                Ok(Receipt {
                    track_file_id: id,
                    status: ProcessingStatus::Processing,
                    completion: Some(completion),
                })
            }
        }
    }

    /// Current state of a track file
    pub fn result(&self, id: &TrackFileId) -> Result<TrackResult> {
        self.shared
            .store
            .load(id)?
            .map(TrackResult::from)
            .ok_or(IngestError::NotFound(*id))
    }

    /// Stop accepting deferred uploads and wait for queued ones to finish
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}

impl Shared {
    /// Run the pipeline for a PROCESSING record and persist the terminal state
    fn process(&self, file: TrackFile, bytes: &[u8], mode: ProcessingMode) -> ProcessingStatus {
        let started = Instant::now();
        let outcome = pipeline::run_guarded(bytes, &self.config)
            .and_then(|output| self.persist_completed(&file, output));
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(summary) => {
                tracing::info!(
                    track_file_id = %file.id,
                    %mode,
                    duration_ms,
                    raw_points = summary.raw_point_count,
                    simplified_points = summary.simplified_point_count,
                    "Track processed"
                );
                self.observer.record(&MetricEvent::ProcessingCompleted {
                    track_file_id: file.id,
                    mode,
                    duration_ms,
                    raw_point_count: summary.raw_point_count,
                    simplified_point_count: summary.simplified_point_count,
                    distance_km: summary.distance_km,
                    success: true,
                });
                ProcessingStatus::Completed
            }
            Err(err) => self.fail(file, &err, mode, duration_ms),
        }
    }

    /// Move a stored PENDING record to PROCESSING
    fn mark_processing(&self, file: &mut TrackFile) -> Result<()> {
        file.start_processing()?;
        self.store.save(file).map_err(|e| IngestError::Internal {
            stage: Stage::Persist,
            message: e.to_string(),
        })
    }

    /// Log, persist and report a failed run
    fn fail(
        &self,
        file: TrackFile,
        err: &IngestError,
        mode: ProcessingMode,
        duration_ms: f64,
    ) -> ProcessingStatus {
        let error_kind = err.classify();
        match err {
            IngestError::InvalidTrackFormat(_) => {
                tracing::warn!(track_file_id = %file.id, %mode, "Rejected track: {err}");
            }
            IngestError::Internal { stage, .. } => {
                tracing::error!(track_file_id = %file.id, %stage, %mode, "Track processing failed: {err}");
            }
            _ => {
                tracing::error!(track_file_id = %file.id, %mode, "Track processing failed: {err}");
            }
        }
        let id = file.id;
        self.persist_failed(file, err);
        self.observer.record(&MetricEvent::ProcessingFailed {
            track_file_id: id,
            mode,
            duration_ms,
            error_kind,
        });
        ProcessingStatus::Failed
    }

    fn persist_completed(&self, file: &TrackFile, output: PipelineOutput) -> Result<Summary> {
        let summary = Summary {
            raw_point_count: output.raw_point_count,
            simplified_point_count: output.simplified.len(),
            distance_km: output.statistics.as_ref().map(|s| s.distance_km),
        };
        let mut completed = file.clone();
        completed.complete(output)?;
        self.store
            .save(&completed)
            .map_err(|e| IngestError::Internal {
                stage: Stage::Persist,
                message: e.to_string(),
            })?;
        Ok(summary)
    }

    fn persist_failed(&self, mut file: TrackFile, err: &IngestError) {
        let recorded = file
            .fail(ErrorInfo::from_error(err))
            .and_then(|()| self.store.save(&file).map_err(IngestError::from));
        if let Err(e) = recorded {
            tracing::error!(track_file_id = %file.id, "Could not record failure: {e}");
        }
    }
}
