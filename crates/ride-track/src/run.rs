use crate::settings::Settings;
use ride_track_lib::{
    FileStore, IngestError, Ingestor, MemoryStore, ProcessingStatus, Receipt, TrackFileStore,
    TracingObserver, TripId,
};
use serde_json::json;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

/// Ingest every file, wait for background runs and print one JSON line per file
pub async fn run(settings: Settings) -> ExitCode {
    let store: Arc<dyn TrackFileStore> = match &settings.store {
        Some(path) => match FileStore::new_with_path(path) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::error!("Failed to open store {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => Arc::new(MemoryStore::new()),
    };

    let ingestor = match Ingestor::start(settings.to_config(), store, Arc::new(TracingObserver)) {
        Ok(ingestor) => ingestor,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let trip_id = TripId::from(settings.trip.as_str());
    let mut pending: VecDeque<(PathBuf, Receipt)> = VecDeque::new();
    let mut all_ok = true;

    for path in &settings.files {
        let (bytes, size) = match read_file(path) {
            Ok(read) => read,
            Err(e) => {
                report_error(path, &e.to_string());
                all_ok = false;
                continue;
            }
        };

        loop {
            match ingestor.ingest(bytes.clone(), trip_id.clone(), size) {
                Ok(receipt) => {
                    pending.push_back((path.clone(), receipt));
                    break;
                }
                // Make room by waiting for the oldest background run
                Err(IngestError::QueueSaturated { .. }) if !pending.is_empty() => {
                    if let Some((done_path, receipt)) = pending.pop_front() {
                        all_ok &= report(&ingestor, &done_path, receipt).await;
                    }
                }
                Err(e) => {
                    report_error(path, &e.to_string());
                    all_ok = false;
                    break;
                }
            }
        }
    }

    while let Some((path, receipt)) = pending.pop_front() {
        all_ok &= report(&ingestor, &path, receipt).await;
    }
    ingestor.shutdown().await;

    if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn read_file(path: &Path) -> std::io::Result<(Vec<u8>, u64)> {
    let size = std::fs::metadata(path)?.len();
    let bytes = std::fs::read(path)?;
    Ok((bytes, size))
}

/// Print the result of one upload; true when it completed
async fn report(ingestor: &Ingestor, path: &Path, receipt: Receipt) -> bool {
    let id = receipt.track_file_id;
    if let Err(e) = receipt.finished().await {
        tracing::error!(track_file_id = %id, "{e}");
    }

    match ingestor.result(&id) {
        Ok(result) => {
            let line = json!({
                "file": path.display().to_string(),
                "track_file_id": result.track_file_id,
                "status": result.status,
                "name": result.name,
                "raw_point_count": result.raw_point_count,
                "simplified_point_count": result.simplified_point_count,
                "statistics": result.statistics,
                "error": result.error,
            });
            println!("{line}");
            result.status == ProcessingStatus::Completed
        }
        Err(e) => {
            report_error(path, &e.to_string());
            false
        }
    }
}

fn report_error(path: &Path, message: &str) {
    tracing::error!("{}: {message}", path.display());
    let line = json!({
        "file": path.display().to_string(),
        "status": "ERROR",
        "error": message,
    });
    println!("{line}");
}
