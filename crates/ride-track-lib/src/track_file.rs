//! The persisted record of one uploaded track and its status lifecycle
//!
//! `PENDING -> PROCESSING -> {COMPLETED | FAILED}`. Transitions are methods on
//! [`TrackFile`] that reject illegal moves; terminal records never change again.

use crate::{IngestError, PipelineOutput, Result, RouteStatistics, SimplifiedTrack};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique id of a [`TrackFile`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackFileId(Uuid);

impl TrackFileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackFileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackFileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TrackFileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Opaque reference to the owning trip; its meaning lives outside this crate
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(String);

impl From<&str> for TripId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TripId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    /// COMPLETED and FAILED records are immutable
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessingStatus::Completed | ProcessingStatus::Failed)
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProcessingStatus::Pending => "PENDING",
            ProcessingStatus::Processing => "PROCESSING",
            ProcessingStatus::Completed => "COMPLETED",
            ProcessingStatus::Failed => "FAILED",
        })
    }
}

/// Coarse failure classification exposed to callers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidFormat,
    InternalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::InvalidFormat => "INVALID_FORMAT",
            ErrorKind::InternalError => "INTERNAL_ERROR",
        })
    }
}

/// Failure recorded on a FAILED [`TrackFile`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

pub(crate) const INTERNAL_ERROR_MESSAGE: &str = "Internal error while processing the track";

impl ErrorInfo {
    /// Format errors keep their message; anything else gets a generic one
    pub fn from_error(err: &IngestError) -> Self {
        let kind = err.classify();
        let message = match kind {
            ErrorKind::InvalidFormat => err.to_string(),
            ErrorKind::InternalError => INTERNAL_ERROR_MESSAGE.to_string(),
        };
        Self { kind, message }
    }
}

/// WGS84 bounding box of a track
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackBounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl TrackBounds {
    /// `None` for an empty slice
    pub fn from_points(points: &[crate::Trackpoint]) -> Option<Self> {
        let first = points.first()?;
        let seed = Self {
            min_lat: first.latitude,
            min_lon: first.longitude,
            max_lat: first.latitude,
            max_lon: first.longitude,
        };
        Some(points.iter().skip(1).fold(seed, |b, p| Self {
            min_lat: b.min_lat.min(p.latitude),
            min_lon: b.min_lon.min(p.longitude),
            max_lat: b.max_lat.max(p.latitude),
            max_lon: b.max_lon.max(p.longitude),
        }))
    }
}

/// One uploaded GPS track
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackFile {
    pub id: TrackFileId,
    pub trip_id: TripId,
    pub status: ProcessingStatus,
    pub file_size_bytes: u64,
    pub name: Option<String>,
    pub raw_point_count: usize,
    pub simplified_point_count: usize,
    pub simplified_track: Option<SimplifiedTrack>,
    pub statistics: Option<RouteStatistics>,
    pub bounds: Option<TrackBounds>,
    pub error: Option<ErrorInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackFile {
    /// A fresh PENDING record
    pub fn new(trip_id: TripId, file_size_bytes: u64) -> Self {
        let now = Utc::now();
        Self {
            id: TrackFileId::new(),
            trip_id,
            status: ProcessingStatus::Pending,
            file_size_bytes,
            name: None,
            raw_point_count: 0,
            simplified_point_count: 0,
            simplified_track: None,
            statistics: None,
            bounds: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn start_processing(&mut self) -> Result<()> {
        self.transition(ProcessingStatus::Processing)
    }

    /// Attach the pipeline result and mark the record COMPLETED
    pub fn complete(&mut self, output: PipelineOutput) -> Result<()> {
        self.transition(ProcessingStatus::Completed)?;
        self.name = output.name;
        self.raw_point_count = output.raw_point_count;
        self.simplified_point_count = output.simplified.len();
        self.simplified_track = Some(output.simplified);
        self.statistics = output.statistics;
        self.bounds = output.bounds;
        Ok(())
    }

    pub fn fail(&mut self, error: ErrorInfo) -> Result<()> {
        self.transition(ProcessingStatus::Failed)?;
        self.error = Some(error);
        Ok(())
    }

    fn transition(&mut self, to: ProcessingStatus) -> Result<()> {
        let allowed = matches!(
            (self.status, to),
            (ProcessingStatus::Pending, ProcessingStatus::Processing)
                | (ProcessingStatus::Processing, ProcessingStatus::Completed)
                | (ProcessingStatus::Processing, ProcessingStatus::Failed)
        );
        if !allowed {
            return Err(IngestError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simplify::simplify;
    use crate::testing::straight_track;

    fn output() -> PipelineOutput {
        let points = straight_track(5, 100.0, Some(30), |_| Some(10.0));
        PipelineOutput {
            name: Some("Morning ride".to_string()),
            raw_point_count: points.len(),
            simplified: simplify(&points, 5.0),
            statistics: None,
            bounds: TrackBounds::from_points(&points),
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut file = TrackFile::new("trip-1".into(), 2_048);
        assert_eq!(file.status, ProcessingStatus::Pending);

        file.start_processing().unwrap();
        assert_eq!(file.status, ProcessingStatus::Processing);

        file.complete(output()).unwrap();
        assert_eq!(file.status, ProcessingStatus::Completed);
        assert_eq!(file.raw_point_count, 5);
        assert_eq!(file.simplified_point_count, 2);
        assert!(file.simplified_point_count <= file.raw_point_count);
        assert_eq!(file.name.as_deref(), Some("Morning ride"));
        assert!(file.updated_at >= file.created_at);
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let mut file = TrackFile::new("trip-1".into(), 10);
        // Skipping PROCESSING
        assert!(matches!(
            file.complete(output()),
            Err(IngestError::InvalidTransition {
                from: ProcessingStatus::Pending,
                to: ProcessingStatus::Completed,
            })
        ));

        file.start_processing().unwrap();
        assert!(file.start_processing().is_err());
        file.fail(ErrorInfo::from_error(&IngestError::InvalidTrackFormat("empty".into())))
            .unwrap();

        // Terminal records are immutable
        let snapshot = file.clone();
        assert!(file.complete(output()).is_err());
        assert!(file.start_processing().is_err());
        assert!(
            file.fail(ErrorInfo {
                kind: ErrorKind::InternalError,
                message: "again".into(),
            })
            .is_err()
        );
        assert_eq!(file, snapshot);
    }

    #[test]
    fn test_error_info_hides_internal_details() {
        let invalid = ErrorInfo::from_error(&IngestError::InvalidTrackFormat("no points".into()));
        assert_eq!(invalid.kind, ErrorKind::InvalidFormat);
        assert!(invalid.message.contains("no points"));

        let internal = ErrorInfo::from_error(&IngestError::Internal {
            stage: crate::Stage::Simplify,
            message: "index 7 out of bounds".into(),
        });
        assert_eq!(internal.kind, ErrorKind::InternalError);
        assert_eq!(internal.message, INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn test_serialized_status_names() {
        assert_eq!(
            serde_json::to_string(&ProcessingStatus::Processing).unwrap(),
            "\"PROCESSING\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorKind::InvalidFormat).unwrap(),
            "\"INVALID_FORMAT\""
        );
        assert_eq!(ErrorKind::InternalError.to_string(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_bounds() {
        let points = straight_track(3, 1_000.0, None, |_| None);
        let bounds = TrackBounds::from_points(&points).unwrap();
        assert_eq!(bounds.min_lat, points[0].latitude);
        assert_eq!(bounds.max_lat, points[2].latitude);
        assert_eq!(bounds.min_lon, bounds.max_lon);
        assert!(TrackBounds::from_points(&[]).is_none());
    }

    #[test]
    fn test_id_round_trip_through_string() {
        let id = TrackFileId::new();
        let parsed: TrackFileId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<TrackFileId>().is_err());
    }
}
