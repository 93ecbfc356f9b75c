use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::export::ExportError;
use crate::retry::Resolved;

/// Opaque backend identifier of a batch job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    /// The backend reports this state as `processing`.
    #[serde(alias = "processing")]
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Backend view of a batch job at one point in time (`GET /jobs/{job_id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    /// Filled from the request when the body omits it.
    #[serde(default)]
    pub job_id: JobId,
    pub status: JobStatus,
    pub processed: u64,
    pub successful: u64,
    pub failed: u64,
    pub remaining: u64,
    pub total: u64,
    pub progress_percent: f64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

/// Poll result stamped with its per-session sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct PollSnapshot {
    pub seq: u64,
    pub progress: JobProgress,
}

/// Result of `POST /ingest/csv`, decoded once at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Accepted for background processing; poll the job.
    Async { job_id: JobId },
    /// Processed inline by an older backend; already terminal.
    Sync { ingested: u64, scanned: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Lead {
    pub domain: String,
    #[serde(default)]
    pub canonical_name: Option<String>,
    #[serde(default)]
    pub readiness_score: Option<i64>,
    #[serde(default)]
    pub priority_score: Option<i64>,
    #[serde(default)]
    pub segment: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeadPage {
    pub leads: Vec<Lead>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_leads: u64,
    #[serde(default)]
    pub migration: u64,
    #[serde(default)]
    pub existing: u64,
    #[serde(default)]
    pub cold: u64,
    #[serde(default)]
    pub skip: u64,
    #[serde(default)]
    pub avg_score: f64,
    #[serde(default)]
    pub max_score: Option<i64>,
    #[serde(default)]
    pub high_priority: u64,
}

/// Response of `POST /scan/domain`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ScanResult {
    pub domain: String,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub segment: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub scan_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ProviderPoints {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub points: i64,
}

/// Response of `GET /leads/{domain}/score-breakdown`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ScoreBreakdown {
    pub base_score: i64,
    #[serde(default)]
    pub provider: ProviderPoints,
    #[serde(default)]
    pub signal_points: BTreeMap<String, i64>,
    #[serde(default)]
    pub risk_points: BTreeMap<String, i64>,
    pub total_score: i64,
    #[serde(default)]
    pub priority_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct OfferTier {
    pub tier: String,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub price_per_user_per_month: f64,
    #[serde(default)]
    pub migration_fee: Option<f64>,
    #[serde(default)]
    pub defender_price_per_user_per_month: Option<f64>,
    #[serde(default)]
    pub consulting_fee: Option<f64>,
    #[serde(default)]
    pub recommendation: String,
}

/// Response of `GET /leads/{domain}/sales-summary`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SalesSummary {
    pub domain: String,
    pub one_liner: String,
    #[serde(default)]
    pub call_script: Vec<String>,
    #[serde(default)]
    pub discovery_questions: Vec<String>,
    pub offer_tier: OfferTier,
    #[serde(default)]
    pub opportunity_potential: i64,
    #[serde(default)]
    pub urgency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Local precondition failure; nothing was sent.
    #[error("{0}")]
    Validation(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("HTTP {status}: {}", http_message(*status, detail.as_deref()))]
    Http { status: u16, detail: Option<String> },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    /// Text for the operator: backend detail verbatim when present.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http { status, detail } => http_message(*status, detail.as_deref()),
            other => other.to_string(),
        }
    }
}

fn http_message(status: u16, detail: Option<&str>) -> String {
    if let Some(detail) = detail {
        return detail.to_string();
    }
    let fallback = match status {
        400 => "Bad request",
        401 | 403 => "Not authorized",
        404 => "Not found",
        409 => "Conflict",
        413 => "File too large",
        415 => "Unsupported file format",
        422 => "Invalid input",
        429 => "Too many requests, try again shortly",
        500..=599 => "Server error",
        _ => "Unknown error",
    };
    fallback.to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// Every successful poll, including the terminal one.
    JobUpdated(PollSnapshot),
    /// Emitted once after the terminal update.
    JobFinished(PollSnapshot),
    PollFailed {
        job_id: JobId,
        error: ApiError,
    },
    PollGaveUp {
        job_id: JobId,
        attempts: u32,
    },
    /// A session for the job is already running.
    PollRejected {
        job_id: JobId,
    },
    LeadsLoaded(Result<LeadPage, ApiError>),
    DashboardLoaded(Result<DashboardStats, ApiError>),
    BatchSubmitted(Result<BatchOutcome, ApiError>),
    ScanFinished {
        domain: String,
        result: Result<ScanResult, ApiError>,
    },
    BreakdownResolved {
        domain: String,
        outcome: Resolved<ScoreBreakdown, ApiError>,
    },
    SalesSummaryLoaded {
        domain: String,
        result: Result<SalesSummary, ApiError>,
    },
    ExportFinished(Result<PathBuf, ExportError>),
    RefreshDue,
    /// The operator pressed Ctrl-C.
    Interrupted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processing_status_decodes_as_running() {
        let status: JobStatus = serde_json::from_str("\"processing\"").unwrap();
        assert_eq!(status, JobStatus::Running);
        assert!(!status.is_terminal());
        let status: JobStatus = serde_json::from_str("\"failed\"").unwrap();
        assert!(status.is_terminal());
    }

    #[test]
    fn job_progress_requires_counters() {
        let partial = r#"{"status":"running","processed":1}"#;
        assert!(serde_json::from_str::<JobProgress>(partial).is_err());
    }

    #[test]
    fn http_error_prefers_detail_then_status_fallback() {
        let with_detail = ApiError::Http {
            status: 400,
            detail: Some("CSV file is empty".to_string()),
        };
        assert_eq!(with_detail.user_message(), "CSV file is empty");
        assert_eq!(with_detail.to_string(), "HTTP 400: CSV file is empty");

        let bare = ApiError::Http {
            status: 418,
            detail: None,
        };
        assert_eq!(bare.user_message(), "Unknown error");
        assert_eq!(bare.status(), Some(418));
    }
}
