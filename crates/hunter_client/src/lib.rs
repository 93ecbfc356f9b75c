//! Hunter client: backend HTTP access, job polling and retry primitives.
mod client;
mod export;
mod handle;
mod persist;
mod poll;
mod retry;
mod submit;
mod types;

pub use client::{BackendClient, ClientSettings, JobSource, DEFAULT_BASE_URL};
pub use export::{file_name_from_disposition, save_export, ExportError, ExportFormat, ExportPayload};
pub use handle::{MonitorHandle, MonitorSettings, MonitorStopped};
pub use persist::{ensure_output_dir, AtomicFileWriter, OutputKind, PersistError};
pub use poll::{
    ChannelProgressSink, PollEnd, PollError, PollSession, PollSettings, Poller, ProgressSink,
};
pub use retry::{await_availability, Resolved, RetrySchedule};
pub use submit::{BatchOptions, CsvUpload};
pub use types::{
    ApiError, BatchOutcome, DashboardStats, JobId, JobProgress, JobStatus, Lead, LeadPage,
    MonitorEvent, OfferTier, PollSnapshot, ProviderPoints, SalesSummary, ScanResult,
    ScoreBreakdown,
};
