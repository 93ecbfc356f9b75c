//! Hunter core: pure dashboard state machine and view-model helpers.
mod domain;
mod effect;
mod guard;
mod model;
mod msg;
mod query;
mod state;
mod update;
mod view_model;

pub use domain::{validate_domain, DomainError};
pub use effect::Effect;
pub use guard::{RequestGuard, DUPLICATE_REQUEST_WINDOW};
pub use model::{
    BreakdownSummary, DashboardStats, ExportKind, JobPhase, JobSnapshot, LeadPage, LeadRow,
    Notice, SalesBrief, ScanSummary, Severity,
};
pub use msg::Msg;
pub use query::{
    LeadFilters, LeadQuery, Sort, SortField, SortOrder, DEFAULT_PAGE_SIZE, MAX_MIN_SCORE,
    MAX_PAGE_SIZE,
};
pub use state::{AppState, ScanState, UploadState};
pub use update::{sync_batch_notice, update};
pub use view_model::AppViewModel;
