use crate::{
    BreakdownSummary, DashboardStats, ExportKind, JobSnapshot, LeadFilters, LeadPage,
    SalesBrief, ScanSummary, SortField,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Operator applied a new filter set.
    FiltersApplied(LeadFilters),
    /// Operator asked for another page of results.
    PageRequested(u32),
    /// Operator changed the number of rows per page.
    PageSizeChanged(u32),
    /// Operator clicked a column header.
    SortRequested(SortField),
    /// Reload the lead list with the current query.
    RefreshRequested,
    LeadsLoaded(LeadPage),
    LeadsFailed(String),
    /// The duplicate-request guard dropped a lead query.
    LeadsSuppressed,
    DashboardLoaded(DashboardStats),
    DashboardFailed(String),
    /// Operator submitted the upload form; `None` means no file was chosen.
    CsvSubmitted {
        path: Option<String>,
        auto_detect: bool,
    },
    /// Backend accepted the batch asynchronously.
    BatchAccepted { job_id: String },
    /// Backend processed the batch synchronously (legacy response).
    BatchProcessed { ingested: u64, scanned: u64 },
    BatchRejected { message: String },
    /// Follow an already running job.
    TrackJob { job_id: String },
    /// Poll result for the tracked job.
    JobProgress(JobSnapshot),
    /// Terminal poll result for the tracked job.
    JobFinished(JobSnapshot),
    JobPollFailed { job_id: String, message: String },
    JobPollGaveUp { job_id: String, attempts: u32 },
    ScanSubmitted {
        domain: String,
        company_name: Option<String>,
    },
    ScanCompleted(ScanSummary),
    ScanFailed { domain: String, message: String },
    BreakdownReady {
        domain: String,
        breakdown: BreakdownSummary,
    },
    /// Breakdown still unavailable after every retry.
    BreakdownPending { domain: String },
    SalesSummaryLoaded { domain: String, sales: SalesBrief },
    SalesSummaryFailed { domain: String, message: String },
    /// Operator closed the scan result before the breakdown arrived.
    ScanDismissed,
    ExportRequested(ExportKind),
    ExportFinished { path: String },
    ExportFailed { message: String },
    /// Operator asked to stop waiting (Ctrl-C); running backend work is left alone.
    Interrupted,
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
