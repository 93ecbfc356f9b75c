use crate::{ExportKind, LeadFilters, LeadQuery};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    LoadLeads(LeadQuery),
    LoadDashboard,
    SaveFilters(LeadFilters),
    SubmitBatch { path: String, auto_detect: bool },
    StartPolling { job_id: String },
    CancelPolling { job_id: String },
    ScanDomain {
        domain: String,
        company_name: Option<String>,
    },
    AwaitBreakdown { domain: String },
    CancelBreakdown { domain: String },
    LoadSalesSummary { domain: String },
    /// Reload the lead list after the configured refresh delay.
    ScheduleRefresh,
    Export { query: LeadQuery, kind: ExportKind },
}
