use crate::{DashboardStats, LeadPage, LeadQuery, Notice, ScanState, UploadState};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub query: LeadQuery,
    pub page: Option<LeadPage>,
    pub leads_loading: bool,
    pub leads_error: Option<String>,
    pub dashboard: Option<DashboardStats>,
    pub upload: UploadState,
    pub scan: ScanState,
    /// Every notice raised so far, oldest first.
    pub notices: Vec<Notice>,
    pub settled: bool,
    pub dirty: bool,
}
