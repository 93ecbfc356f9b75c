use crate::view_model::AppViewModel;
use crate::{
    BreakdownSummary, DashboardStats, JobSnapshot, LeadFilters, LeadPage, LeadQuery, Notice,
    SalesBrief, ScanSummary, Sort, SortField, SortOrder, MAX_PAGE_SIZE,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Submitting {
        file_name: String,
    },
    Tracking {
        job_id: String,
        /// Sequence number of the newest snapshot applied so far.
        last_seq: u64,
        snapshot: Option<JobSnapshot>,
        poll_error: Option<String>,
    },
    Done(Notice),
}

impl UploadState {
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            UploadState::Submitting { .. } | UploadState::Tracking { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScanState {
    #[default]
    Idle,
    Scanning {
        domain: String,
    },
    AwaitingBreakdown {
        domain: String,
        summary: ScanSummary,
    },
    AwaitingSales {
        domain: String,
        summary: ScanSummary,
        breakdown: BreakdownSummary,
    },
    Done {
        domain: String,
        summary: Option<ScanSummary>,
        breakdown: Option<BreakdownSummary>,
        sales: Option<SalesBrief>,
        notice: Notice,
    },
}

impl ScanState {
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            ScanState::Scanning { .. }
                | ScanState::AwaitingBreakdown { .. }
                | ScanState::AwaitingSales { .. }
        )
    }
}

/// Application state owned by the front end's event loop.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    query: LeadQuery,
    page: Option<LeadPage>,
    leads_in_flight: u32,
    leads_error: Option<String>,
    dashboard: Option<DashboardStats>,
    dashboard_in_flight: bool,
    upload: UploadState,
    scan: ScanState,
    export_in_flight: bool,
    refresh_pending: bool,
    interrupted: bool,
    notices: Vec<Notice>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a restored query (e.g. persisted filters).
    pub fn with_query(query: LeadQuery) -> Self {
        Self {
            query,
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            query: self.query.clone(),
            page: self.page.clone(),
            leads_loading: self.leads_in_flight > 0,
            leads_error: self.leads_error.clone(),
            dashboard: self.dashboard.clone(),
            upload: self.upload.clone(),
            scan: self.scan.clone(),
            notices: self.notices.clone(),
            settled: self.is_settled(),
            dirty: self.dirty,
        }
    }

    pub fn query(&self) -> &LeadQuery {
        &self.query
    }

    pub fn upload(&self) -> &UploadState {
        &self.upload
    }

    pub fn scan(&self) -> &ScanState {
        &self.scan
    }

    /// True when nothing is in flight or scheduled.
    pub fn is_settled(&self) -> bool {
        self.leads_in_flight == 0
            && !self.dashboard_in_flight
            && !self.refresh_pending
            && !self.export_in_flight
            && !self.upload.is_busy()
            && !self.scan.is_busy()
    }

    /// Set once the operator stopped waiting; the front end should wind down.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
        self.mark_dirty();
    }

    pub(crate) fn set_filters(&mut self, filters: LeadFilters) {
        self.query.filters = filters;
        self.query.page = 1;
        self.mark_dirty();
    }

    /// Clamps against the last known page count.
    pub(crate) fn set_page(&mut self, page: u32) {
        let upper = self
            .page
            .as_ref()
            .map(|loaded| loaded.total_pages.max(1))
            .unwrap_or(u32::MAX);
        self.query.page = page.clamp(1, upper);
        self.mark_dirty();
    }

    pub(crate) fn set_page_size(&mut self, page_size: u32) {
        self.query.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self.query.page = 1;
        self.mark_dirty();
    }

    /// Same field flips the order; a new field starts ascending.
    pub(crate) fn apply_sort(&mut self, field: SortField) {
        let order = match self.query.sort {
            Some(current) if current.field == field => current.order.toggled(),
            _ => SortOrder::Asc,
        };
        self.query.sort = Some(Sort { field, order });
        self.query.page = 1;
        self.mark_dirty();
    }

    pub(crate) fn begin_leads_load(&mut self) -> LeadQuery {
        self.leads_in_flight += 1;
        self.refresh_pending = false;
        self.mark_dirty();
        self.query.clone()
    }

    fn finish_leads_load(&mut self) {
        self.leads_in_flight = self.leads_in_flight.saturating_sub(1);
        self.mark_dirty();
    }

    pub(crate) fn apply_leads(&mut self, page: LeadPage) {
        self.finish_leads_load();
        if page.page > 0 {
            self.query.page = page.page;
        }
        self.leads_error = None;
        self.page = Some(page);
    }

    pub(crate) fn apply_leads_failure(&mut self, message: String) {
        self.finish_leads_load();
        self.push_notice(Notice::error(format!("Failed to load leads: {message}")));
        self.leads_error = Some(message);
    }

    pub(crate) fn apply_leads_suppressed(&mut self) {
        self.finish_leads_load();
    }

    pub(crate) fn begin_dashboard_load(&mut self) {
        self.dashboard_in_flight = true;
    }

    pub(crate) fn apply_dashboard(&mut self, stats: Option<DashboardStats>) {
        self.dashboard_in_flight = false;
        if let Some(stats) = stats {
            self.dashboard = Some(stats);
        }
        self.mark_dirty();
    }

    pub(crate) fn schedule_refresh(&mut self) {
        self.refresh_pending = true;
    }

    pub(crate) fn mark_interrupted(&mut self) {
        self.interrupted = true;
        self.refresh_pending = false;
        self.mark_dirty();
    }

    pub(crate) fn set_upload(&mut self, upload: UploadState) {
        if let UploadState::Done(notice) = &upload {
            self.notices.push(notice.clone());
        }
        self.upload = upload;
        self.mark_dirty();
    }

    /// Applies a poll snapshot for the tracked job unless it is stale.
    ///
    /// Terminal snapshots carry the same sequence number as the update that
    /// preceded them, so `allow_equal` admits them.
    pub(crate) fn apply_snapshot(&mut self, snapshot: &JobSnapshot, allow_equal: bool) -> bool {
        let UploadState::Tracking {
            job_id,
            last_seq,
            snapshot: current,
            poll_error,
        } = &mut self.upload
        else {
            return false;
        };
        if *job_id != snapshot.job_id {
            return false;
        }
        let fresh = snapshot.seq > *last_seq || (allow_equal && snapshot.seq == *last_seq);
        if !fresh {
            return false;
        }
        *last_seq = snapshot.seq;
        *current = Some(snapshot.clone());
        *poll_error = None;
        self.mark_dirty();
        true
    }

    pub(crate) fn record_poll_error(&mut self, failed_job: &str, message: String) {
        if let UploadState::Tracking {
            job_id, poll_error, ..
        } = &mut self.upload
        {
            if job_id == failed_job {
                *poll_error = Some(message);
                self.dirty = true;
            }
        }
    }

    pub(crate) fn is_tracking(&self, candidate: &str) -> bool {
        matches!(&self.upload, UploadState::Tracking { job_id, .. } if job_id == candidate)
    }

    pub(crate) fn set_scan(&mut self, scan: ScanState) {
        if let ScanState::Done { notice, .. } = &scan {
            self.notices.push(notice.clone());
        }
        self.scan = scan;
        self.mark_dirty();
    }

    pub(crate) fn begin_export(&mut self) -> bool {
        if self.export_in_flight {
            return false;
        }
        self.export_in_flight = true;
        self.mark_dirty();
        true
    }

    pub(crate) fn finish_export(&mut self, notice: Notice) {
        self.export_in_flight = false;
        self.push_notice(notice);
    }
}
