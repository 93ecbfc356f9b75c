use crate::{
    validate_domain, AppState, Effect, JobPhase, JobSnapshot, Msg, Notice, SalesBrief, ScanState,
    UploadState,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FiltersApplied(filters) => {
            let filters = filters.normalized();
            state.set_filters(filters.clone());
            vec![
                Effect::SaveFilters(filters),
                Effect::LoadLeads(state.begin_leads_load()),
            ]
        }
        Msg::PageRequested(page) => {
            state.set_page(page);
            vec![Effect::LoadLeads(state.begin_leads_load())]
        }
        Msg::PageSizeChanged(page_size) => {
            state.set_page_size(page_size);
            vec![Effect::LoadLeads(state.begin_leads_load())]
        }
        Msg::SortRequested(field) => {
            state.apply_sort(field);
            vec![Effect::LoadLeads(state.begin_leads_load())]
        }
        Msg::RefreshRequested => vec![Effect::LoadLeads(state.begin_leads_load())],
        Msg::LeadsLoaded(page) => {
            state.apply_leads(page);
            // Stats follow every successful list load.
            state.begin_dashboard_load();
            vec![Effect::LoadDashboard]
        }
        Msg::LeadsFailed(message) => {
            state.apply_leads_failure(message);
            Vec::new()
        }
        Msg::LeadsSuppressed => {
            state.apply_leads_suppressed();
            Vec::new()
        }
        Msg::DashboardLoaded(stats) => {
            state.apply_dashboard(Some(stats));
            Vec::new()
        }
        Msg::DashboardFailed(_) => {
            state.apply_dashboard(None);
            Vec::new()
        }
        Msg::CsvSubmitted { path, auto_detect } => submit_csv(&mut state, path, auto_detect),
        Msg::BatchAccepted { job_id } => {
            if matches!(state.upload(), UploadState::Submitting { .. }) {
                state.set_upload(tracking(job_id.clone()));
                vec![Effect::StartPolling { job_id }]
            } else {
                Vec::new()
            }
        }
        Msg::BatchProcessed { ingested, scanned } => {
            if matches!(state.upload(), UploadState::Submitting { .. }) {
                state.set_upload(UploadState::Done(sync_batch_notice(ingested, scanned)));
                state.schedule_refresh();
                vec![Effect::ScheduleRefresh]
            } else {
                Vec::new()
            }
        }
        Msg::BatchRejected { message } => {
            if matches!(state.upload(), UploadState::Submitting { .. }) {
                state.set_upload(UploadState::Done(Notice::error(format!("Error: {message}"))));
            }
            Vec::new()
        }
        Msg::TrackJob { job_id } => {
            let job_id = job_id.trim().to_string();
            if job_id.is_empty() {
                state.push_notice(Notice::error("A job id is required"));
                Vec::new()
            } else if state.upload().is_busy() {
                state.push_notice(Notice::info("Another batch is already being tracked"));
                Vec::new()
            } else {
                state.set_upload(tracking(job_id.clone()));
                vec![Effect::StartPolling { job_id }]
            }
        }
        Msg::JobProgress(snapshot) => {
            state.apply_snapshot(&snapshot, false);
            Vec::new()
        }
        Msg::JobFinished(snapshot) => {
            if state.apply_snapshot(&snapshot, true) {
                state.set_upload(UploadState::Done(terminal_notice(&snapshot)));
                state.schedule_refresh();
                vec![Effect::ScheduleRefresh]
            } else {
                Vec::new()
            }
        }
        Msg::JobPollFailed { job_id, message } => {
            state.record_poll_error(&job_id, message);
            Vec::new()
        }
        Msg::JobPollGaveUp { job_id, attempts } => {
            if state.is_tracking(&job_id) {
                state.set_upload(UploadState::Done(Notice::error(format!(
                    "Stopped waiting for job {job_id} after {attempts} polls; it may still be running"
                ))));
            }
            Vec::new()
        }
        Msg::ScanSubmitted {
            domain,
            company_name,
        } => submit_scan(&mut state, &domain, company_name),
        Msg::ScanCompleted(summary) => {
            if let ScanState::Scanning { domain } = state.scan() {
                let domain = domain.clone();
                state.set_scan(ScanState::AwaitingBreakdown {
                    domain: domain.clone(),
                    summary,
                });
                state.schedule_refresh();
                vec![Effect::AwaitBreakdown { domain }, Effect::ScheduleRefresh]
            } else {
                Vec::new()
            }
        }
        Msg::ScanFailed { domain, message } => {
            if matches!(state.scan(), ScanState::Scanning { domain: current } if *current == domain)
            {
                state.set_scan(ScanState::Done {
                    domain,
                    summary: None,
                    breakdown: None,
                    sales: None,
                    notice: Notice::error(format!("Error: {message}")),
                });
            }
            Vec::new()
        }
        Msg::BreakdownReady { domain, breakdown } => match state.scan() {
            ScanState::AwaitingBreakdown {
                domain: current,
                summary,
            } if *current == domain => {
                let summary = summary.clone();
                state.set_scan(ScanState::AwaitingSales {
                    domain: domain.clone(),
                    summary,
                    breakdown,
                });
                vec![Effect::LoadSalesSummary { domain }]
            }
            _ => Vec::new(),
        },
        Msg::BreakdownPending { domain } => {
            match state.scan() {
                ScanState::AwaitingBreakdown {
                    domain: current,
                    summary,
                } if *current == domain => {
                    let summary = summary.clone();
                    state.set_scan(ScanState::Done {
                        domain,
                        summary: Some(summary),
                        breakdown: None,
                        sales: None,
                        notice: Notice::caveat(
                            "Scan completed; the score breakdown is not ready yet, check back shortly",
                        ),
                    });
                }
                _ => {}
            }
            Vec::new()
        }
        Msg::SalesSummaryLoaded { domain, sales } => {
            finish_sales(&mut state, &domain, Some(sales), Notice::success("Scan completed"));
            Vec::new()
        }
        Msg::SalesSummaryFailed { domain, message } => {
            finish_sales(
                &mut state,
                &domain,
                None,
                Notice::caveat(format!(
                    "Scan completed; the sales summary is not available ({message})"
                )),
            );
            Vec::new()
        }
        Msg::ScanDismissed => match state.scan().clone() {
            ScanState::AwaitingBreakdown { domain, .. } => {
                state.set_scan(ScanState::Idle);
                vec![Effect::CancelBreakdown { domain }]
            }
            ScanState::Idle => Vec::new(),
            ScanState::Scanning { .. }
            | ScanState::AwaitingSales { .. }
            | ScanState::Done { .. } => {
                state.set_scan(ScanState::Idle);
                Vec::new()
            }
        },
        Msg::ExportRequested(kind) => {
            if state.begin_export() {
                vec![Effect::Export {
                    query: state.query().clone(),
                    kind,
                }]
            } else {
                Vec::new()
            }
        }
        Msg::ExportFinished { path } => {
            state.finish_export(Notice::success(format!("Exported to {path}")));
            Vec::new()
        }
        Msg::ExportFailed { message } => {
            state.finish_export(Notice::error(format!("Export failed: {message}")));
            Vec::new()
        }
        Msg::Interrupted => interrupt(&mut state),
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn tracking(job_id: String) -> UploadState {
    UploadState::Tracking {
        job_id,
        last_seq: 0,
        snapshot: None,
        poll_error: None,
    }
}

fn submit_csv(state: &mut AppState, path: Option<String>, auto_detect: bool) -> Vec<Effect> {
    if state.upload().is_busy() {
        state.push_notice(Notice::info("An upload is already in progress"));
        return Vec::new();
    }
    let Some(path) = path.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()) else {
        state.set_upload(UploadState::Done(Notice::error("Please select a file")));
        return Vec::new();
    };
    let file_name = path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(path.as_str())
        .to_string();
    state.set_upload(UploadState::Submitting { file_name });
    vec![Effect::SubmitBatch { path, auto_detect }]
}

fn submit_scan(state: &mut AppState, raw: &str, company_name: Option<String>) -> Vec<Effect> {
    if state.scan().is_busy() {
        state.push_notice(Notice::info("A scan is already in progress"));
        return Vec::new();
    }
    match validate_domain(raw) {
        Ok(domain) => {
            let company_name = company_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty());
            state.set_scan(ScanState::Scanning {
                domain: domain.clone(),
            });
            vec![Effect::ScanDomain {
                domain,
                company_name,
            }]
        }
        Err(err) => {
            state.set_scan(ScanState::Done {
                domain: raw.trim().to_string(),
                summary: None,
                breakdown: None,
                sales: None,
                notice: Notice::error(format!("Error: {err}")),
            });
            Vec::new()
        }
    }
}

fn finish_sales(state: &mut AppState, domain: &str, sales: Option<SalesBrief>, notice: Notice) {
    let ScanState::AwaitingSales {
        domain: current,
        summary,
        breakdown,
    } = state.scan()
    else {
        return;
    };
    if current != domain {
        return;
    }
    let done = ScanState::Done {
        domain: current.clone(),
        summary: Some(summary.clone()),
        breakdown: Some(breakdown.clone()),
        sales,
        notice,
    };
    state.set_scan(done);
}

/// Stops following whatever is still pending and cancels the matching work.
fn interrupt(state: &mut AppState) -> Vec<Effect> {
    state.mark_interrupted();
    let mut effects = Vec::new();
    if let UploadState::Tracking { job_id, .. } = state.upload().clone() {
        state.set_upload(UploadState::Done(Notice::caveat(format!(
            "Stopped following job {job_id}; it keeps running on the backend"
        ))));
        effects.push(Effect::CancelPolling { job_id });
    }
    match state.scan().clone() {
        ScanState::AwaitingBreakdown { domain, summary } => {
            state.set_scan(ScanState::Done {
                domain: domain.clone(),
                summary: Some(summary),
                breakdown: None,
                sales: None,
                notice: Notice::caveat("Scan completed; stopped waiting for the score breakdown"),
            });
            effects.push(Effect::CancelBreakdown { domain });
        }
        ScanState::AwaitingSales {
            domain,
            summary,
            breakdown,
        } => state.set_scan(ScanState::Done {
            domain,
            summary: Some(summary),
            breakdown: Some(breakdown),
            sales: None,
            notice: Notice::caveat("Scan completed; stopped waiting for the sales summary"),
        }),
        _ => {}
    }
    effects
}

/// Notice for the legacy synchronous upload response.
pub fn sync_batch_notice(ingested: u64, scanned: u64) -> Notice {
    if scanned > 0 {
        Notice::success(format!(
            "Success! {ingested} domains added, {scanned} scanned and added to the lead list"
        ))
    } else {
        Notice::caveat(format!(
            "Success! {ingested} domains added (not scanned yet, they will not appear in the lead list)"
        ))
    }
}

fn terminal_notice(snapshot: &JobSnapshot) -> Notice {
    match snapshot.phase {
        JobPhase::Completed => Notice::success(format!(
            "Success! {} domains scanned and added to the lead list",
            snapshot.successful
        )),
        _ => match snapshot.message.as_deref().filter(|m| !m.is_empty()) {
            Some(message) => Notice::error(format!("Error: batch job failed ({message})")),
            None => Notice::error("Error: batch job failed"),
        },
    }
}
