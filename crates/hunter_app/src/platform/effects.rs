use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use hunter_client::{
    ApiError, BatchOptions, BatchOutcome, CsvUpload, ExportError, ExportFormat, JobId,
    JobStatus, MonitorEvent, MonitorHandle, MonitorStopped, PollSnapshot, Resolved,
    SalesSummary,
};
use hunter_core::{
    BreakdownSummary, DashboardStats, Effect, ExportKind, JobPhase, JobSnapshot, LeadPage,
    LeadRow, Msg, RequestGuard, SalesBrief, ScanSummary,
};
use hunter_logging::{hunter_debug, hunter_info, hunter_warn};

use super::config::AppConfig;
use super::persistence;

/// Executes core effects against the backend monitor.
pub struct EffectRunner {
    monitor: MonitorHandle,
    guard: RequestGuard,
    refresh_delay: Duration,
    export_dir: PathBuf,
    state_dir: PathBuf,
}

impl EffectRunner {
    pub fn new(config: &AppConfig, working_dir: PathBuf) -> Result<Self, ApiError> {
        let monitor = MonitorHandle::new(config.monitor_settings())?;
        Ok(Self {
            monitor,
            guard: RequestGuard::new(config.duplicate_window()),
            refresh_delay: config.refresh_delay(),
            export_dir: config.export_dir(&working_dir),
            state_dir: working_dir,
        })
    }

    /// Dispatches effects; returns messages that resolve without I/O.
    pub fn enqueue(&mut self, effects: Vec<Effect>) -> Vec<Msg> {
        let mut immediate = Vec::new();
        for effect in effects {
            hunter_debug!("Effect {:?}", effect);
            match effect {
                Effect::LoadLeads(query) => {
                    if self.guard.admit(&query, Instant::now()) {
                        self.monitor.load_leads(query.query_pairs());
                    } else {
                        hunter_info!("Suppressed duplicate lead query for page {}", query.page);
                        immediate.push(Msg::LeadsSuppressed);
                    }
                }
                Effect::LoadDashboard => self.monitor.load_dashboard(),
                Effect::SaveFilters(filters) => persistence::save_filters(&self.state_dir, &filters),
                Effect::SubmitBatch { path, auto_detect } => {
                    match CsvUpload::from_path(Path::new(&path)) {
                        Ok(upload) => {
                            hunter_info!(
                                "Submitting {} ({} bytes)",
                                upload.file_name(),
                                upload.len()
                            );
                            self.monitor.submit_batch(
                                upload,
                                BatchOptions {
                                    auto_detect_columns: auto_detect,
                                },
                            );
                        }
                        Err(err) => immediate.push(Msg::BatchRejected {
                            message: err.user_message(),
                        }),
                    }
                }
                Effect::StartPolling { job_id } => self.monitor.start_polling(JobId::new(job_id)),
                Effect::CancelPolling { job_id } => {
                    self.monitor.cancel_polling(JobId::new(job_id))
                }
                Effect::ScanDomain {
                    domain,
                    company_name,
                } => self.monitor.scan_domain(domain, company_name),
                Effect::AwaitBreakdown { domain } => self.monitor.await_breakdown(domain),
                Effect::CancelBreakdown { domain } => self.monitor.cancel_breakdown(domain),
                Effect::LoadSalesSummary { domain } => self.monitor.load_sales_summary(domain),
                Effect::ScheduleRefresh => self.monitor.refresh_after(self.refresh_delay),
                Effect::Export { query, kind } => self.monitor.export(
                    query.export_pairs(),
                    export_format(kind),
                    self.export_dir.clone(),
                ),
            }
        }
        immediate
    }

    /// Ctrl-C arrives as `Msg::Interrupted` from now on.
    pub fn forward_interrupts(&self) {
        self.monitor.forward_interrupts();
    }

    /// Waits up to `timeout` for the next backend event.
    pub fn next_msg(&self, timeout: Duration) -> Result<Option<Msg>, MonitorStopped> {
        Ok(self.monitor.recv_timeout(timeout)?.map(map_event))
    }
}

fn export_format(kind: ExportKind) -> ExportFormat {
    match kind {
        ExportKind::Csv => ExportFormat::Csv,
        ExportKind::Excel => ExportFormat::Xlsx,
    }
}

pub(crate) fn map_event(event: MonitorEvent) -> Msg {
    match event {
        MonitorEvent::JobUpdated(snapshot) => Msg::JobProgress(map_snapshot(snapshot)),
        MonitorEvent::JobFinished(snapshot) => Msg::JobFinished(map_snapshot(snapshot)),
        MonitorEvent::PollFailed { job_id, error } => Msg::JobPollFailed {
            job_id: job_id.to_string(),
            message: error.user_message(),
        },
        MonitorEvent::PollGaveUp { job_id, attempts } => Msg::JobPollGaveUp {
            job_id: job_id.to_string(),
            attempts,
        },
        MonitorEvent::PollRejected { job_id } => {
            hunter_warn!("Job {} is already being polled", job_id);
            Msg::NoOp
        }
        MonitorEvent::LeadsLoaded(Ok(page)) => Msg::LeadsLoaded(map_page(page)),
        MonitorEvent::LeadsLoaded(Err(err)) => Msg::LeadsFailed(err.user_message()),
        MonitorEvent::DashboardLoaded(Ok(stats)) => Msg::DashboardLoaded(DashboardStats {
            total_leads: stats.total_leads,
            migration: stats.migration,
            existing: stats.existing,
            cold: stats.cold,
            skip: stats.skip,
            avg_score: stats.avg_score,
            max_score: stats.max_score,
            high_priority: stats.high_priority,
        }),
        MonitorEvent::DashboardLoaded(Err(err)) => {
            hunter_warn!("Dashboard stats unavailable: {}", err);
            Msg::DashboardFailed(err.user_message())
        }
        MonitorEvent::BatchSubmitted(Ok(BatchOutcome::Async { job_id })) => Msg::BatchAccepted {
            job_id: job_id.to_string(),
        },
        MonitorEvent::BatchSubmitted(Ok(BatchOutcome::Sync { ingested, scanned })) => {
            Msg::BatchProcessed { ingested, scanned }
        }
        MonitorEvent::BatchSubmitted(Err(err)) => Msg::BatchRejected {
            message: err.user_message(),
        },
        MonitorEvent::ScanFinished {
            domain,
            result: Ok(scan),
        } => Msg::ScanCompleted(ScanSummary {
            domain: if scan.domain.is_empty() {
                domain
            } else {
                scan.domain
            },
            score: scan.score,
            segment: scan.segment,
            provider: scan.provider,
        }),
        MonitorEvent::ScanFinished {
            domain,
            result: Err(err),
        } => Msg::ScanFailed {
            domain,
            message: err.user_message(),
        },
        MonitorEvent::BreakdownResolved { domain, outcome } => match outcome {
            Resolved::Ready(breakdown) => Msg::BreakdownReady {
                domain,
                breakdown: BreakdownSummary {
                    base_score: breakdown.base_score,
                    total_score: breakdown.total_score,
                    provider: breakdown.provider.name,
                    provider_points: breakdown.provider.points,
                    signal_points: breakdown.signal_points.into_iter().collect(),
                    risk_points: breakdown.risk_points.into_iter().collect(),
                },
            },
            Resolved::Exhausted { .. } => Msg::BreakdownPending { domain },
            Resolved::Cancelled => Msg::NoOp,
        },
        MonitorEvent::SalesSummaryLoaded {
            domain,
            result: Ok(sales),
        } => Msg::SalesSummaryLoaded {
            domain,
            sales: map_sales(sales),
        },
        MonitorEvent::SalesSummaryLoaded {
            domain,
            result: Err(err),
        } => Msg::SalesSummaryFailed {
            domain,
            message: err.user_message(),
        },
        MonitorEvent::ExportFinished(Ok(path)) => Msg::ExportFinished {
            path: path.display().to_string(),
        },
        MonitorEvent::ExportFinished(Err(err)) => Msg::ExportFailed {
            message: match err {
                ExportError::Api(api) => api.user_message(),
                other => other.to_string(),
            },
        },
        MonitorEvent::RefreshDue => Msg::RefreshRequested,
        MonitorEvent::Interrupted => Msg::Interrupted,
    }
}

fn map_sales(sales: SalesSummary) -> SalesBrief {
    SalesBrief {
        one_liner: sales.one_liner,
        call_script: sales.call_script,
        discovery_questions: sales.discovery_questions,
        offer_tier: sales.offer_tier.tier,
        price_per_user_per_month: sales.offer_tier.price_per_user_per_month,
        offer_recommendation: sales.offer_tier.recommendation,
        opportunity_potential: sales.opportunity_potential.clamp(0, 100),
        urgency: sales.urgency,
    }
}

fn map_snapshot(snapshot: PollSnapshot) -> JobSnapshot {
    let progress = snapshot.progress;
    JobSnapshot {
        job_id: progress.job_id.to_string(),
        seq: snapshot.seq,
        phase: match progress.status {
            JobStatus::Pending => JobPhase::Pending,
            JobStatus::Running => JobPhase::Running,
            JobStatus::Completed => JobPhase::Completed,
            JobStatus::Failed => JobPhase::Failed,
        },
        processed: progress.processed,
        successful: progress.successful,
        failed: progress.failed,
        remaining: progress.remaining,
        total: progress.total,
        percent: progress.progress_percent,
        message: progress.message,
    }
}

fn map_page(page: hunter_client::LeadPage) -> LeadPage {
    LeadPage {
        rows: page
            .leads
            .into_iter()
            .map(|lead| LeadRow {
                domain: lead.domain,
                company: lead.canonical_name,
                readiness_score: lead.readiness_score,
                priority_score: lead.priority_score,
                segment: lead.segment,
                provider: lead.provider,
            })
            .collect(),
        total: page.total,
        page: page.page,
        page_size: page.page_size,
        total_pages: page.total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use hunter_client::{JobProgress, ProviderPoints, ScanResult, ScoreBreakdown};
    use hunter_core::LeadQuery;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn next_backend_msg(runner: &EffectRunner) -> Msg {
        for _ in 0..200 {
            if let Some(msg) = runner.next_msg(Duration::ZERO).unwrap() {
                return msg;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no backend event arrived");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn identical_lead_queries_reach_the_backend_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/leads"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "leads": [{"domain": "acme.com", "readiness_score": 70}],
                "total": 1,
                "page": 1,
                "page_size": 50,
                "total_pages": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let config = AppConfig {
            api_base_url: server.uri(),
            ..AppConfig::default()
        };
        let mut runner = EffectRunner::new(&config, temp.path().to_path_buf()).unwrap();
        let query = LeadQuery::default();

        assert!(runner
            .enqueue(vec![Effect::LoadLeads(query.clone())])
            .is_empty());
        assert_eq!(
            runner.enqueue(vec![Effect::LoadLeads(query)]),
            vec![Msg::LeadsSuppressed]
        );

        let msg = next_backend_msg(&runner).await;
        assert!(matches!(&msg, Msg::LeadsLoaded(page) if page.rows.len() == 1));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(runner.next_msg(Duration::ZERO).unwrap(), None);
        server.verify().await;
    }

    fn progress(status: JobStatus) -> JobProgress {
        JobProgress {
            job_id: JobId::new("job-42"),
            status,
            processed: 5,
            successful: 4,
            failed: 1,
            remaining: 5,
            total: 10,
            progress_percent: 50.0,
            message: Some("halfway".to_string()),
            errors: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn poll_snapshots_keep_sequence_and_counts() {
        let msg = map_event(MonitorEvent::JobUpdated(PollSnapshot {
            seq: 3,
            progress: progress(JobStatus::Running),
        }));
        assert_eq!(
            msg,
            Msg::JobProgress(JobSnapshot {
                job_id: "job-42".to_string(),
                seq: 3,
                phase: JobPhase::Running,
                processed: 5,
                successful: 4,
                failed: 1,
                remaining: 5,
                total: 10,
                percent: 50.0,
                message: Some("halfway".to_string()),
            })
        );
    }

    #[test]
    fn terminal_snapshot_maps_to_job_finished() {
        let msg = map_event(MonitorEvent::JobFinished(PollSnapshot {
            seq: 4,
            progress: progress(JobStatus::Failed),
        }));
        assert!(matches!(msg, Msg::JobFinished(s) if s.phase == JobPhase::Failed && s.seq == 4));
    }

    #[test]
    fn batch_outcomes_map_to_their_messages() {
        assert_eq!(
            map_event(MonitorEvent::BatchSubmitted(Ok(BatchOutcome::Async {
                job_id: JobId::new("abc")
            }))),
            Msg::BatchAccepted {
                job_id: "abc".to_string()
            }
        );
        assert_eq!(
            map_event(MonitorEvent::BatchSubmitted(Ok(BatchOutcome::Sync {
                ingested: 3,
                scanned: 0
            }))),
            Msg::BatchProcessed {
                ingested: 3,
                scanned: 0
            }
        );
        assert_eq!(
            map_event(MonitorEvent::BatchSubmitted(Err(ApiError::Http {
                status: 413,
                detail: None
            }))),
            Msg::BatchRejected {
                message: "File too large".to_string()
            }
        );
    }

    #[test]
    fn poll_failure_carries_operator_message() {
        let msg = map_event(MonitorEvent::PollFailed {
            job_id: JobId::new("job-1"),
            error: ApiError::Http {
                status: 404,
                detail: Some("Job not found".to_string()),
            },
        });
        assert_eq!(
            msg,
            Msg::JobPollFailed {
                job_id: "job-1".to_string(),
                message: "Job not found".to_string()
            }
        );
    }

    #[test]
    fn breakdown_outcomes_map_to_ready_pending_or_nothing() {
        let breakdown = ScoreBreakdown {
            base_score: 10,
            provider: ProviderPoints {
                name: Some("google".to_string()),
                points: 20,
            },
            signal_points: BTreeMap::from([("spf".to_string(), 5), ("dmarc".to_string(), 7)]),
            risk_points: BTreeMap::new(),
            total_score: 42,
            priority_label: None,
        };
        let ready = map_event(MonitorEvent::BreakdownResolved {
            domain: "acme.com".to_string(),
            outcome: Resolved::Ready(breakdown),
        });
        let Msg::BreakdownReady { breakdown, .. } = ready else {
            panic!("expected ready, got {ready:?}");
        };
        assert_eq!(breakdown.provider.as_deref(), Some("google"));
        assert_eq!(
            breakdown.signal_points,
            vec![("dmarc".to_string(), 7), ("spf".to_string(), 5)]
        );

        assert_eq!(
            map_event(MonitorEvent::BreakdownResolved {
                domain: "acme.com".to_string(),
                outcome: Resolved::Exhausted {
                    attempts: 5,
                    last_error: None
                },
            }),
            Msg::BreakdownPending {
                domain: "acme.com".to_string()
            }
        );
        assert_eq!(
            map_event(MonitorEvent::BreakdownResolved {
                domain: "acme.com".to_string(),
                outcome: Resolved::Cancelled,
            }),
            Msg::NoOp
        );
    }

    #[test]
    fn scan_result_without_domain_keeps_requested_domain() {
        let msg = map_event(MonitorEvent::ScanFinished {
            domain: "acme.com".to_string(),
            result: Ok(ScanResult {
                score: Some(71),
                ..ScanResult::default()
            }),
        });
        assert!(matches!(msg, Msg::ScanCompleted(s) if s.domain == "acme.com" && s.score == Some(71)));
    }

    #[test]
    fn lead_page_rows_use_canonical_name_as_company() {
        let msg = map_event(MonitorEvent::LeadsLoaded(Ok(hunter_client::LeadPage {
            leads: vec![hunter_client::Lead {
                domain: "acme.com".to_string(),
                canonical_name: Some("Acme".to_string()),
                readiness_score: Some(80),
                ..hunter_client::Lead::default()
            }],
            total: 1,
            page: 1,
            page_size: 50,
            total_pages: 1,
        })));
        let Msg::LeadsLoaded(page) = msg else {
            panic!("expected leads");
        };
        assert_eq!(page.rows[0].company.as_deref(), Some("Acme"));
        assert_eq!(page.rows[0].readiness_score, Some(80));
    }

    #[test]
    fn refresh_due_requests_a_reload() {
        assert_eq!(map_event(MonitorEvent::RefreshDue), Msg::RefreshRequested);
    }

    #[test]
    fn ctrl_c_maps_to_interrupted() {
        assert_eq!(map_event(MonitorEvent::Interrupted), Msg::Interrupted);
    }

    #[test]
    fn sales_summary_flattens_offer_tier() {
        let msg = map_event(MonitorEvent::SalesSummaryLoaded {
            domain: "acme.com".to_string(),
            result: Ok(SalesSummary {
                domain: "acme.com".to_string(),
                one_liner: "Ready to move to M365".to_string(),
                call_script: vec!["Open with the migration offer".to_string()],
                offer_tier: hunter_client::OfferTier {
                    tier: "Enterprise".to_string(),
                    price_per_user_per_month: 20.6,
                    recommendation: "Large tenant".to_string(),
                    ..hunter_client::OfferTier::default()
                },
                opportunity_potential: 140,
                urgency: "high".to_string(),
                ..SalesSummary::default()
            }),
        });
        let Msg::SalesSummaryLoaded { domain, sales } = msg else {
            panic!("expected sales summary, got {msg:?}");
        };
        assert_eq!(domain, "acme.com");
        assert_eq!(sales.offer_tier, "Enterprise");
        assert_eq!(sales.offer_recommendation, "Large tenant");
        assert_eq!(sales.opportunity_potential, 100);
        assert_eq!(sales.call_script.len(), 1);

        let failed = map_event(MonitorEvent::SalesSummaryLoaded {
            domain: "acme.com".to_string(),
            result: Err(ApiError::Http {
                status: 404,
                detail: Some("Domain not found: acme.com".to_string()),
            }),
        });
        assert_eq!(
            failed,
            Msg::SalesSummaryFailed {
                domain: "acme.com".to_string(),
                message: "Domain not found: acme.com".to_string()
            }
        );
    }
}
