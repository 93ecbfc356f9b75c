use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hunter_logging::{hunter_debug, hunter_error, hunter_info, hunter_warn};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::{BackendClient, ClientSettings, JobSource};
use crate::export::{save_export, ExportError, ExportFormat};
use crate::poll::{ChannelProgressSink, PollSession, PollSettings, Poller, ProgressSink};
use crate::retry::{await_availability, RetrySchedule};
use crate::submit::{BatchOptions, CsvUpload};
use crate::{ApiError, JobId, MonitorEvent, PollError};

#[derive(Debug, Clone, Default)]
pub struct MonitorSettings {
    pub client: ClientSettings,
    pub poll: PollSettings,
    pub retry: RetrySchedule,
}

enum MonitorCommand {
    LoadLeads {
        params: Vec<(String, String)>,
    },
    LoadDashboard,
    SubmitBatch {
        upload: CsvUpload,
        options: BatchOptions,
    },
    StartPolling {
        job_id: JobId,
    },
    CancelPolling {
        job_id: JobId,
    },
    ScanDomain {
        domain: String,
        company_name: Option<String>,
    },
    AwaitBreakdown {
        domain: String,
    },
    CancelBreakdown {
        domain: String,
    },
    LoadSalesSummary {
        domain: String,
    },
    ForwardInterrupts,
    Export {
        params: Vec<(String, String)>,
        format: ExportFormat,
        dir: PathBuf,
    },
    RefreshAfter {
        delay: Duration,
    },
}

/// Bridges a synchronous front end to the async backend client.
///
/// Commands run on a tokio runtime owned by a background thread; results come
/// back as [`MonitorEvent`]s.
pub struct MonitorHandle {
    cmd_tx: mpsc::Sender<MonitorCommand>,
    event_rx: mpsc::Receiver<MonitorEvent>,
}

impl MonitorHandle {
    pub fn new(settings: MonitorSettings) -> Result<Self, ApiError> {
        let client = Arc::new(BackendClient::new(settings.client)?);
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let poll = settings.poll;
        let retry = settings.retry;

        thread::spawn(move || {
            let runtime = match Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    hunter_error!("Failed to start tokio runtime: {}", err);
                    return;
                }
            };
            let source: Arc<dyn JobSource> = client.clone();
            let mut dispatcher = Dispatcher {
                client,
                poller: Poller::new(source, poll),
                retry,
                sink: Arc::new(ChannelProgressSink::new(event_tx)),
                sessions: HashMap::new(),
                breakdowns: HashMap::new(),
                forwarding_interrupts: false,
            };
            while let Ok(command) = cmd_rx.recv() {
                dispatcher.handle(&runtime, command);
            }
            hunter_debug!("Monitor command channel closed");
        });

        Ok(Self { cmd_tx, event_rx })
    }

    fn send(&self, command: MonitorCommand) {
        if self.cmd_tx.send(command).is_err() {
            hunter_warn!("Monitor runtime is gone; command dropped");
        }
    }

    pub fn load_leads(&self, params: Vec<(String, String)>) {
        self.send(MonitorCommand::LoadLeads { params });
    }

    pub fn load_dashboard(&self) {
        self.send(MonitorCommand::LoadDashboard);
    }

    pub fn submit_batch(&self, upload: CsvUpload, options: BatchOptions) {
        self.send(MonitorCommand::SubmitBatch { upload, options });
    }

    pub fn start_polling(&self, job_id: JobId) {
        self.send(MonitorCommand::StartPolling { job_id });
    }

    pub fn cancel_polling(&self, job_id: JobId) {
        self.send(MonitorCommand::CancelPolling { job_id });
    }

    pub fn scan_domain(&self, domain: impl Into<String>, company_name: Option<String>) {
        self.send(MonitorCommand::ScanDomain {
            domain: domain.into(),
            company_name,
        });
    }

    pub fn await_breakdown(&self, domain: impl Into<String>) {
        self.send(MonitorCommand::AwaitBreakdown {
            domain: domain.into(),
        });
    }

    pub fn cancel_breakdown(&self, domain: impl Into<String>) {
        self.send(MonitorCommand::CancelBreakdown {
            domain: domain.into(),
        });
    }

    pub fn load_sales_summary(&self, domain: impl Into<String>) {
        self.send(MonitorCommand::LoadSalesSummary {
            domain: domain.into(),
        });
    }

    /// Turns every Ctrl-C into a [`MonitorEvent::Interrupted`] instead of
    /// terminating the process.
    pub fn forward_interrupts(&self) {
        self.send(MonitorCommand::ForwardInterrupts);
    }

    pub fn export(&self, params: Vec<(String, String)>, format: ExportFormat, dir: PathBuf) {
        self.send(MonitorCommand::Export {
            params,
            format,
            dir,
        });
    }

    pub fn refresh_after(&self, delay: Duration) {
        self.send(MonitorCommand::RefreshAfter { delay });
    }

    pub fn try_recv(&self) -> Option<MonitorEvent> {
        self.event_rx.try_recv().ok()
    }

    /// `Ok(None)` on timeout; an error once the monitor thread is gone and no
    /// event can ever arrive.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<MonitorEvent>, MonitorStopped> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(MonitorStopped),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("the backend monitor stopped")]
pub struct MonitorStopped;

struct Dispatcher {
    client: Arc<BackendClient>,
    poller: Poller,
    retry: RetrySchedule,
    sink: Arc<dyn ProgressSink>,
    sessions: HashMap<JobId, PollSession>,
    breakdowns: HashMap<String, (CancellationToken, JoinHandle<()>)>,
    forwarding_interrupts: bool,
}

impl Dispatcher {
    fn handle(&mut self, runtime: &Runtime, command: MonitorCommand) {
        let _enter = runtime.enter();
        self.sessions.retain(|_, session| !session.is_finished());
        self.breakdowns.retain(|_, (_, task)| !task.is_finished());

        let client = self.client.clone();
        let sink = self.sink.clone();
        match command {
            MonitorCommand::LoadLeads { params } => {
                runtime.spawn(async move {
                    let result = client.fetch_leads(&params).await;
                    sink.emit(MonitorEvent::LeadsLoaded(result));
                });
            }
            MonitorCommand::LoadDashboard => {
                runtime.spawn(async move {
                    let result = client.fetch_dashboard().await;
                    sink.emit(MonitorEvent::DashboardLoaded(result));
                });
            }
            MonitorCommand::SubmitBatch { upload, options } => {
                runtime.spawn(async move {
                    let result = client.submit_batch(&upload, options).await;
                    if let Err(err) = &result {
                        hunter_warn!("Batch submission of {} failed: {}", upload.file_name(), err);
                    }
                    sink.emit(MonitorEvent::BatchSubmitted(result));
                });
            }
            MonitorCommand::StartPolling { job_id } => {
                match self.poller.start(job_id.clone(), sink.clone()) {
                    Ok(session) => {
                        self.sessions.insert(job_id, session);
                    }
                    Err(PollError::AlreadyPolling(job_id)) => {
                        hunter_warn!("Ignoring second poll request for job {}", job_id);
                        sink.emit(MonitorEvent::PollRejected { job_id });
                    }
                }
            }
            MonitorCommand::CancelPolling { job_id } => {
                if let Some(session) = self.sessions.remove(&job_id) {
                    session.cancel();
                }
            }
            MonitorCommand::ScanDomain {
                domain,
                company_name,
            } => {
                runtime.spawn(async move {
                    let result = scan(&client, &domain, company_name.as_deref()).await;
                    sink.emit(MonitorEvent::ScanFinished { domain, result });
                });
            }
            MonitorCommand::AwaitBreakdown { domain } => {
                if let Some((previous, _)) = self.breakdowns.remove(&domain) {
                    previous.cancel();
                }
                let cancel = CancellationToken::new();
                let token = cancel.clone();
                let schedule = self.retry;
                let key = domain.clone();
                let task = runtime.spawn(async move {
                    let outcome = await_availability(schedule, &token, |_| {
                        let client = client.clone();
                        let domain = domain.clone();
                        async move { client.score_breakdown(&domain).await }
                    })
                    .await;
                    if !token.is_cancelled() {
                        sink.emit(MonitorEvent::BreakdownResolved { domain, outcome });
                    }
                });
                self.breakdowns.insert(key, (cancel, task));
            }
            MonitorCommand::CancelBreakdown { domain } => {
                if let Some((cancel, _)) = self.breakdowns.remove(&domain) {
                    cancel.cancel();
                }
            }
            MonitorCommand::LoadSalesSummary { domain } => {
                runtime.spawn(async move {
                    let result = client.sales_summary(&domain).await;
                    if let Err(err) = &result {
                        hunter_warn!("Sales summary for {} unavailable: {}", domain, err);
                    }
                    sink.emit(MonitorEvent::SalesSummaryLoaded { domain, result });
                });
            }
            MonitorCommand::ForwardInterrupts => {
                if std::mem::replace(&mut self.forwarding_interrupts, true) {
                    return;
                }
                runtime.spawn(async move {
                    loop {
                        if let Err(err) = tokio::signal::ctrl_c().await {
                            hunter_error!("Failed to listen for Ctrl-C: {}", err);
                            return;
                        }
                        hunter_info!("Received Ctrl-C");
                        sink.emit(MonitorEvent::Interrupted);
                    }
                });
            }
            MonitorCommand::Export {
                params,
                format,
                dir,
            } => {
                runtime.spawn(async move {
                    let result = export(&client, &params, format, dir).await;
                    sink.emit(MonitorEvent::ExportFinished(result));
                });
            }
            MonitorCommand::RefreshAfter { delay } => {
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    sink.emit(MonitorEvent::RefreshDue);
                });
            }
        }
    }
}

/// Ingest-then-scan; an "already exists" ingest rejection is not fatal.
async fn scan(
    client: &BackendClient,
    domain: &str,
    company_name: Option<&str>,
) -> Result<crate::ScanResult, ApiError> {
    match client.ingest_domain(domain, company_name).await {
        Ok(()) => hunter_debug!("Ingested {} before scan", domain),
        Err(err) if err.user_message().contains("already exists") => {
            hunter_debug!("{} already ingested", domain);
        }
        Err(err) => return Err(err),
    }
    let result = client.scan_domain(domain).await?;
    hunter_info!(
        "Scanned {} score={:?} segment={:?}",
        result.domain,
        result.score,
        result.segment
    );
    Ok(result)
}

async fn export(
    client: &BackendClient,
    params: &[(String, String)],
    format: ExportFormat,
    dir: PathBuf,
) -> Result<PathBuf, ExportError> {
    let payload = client.export_leads(params, format).await?;
    let path = tokio::task::spawn_blocking(move || save_export(&dir, &payload))
        .await
        .map_err(|err| ExportError::Write(err.to_string()))??;
    hunter_info!("Export written to {}", path.display());
    Ok(path)
}
