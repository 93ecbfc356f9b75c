use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::time::Duration;

use hunter_logging::{hunter_debug, hunter_info, hunter_warn};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::client::JobSource;
use crate::{JobId, JobProgress, MonitorEvent, PollSnapshot};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: MonitorEvent);
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<MonitorEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<MonitorEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: MonitorEvent) {
        let _ = self.tx.send(event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    /// Fixed rate between poll starts.
    pub interval: Duration,
    /// `None` polls until a terminal status.
    pub max_attempts: Option<u32>,
    /// `None` polls until a terminal status.
    pub max_duration: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            max_attempts: None,
            max_duration: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("job {0} is already being polled")]
    AlreadyPolling(JobId),
}

/// How a poll session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEnd {
    Terminal(JobProgress),
    Cancelled,
    GaveUp { attempts: u32 },
}

type ActiveSet = Arc<Mutex<HashMap<JobId, ActiveSlot>>>;

/// Starts and tracks poll sessions; at most one live session per job id.
#[derive(Clone)]
pub struct Poller {
    source: Arc<dyn JobSource>,
    settings: PollSettings,
    active: ActiveSet,
    next_session: Arc<AtomicU64>,
}

impl Poller {
    pub fn new(source: Arc<dyn JobSource>, settings: PollSettings) -> Self {
        Self {
            source,
            settings,
            active: Arc::new(Mutex::new(HashMap::new())),
            next_session: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// A cancelled session stops counting as active at once, even while its
    /// task is still winding down.
    pub fn is_active(&self, job_id: &JobId) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .is_some_and(|slot| !slot.gate.is_cancelled())
    }

    /// Spawns the session on the current tokio runtime.
    pub fn start(
        &self,
        job_id: JobId,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<PollSession, PollError> {
        let gate = Arc::new(CancelGate::default());
        let session_id = self.next_session.fetch_add(1, Ordering::Relaxed);
        let entry = ActiveEntry::claim(self.active.clone(), job_id.clone(), session_id, &gate)
            .ok_or_else(|| PollError::AlreadyPolling(job_id.clone()))?;

        hunter_info!(
            "Polling job {} every {:?}",
            job_id,
            self.settings.interval
        );
        let handle = tokio::spawn(run_session(
            self.source.clone(),
            job_id.clone(),
            self.settings.clone(),
            gate.clone(),
            sink,
            entry,
        ));

        Ok(PollSession {
            job_id,
            gate,
            handle,
        })
    }
}

/// Handle to one job's polling task.
pub struct PollSession {
    job_id: JobId,
    gate: Arc<CancelGate>,
    handle: JoinHandle<PollEnd>,
}

impl PollSession {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Stops polling; no event is emitted after this returns and the job id
    /// can be polled again right away.
    pub fn cancel(&self) {
        self.gate.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn wait(self) -> PollEnd {
        self.handle.await.unwrap_or(PollEnd::Cancelled)
    }
}

/// Cancellation shared by a session task and its handle.
///
/// Emitting and cancelling both hold `lock`, so an event is either fully
/// delivered before `cancel` returns or not delivered at all.
#[derive(Default)]
struct CancelGate {
    token: CancellationToken,
    lock: Mutex<()>,
}

impl CancelGate {
    fn cancel(&self) {
        let _held = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.token.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns `false` when the session was cancelled and the event dropped.
    fn emit(&self, sink: &dyn ProgressSink, event: MonitorEvent) -> bool {
        let _held = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.token.is_cancelled() {
            return false;
        }
        sink.emit(event);
        true
    }
}

struct ActiveSlot {
    session_id: u64,
    gate: Arc<CancelGate>,
}

/// Membership in the active set, released when the session task ends.
struct ActiveEntry {
    active: ActiveSet,
    job_id: JobId,
    session_id: u64,
}

impl ActiveEntry {
    /// Fails while another live session holds the job id; a cancelled holder
    /// is replaced.
    fn claim(
        active: ActiveSet,
        job_id: JobId,
        session_id: u64,
        gate: &Arc<CancelGate>,
    ) -> Option<Self> {
        {
            let mut slots = active.lock().unwrap_or_else(PoisonError::into_inner);
            if slots
                .get(&job_id)
                .is_some_and(|slot| !slot.gate.is_cancelled())
            {
                return None;
            }
            slots.insert(
                job_id.clone(),
                ActiveSlot {
                    session_id,
                    gate: gate.clone(),
                },
            );
        }
        Some(Self {
            active,
            job_id,
            session_id,
        })
    }
}

impl Drop for ActiveEntry {
    fn drop(&mut self) {
        let mut slots = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        // A newer session may already own the id.
        if slots
            .get(&self.job_id)
            .is_some_and(|slot| slot.session_id == self.session_id)
        {
            slots.remove(&self.job_id);
        }
    }
}

async fn run_session(
    source: Arc<dyn JobSource>,
    job_id: JobId,
    settings: PollSettings,
    gate: Arc<CancelGate>,
    sink: Arc<dyn ProgressSink>,
    _entry: ActiveEntry,
) -> PollEnd {
    let cancel = gate.token.clone();
    let started = Instant::now();
    // First poll one interval after start; ticks missed by a slow poll are
    // skipped so polls never overlap.
    let mut ticker = time::interval_at(started + settings.interval, settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut attempts: u32 = 0;
    let mut seq: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return cancelled(&job_id),
            _ = ticker.tick() => {}
        }

        attempts += 1;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return cancelled(&job_id),
            result = source.job_progress(&job_id) => result,
        };

        match result {
            Ok(progress) => {
                seq += 1;
                let snapshot = PollSnapshot { seq, progress };
                let terminal = snapshot.progress.status.is_terminal();
                if !gate.emit(sink.as_ref(), MonitorEvent::JobUpdated(snapshot.clone())) {
                    return cancelled(&job_id);
                }
                if terminal {
                    hunter_info!(
                        "Job {} reached {:?} after {} polls",
                        job_id,
                        snapshot.progress.status,
                        attempts
                    );
                    let progress = snapshot.progress.clone();
                    if !gate.emit(sink.as_ref(), MonitorEvent::JobFinished(snapshot)) {
                        return cancelled(&job_id);
                    }
                    return PollEnd::Terminal(progress);
                }
            }
            Err(error) => {
                hunter_warn!("Progress poll for job {} failed: {}", job_id, error);
                let event = MonitorEvent::PollFailed {
                    job_id: job_id.clone(),
                    error,
                };
                if !gate.emit(sink.as_ref(), event) {
                    return cancelled(&job_id);
                }
            }
        }

        let out_of_attempts = settings.max_attempts.is_some_and(|max| attempts >= max);
        let out_of_time = settings
            .max_duration
            .is_some_and(|limit| started.elapsed() >= limit);
        if out_of_attempts || out_of_time {
            hunter_warn!(
                "Giving up on job {} after {} polls without a terminal status",
                job_id,
                attempts
            );
            let event = MonitorEvent::PollGaveUp {
                job_id: job_id.clone(),
                attempts,
            };
            if !gate.emit(sink.as_ref(), event) {
                return cancelled(&job_id);
            }
            return PollEnd::GaveUp { attempts };
        }
    }
}

fn cancelled(job_id: &JobId) -> PollEnd {
    hunter_debug!("Polling for job {} cancelled", job_id);
    PollEnd::Cancelled
}
