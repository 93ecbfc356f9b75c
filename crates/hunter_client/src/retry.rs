use std::fmt;
use std::future::Future;
use std::time::Duration;

use hunter_logging::{hunter_debug, hunter_info};
use tokio_util::sync::CancellationToken;

/// Delay schedule for waiting on eventually consistent data.
///
/// Attempt `i` (0-indexed) waits `base_delay + i * step` before fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySchedule {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub step: Duration,
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1500),
            step: Duration::from_millis(500),
        }
    }
}

impl RetrySchedule {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay + self.step * attempt
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved<T, E> {
    Ready(T),
    /// Still unavailable after every attempt; not a hard failure.
    Exhausted {
        attempts: u32,
        last_error: Option<E>,
    },
    /// The waiting context went away; no further fetch was issued.
    Cancelled,
}

impl<T, E> Resolved<T, E> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Resolved::Ready(_))
    }
}

/// Calls `fetch` on the schedule until it succeeds, attempts run out or
/// `cancel` fires. Attempts are strictly sequential.
pub async fn await_availability<T, E, F, Fut>(
    schedule: RetrySchedule,
    cancel: &CancellationToken,
    mut fetch: F,
) -> Resolved<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut last_error = None;
    for attempt in 0..schedule.max_attempts {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Resolved::Cancelled,
            _ = tokio::time::sleep(schedule.delay_for(attempt)) => {}
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Resolved::Cancelled,
            result = fetch(attempt) => result,
        };
        match result {
            Ok(value) => return Resolved::Ready(value),
            Err(err) => {
                hunter_debug!(
                    "Not available yet (attempt {}/{}): {}",
                    attempt + 1,
                    schedule.max_attempts,
                    err
                );
                last_error = Some(err);
            }
        }
    }

    hunter_info!(
        "Giving up after {} attempts; data still unavailable",
        schedule.max_attempts
    );
    Resolved::Exhausted {
        attempts: schedule.max_attempts,
        last_error,
    }
}
