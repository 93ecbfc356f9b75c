use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use crate::LeadQuery;

pub const DUPLICATE_REQUEST_WINDOW: Duration = Duration::from_millis(500);

/// Suppresses a lead query identical to the previous one issued within the window.
///
/// Only the last admitted request is remembered; a race merely costs one
/// redundant call.
#[derive(Debug, Clone)]
pub struct RequestGuard {
    window: Duration,
    last: Option<([u8; 32], Instant)>,
}

impl Default for RequestGuard {
    fn default() -> Self {
        Self::new(DUPLICATE_REQUEST_WINDOW)
    }
}

impl RequestGuard {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Returns `true` when the query should be sent.
    pub fn admit(&mut self, query: &LeadQuery, now: Instant) -> bool {
        let fingerprint = fingerprint(query);
        if let Some((last, at)) = &self.last {
            if *last == fingerprint && now.saturating_duration_since(*at) < self.window {
                return false;
            }
        }
        self.last = Some((fingerprint, now));
        true
    }
}

fn fingerprint(query: &LeadQuery) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for (key, value) in query.query_pairs() {
        hasher.update(key.as_bytes());
        hasher.update([0x1f]);
        hasher.update(value.as_bytes());
        hasher.update([0x1e]);
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page: u32) -> LeadQuery {
        LeadQuery {
            page,
            ..LeadQuery::default()
        }
    }

    #[test]
    fn identical_query_inside_window_is_suppressed() {
        let mut guard = RequestGuard::default();
        let start = Instant::now();
        assert!(guard.admit(&page(1), start));
        assert!(!guard.admit(&page(1), start + Duration::from_millis(499)));
        assert!(guard.admit(&page(1), start + Duration::from_millis(500)));
    }

    #[test]
    fn different_query_is_always_admitted() {
        let mut guard = RequestGuard::default();
        let start = Instant::now();
        assert!(guard.admit(&page(1), start));
        assert!(guard.admit(&page(2), start));
        assert!(guard.admit(&page(1), start));
    }

    #[test]
    fn zero_window_admits_everything() {
        let mut guard = RequestGuard::new(Duration::ZERO);
        let start = Instant::now();
        assert!(guard.admit(&page(1), start));
        assert!(guard.admit(&page(1), start));
    }
}
