//! Attempt observation hooks.

use crate::error::Failure;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info};

/// What happened in one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub target: String,
    /// 1-based attempt number.
    pub attempt: u32,
    pub max_attempts: u32,
    pub elapsed: Duration,
    /// `None` when the attempt succeeded.
    pub failure: Option<Failure>,
    /// Backoff before the next attempt, `None` when this attempt was terminal.
    pub next_delay: Option<Duration>,
}

impl AttemptRecord {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    pub fn is_terminal(&self) -> bool {
        self.next_delay.is_none()
    }
}

/// Diagnostics hook called once per attempt, terminal attempts included.
///
/// Observers see records after the retry decision has been made and have no
/// way to influence it.
pub trait AttemptObserver: Send + Sync {
    fn on_attempt(&self, record: &AttemptRecord);
}

/// Default observer (records nothing).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl AttemptObserver for NoopObserver {
    fn on_attempt(&self, _record: &AttemptRecord) {}
}

pub fn noop_observer() -> Arc<dyn AttemptObserver> {
    Arc::new(NoopObserver)
}

/// Emits one tracing event per attempt.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl AttemptObserver for TracingObserver {
    fn on_attempt(&self, record: &AttemptRecord) {
        match &record.failure {
            None => debug!(
                target_ref = record.target.as_str(),
                attempt = record.attempt,
                elapsed_ms = record.elapsed.as_millis() as u64,
                "attempt succeeded"
            ),
            Some(f) => info!(
                target_ref = record.target.as_str(),
                attempt = record.attempt,
                max_attempts = record.max_attempts,
                failure = f.kind(),
                elapsed_ms = record.elapsed.as_millis() as u64,
                next_delay_ms = record.next_delay.map(|d| d.as_millis() as u64),
                "attempt failed"
            ),
        }
    }
}

/// In-memory observer for testing.
#[derive(Debug, Default, Clone)]
pub struct InMemoryObserver {
    records: Arc<RwLock<Vec<AttemptRecord>>>,
}

impl InMemoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AttemptRecord> {
        self.records
            .read()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn records_for(&self, target: &str) -> Vec<AttemptRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.target == target)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut r) = self.records.write() {
            r.clear();
        }
    }
}

impl AttemptObserver for InMemoryObserver {
    fn on_attempt(&self, record: &AttemptRecord) {
        if let Ok(mut r) = self.records.write() {
            r.push(record.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(target: &str, attempt: u32, failure: Option<Failure>) -> AttemptRecord {
        AttemptRecord {
            target: target.to_string(),
            attempt,
            max_attempts: 3,
            elapsed: Duration::from_millis(5),
            failure,
            next_delay: None,
        }
    }

    #[test]
    fn test_in_memory_observer_collects_and_filters() {
        let observer = InMemoryObserver::new();
        observer.on_attempt(&record("/a", 1, Some(Failure::status(502))));
        observer.on_attempt(&record("/b", 1, None));
        observer.on_attempt(&record("/a", 2, None));

        assert_eq!(observer.len(), 3);
        let a = observer.records_for("/a");
        assert_eq!(a.len(), 2);
        assert!(!a[0].succeeded());
        assert!(a[1].succeeded());

        observer.clear();
        assert!(observer.is_empty());
    }

    #[test]
    fn test_clones_share_storage() {
        let observer = InMemoryObserver::new();
        let handle = observer.clone();
        observer.on_attempt(&record("/a", 1, None));
        assert_eq!(handle.len(), 1);
    }

    #[test]
    fn test_noop_and_tracing_observers_accept_records() {
        let rec = record("/a", 1, Some(Failure::transport("reset")));
        NoopObserver.on_attempt(&rec);
        TracingObserver.on_attempt(&rec);
        assert!(rec.is_terminal());
    }
}
