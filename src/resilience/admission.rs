use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct AdmissionSnapshot {
    pub limit: u32,
    pub remaining: u32,
    /// Time until the identity's current window resets (or a full window if none is open).
    pub reset_after: Duration,
}

#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    /// Fixed window length.
    pub window: Duration,
    /// Admitted calls per identity per window.
    pub max_requests: u32,
}

impl AdmissionConfig {
    /// Create a new config with default values (100 requests per 60s window)
    pub fn new() -> Self {
        Self {
            window: Duration::from_millis(60_000),
            max_requests: 100,
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_max_requests(mut self, max: u32) -> Self {
        self.max_requests = max;
        self
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
struct AdmissionWindow {
    count: u32,
    reset_at: Instant,
}

impl AdmissionWindow {
    fn is_open(&self, now: Instant) -> bool {
        now < self.reset_at
    }
}

/// Per-identity fixed-window admission gate.
///
/// - One window per identity, created lazily on first contact
/// - Windows are swapped only when touched after they expire; idle identities do not tick
/// - A denied call does not mutate state
///
/// The gate only answers; callers must not execute when `admit` returns false.
pub struct AdmissionGate {
    cfg: AdmissionConfig,
    windows: Mutex<HashMap<String, AdmissionWindow>>,
}

impl AdmissionGate {
    pub fn new(cfg: AdmissionConfig) -> Self {
        Self {
            cfg,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.cfg
    }

    // Counters are plain integers and stay consistent even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, AdmissionWindow>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count one request for `identity` and report whether it is admitted.
    pub fn admit(&self, identity: &str) -> bool {
        self.admit_with_snapshot(identity).0
    }

    /// Like [`admit`](Self::admit), also returning the window state seen
    /// under the same lock (after counting, if admitted).
    pub fn admit_with_snapshot(&self, identity: &str) -> (bool, AdmissionSnapshot) {
        let now = Instant::now();
        let limit = self.cfg.max_requests;
        let mut windows = self.lock();

        let (admitted, count, reset_at) = match windows.get_mut(identity) {
            Some(w) if w.is_open(now) => {
                if w.count < limit {
                    w.count += 1;
                    (true, w.count, w.reset_at)
                } else {
                    (false, w.count, w.reset_at)
                }
            }
            // A zero limit never opens a window.
            _ if limit == 0 => (false, 0, now + self.cfg.window),
            _ => {
                let fresh = AdmissionWindow {
                    count: 1,
                    reset_at: now + self.cfg.window,
                };
                windows.insert(identity.to_owned(), fresh);
                (true, fresh.count, fresh.reset_at)
            }
        };

        let reset_after = reset_at.duration_since(now);
        if !admitted {
            debug!(
                identity,
                count,
                reset_in_ms = reset_after.as_millis() as u64,
                "admission denied"
            );
        }
        (
            admitted,
            AdmissionSnapshot {
                limit,
                remaining: limit.saturating_sub(count),
                reset_after,
            },
        )
    }

    /// Admissions left for `identity` in its current window, without counting one.
    pub fn remaining(&self, identity: &str) -> u32 {
        let now = Instant::now();
        match self.lock().get(identity) {
            Some(w) if w.is_open(now) => self.cfg.max_requests.saturating_sub(w.count),
            _ => self.cfg.max_requests,
        }
    }

    /// When the window for `identity` resets.
    ///
    /// For an unknown or expired identity this is where a window opened right
    /// now would end.
    pub fn reset_at(&self, identity: &str) -> Instant {
        let now = Instant::now();
        match self.lock().get(identity) {
            Some(w) if w.is_open(now) => w.reset_at,
            _ => now + self.cfg.window,
        }
    }

    pub fn snapshot(&self, identity: &str) -> AdmissionSnapshot {
        let now = Instant::now();
        let windows = self.lock();
        let (remaining, reset_at) = match windows.get(identity) {
            Some(w) if w.is_open(now) => (self.cfg.max_requests.saturating_sub(w.count), w.reset_at),
            _ => (self.cfg.max_requests, now + self.cfg.window),
        };
        AdmissionSnapshot {
            limit: self.cfg.max_requests,
            remaining,
            reset_after: reset_at.duration_since(now),
        }
    }

    /// Drop the window for `identity`. Returns whether one was tracked.
    pub fn reset(&self, identity: &str) -> bool {
        self.lock().remove(identity).is_some()
    }

    /// Drop every tracked window.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of identities with a window (open or expired-but-untouched).
    pub fn tracked_identities(&self) -> usize {
        self.lock().len()
    }
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self::new(AdmissionConfig::default())
    }
}
