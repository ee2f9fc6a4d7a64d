//! Retry loop over the bounded executor.
//!
//! The loop is driven by [`RetryState`]: `Attempting` runs one bounded
//! attempt and asks the policy for the next state, `Backoff` sleeps the
//! computed delay, `Terminal` hands the outcome back to the caller.

use super::bounded::BoundedExecutor;
use super::observer::{noop_observer, AttemptObserver, AttemptRecord};
use super::policy::{RetryPolicy, RetryState};
use crate::transport::Upstream;
use crate::types::{AttemptOutcome, RequestSpec};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};

pub struct RetryingExecutor<U> {
    bounded: BoundedExecutor<U>,
    policy: RetryPolicy,
    observer: Arc<dyn AttemptObserver>,
}

impl<U: Upstream> RetryingExecutor<U> {
    pub fn new(bounded: BoundedExecutor<U>) -> Self {
        Self {
            bounded,
            policy: RetryPolicy::default(),
            observer: noop_observer(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn bounded(&self) -> &BoundedExecutor<U> {
        &self.bounded
    }

    /// Run `spec` until it succeeds or the attempt budget is spent.
    ///
    /// Returns the first success, or the failure of the last attempt made.
    pub async fn execute_with_retry(&self, spec: &RequestSpec) -> AttemptOutcome<U::Output> {
        let policy = self.policy.for_spec(spec);
        let max_attempts = policy.max_attempts.max(1);
        let mut state = policy.start();

        loop {
            state = match state {
                RetryState::Attempting { attempt } => {
                    let started = Instant::now();
                    let outcome = self.bounded.execute(spec, None).await;
                    let elapsed = started.elapsed();
                    let next = policy.next(attempt, outcome);
                    self.observe(spec, attempt, max_attempts, elapsed, &next);
                    next
                }
                RetryState::Backoff {
                    next_attempt,
                    delay,
                    failure,
                } => {
                    warn!(
                        target_ref = spec.target.as_str(),
                        next_attempt,
                        max_attempts,
                        failure = failure.kind(),
                        delay_ms = delay.as_millis() as u64,
                        "retrying after failure"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    RetryState::Attempting {
                        attempt: next_attempt,
                    }
                }
                RetryState::Terminal(outcome) => {
                    if let Err(failure) = &outcome {
                        info!(
                            target_ref = spec.target.as_str(),
                            max_attempts,
                            failure = failure.kind(),
                            error = %failure,
                            "request failed terminally"
                        );
                    }
                    return outcome;
                }
            };
        }
    }

    fn observe(
        &self,
        spec: &RequestSpec,
        attempt: u32,
        max_attempts: u32,
        elapsed: std::time::Duration,
        next: &RetryState<U::Output>,
    ) {
        let (failure, next_delay) = match next {
            RetryState::Backoff { delay, failure, .. } => (Some(failure.clone()), Some(*delay)),
            RetryState::Terminal(Err(failure)) => (Some(failure.clone()), None),
            _ => (None, None),
        };
        self.observer.on_attempt(&AttemptRecord {
            target: spec.target.clone(),
            attempt,
            max_attempts,
            elapsed,
            failure,
            next_delay,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Failure;
    use crate::executor::observer::InMemoryObserver;
    use crate::transport::{upstream_fn, CallError};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn executor_failing_first(
        failures: u32,
        calls: Arc<AtomicU32>,
    ) -> RetryingExecutor<impl Upstream<Output = &'static str>> {
        let upstream = upstream_fn(move |_spec, _cancel| {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n <= failures {
                    Err(CallError::Status { code: 503, body: None })
                } else {
                    Ok("payload")
                }
            }
        });
        RetryingExecutor::new(BoundedExecutor::new(upstream))
            .with_policy(RetryPolicy::new().with_base_delay(Duration::from_millis(100)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_second_attempt_stops_there() {
        let calls = Arc::new(AtomicU32::new(0));
        let observer = InMemoryObserver::new();
        let exec = executor_failing_first(1, calls.clone()).with_observer(Arc::new(observer.clone()));

        let out = exec.execute_with_retry(&RequestSpec::get("/kpi")).await;
        assert_eq!(out, Ok("payload"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let records = observer.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].failure, Some(Failure::status(503)));
        assert_eq!(records[0].next_delay, Some(Duration::from_millis(100)));
        assert!(records[1].succeeded());
        assert!(records[1].is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let exec = executor_failing_first(u32::MAX, calls.clone());

        let out = exec.execute_with_retry(&RequestSpec::get("/kpi")).await;
        assert_eq!(out, Err(Failure::status(503)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spec_override_changes_attempt_count() {
        let calls = Arc::new(AtomicU32::new(0));
        let exec = executor_failing_first(u32::MAX, calls.clone());

        let spec = RequestSpec::get("/kpi").with_max_attempts(5);
        let _ = exec.execute_with_retry(&spec).await;
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_makes_one_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let exec = executor_failing_first(0, calls.clone());

        let start = Instant::now();
        assert_eq!(exec.execute_with_retry(&RequestSpec::get("/kpi")).await, Ok("payload"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_keeps_call_pending_until_delay_elapses() {
        let calls = Arc::new(AtomicU32::new(0));
        let exec = executor_failing_first(1, calls.clone());
        let spec = RequestSpec::get("/kpi");

        let mut call = tokio_test::task::spawn(exec.execute_with_retry(&spec));
        tokio_test::assert_pending!(call.poll());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_millis(50)).await;
        tokio_test::assert_pending!(call.poll());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_millis(100)).await;
        tokio_test::assert_ready_eq!(call.poll(), Ok("payload"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
