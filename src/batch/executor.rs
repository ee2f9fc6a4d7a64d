//! Batch orchestrator.

use super::result::BatchResult;
use crate::error::Failure;
use crate::executor::RetryingExecutor;
use crate::transport::Upstream;
use crate::types::{AttemptOutcome, RequestSpec};
use futures::future::join_all;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info};

/// Default number of items in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// How items are admitted into flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Consecutive groups of `concurrency` items; a group fully settles before
    /// the next one starts.
    #[default]
    Grouped,
    /// Continuously refilling pool: a new item starts as soon as any slot frees.
    Pooled,
}

/// Fans specs out through a shared [`RetryingExecutor`].
///
/// Never retries on its own and never lets one item's failure cancel another.
/// The returned [`BatchResult`] always covers every input index.
pub struct BatchOrchestrator<U> {
    executor: Arc<RetryingExecutor<U>>,
    default_concurrency: usize,
    mode: BatchMode,
}

impl<U: Upstream> BatchOrchestrator<U> {
    pub fn new(executor: Arc<RetryingExecutor<U>>) -> Self {
        Self {
            executor,
            default_concurrency: DEFAULT_CONCURRENCY,
            mode: BatchMode::default(),
        }
    }

    pub fn with_default_concurrency(mut self, concurrency: usize) -> Self {
        self.default_concurrency = concurrency;
        self
    }

    pub fn with_mode(mut self, mode: BatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> BatchMode {
        self.mode
    }

    pub fn executor(&self) -> &Arc<RetryingExecutor<U>> {
        &self.executor
    }

    /// Execute every spec with at most `concurrency` items in flight
    /// (`None` uses the configured default, zero is treated as one).
    pub async fn execute_batch(
        &self,
        specs: Vec<RequestSpec>,
        concurrency: Option<usize>,
    ) -> BatchResult<U::Output> {
        let start = Instant::now();
        let limit = concurrency.unwrap_or(self.default_concurrency).max(1);
        let total = specs.len();

        let (items, rounds) = match self.mode {
            BatchMode::Grouped => {
                let (items, rounds) = self.run_grouped(&specs, limit).await;
                (items, Some(rounds))
            }
            BatchMode::Pooled => (self.run_pooled(&specs, limit).await, None),
        };

        let result = BatchResult::new(items, start.elapsed(), rounds);
        info!(
            total,
            concurrency = limit,
            failed = result.failure_count(),
            rounds = result.rounds(),
            duration_ms = result.execution_time().as_millis() as u64,
            "batch settled"
        );
        result
    }

    async fn run_grouped(
        &self,
        specs: &[RequestSpec],
        limit: usize,
    ) -> (Vec<AttemptOutcome<U::Output>>, usize) {
        let mut items = Vec::with_capacity(specs.len());
        let mut rounds = 0;

        for group in specs.chunks(limit) {
            // join_all yields in input order, so extending keeps indices aligned.
            let outcomes =
                join_all(group.iter().map(|spec| self.executor.execute_with_retry(spec))).await;
            rounds += 1;
            debug!(
                round = rounds,
                size = group.len(),
                failed = outcomes.iter().filter(|o| o.is_err()).count(),
                "batch group settled"
            );
            items.extend(outcomes);
        }

        (items, rounds)
    }

    async fn run_pooled(
        &self,
        specs: &[RequestSpec],
        limit: usize,
    ) -> Vec<AttemptOutcome<U::Output>> {
        let mut slots: Vec<Option<AttemptOutcome<U::Output>>> =
            (0..specs.len()).map(|_| None).collect();

        let mut settled = futures::stream::iter(specs.iter().enumerate())
            .map(|(idx, spec)| async move { (idx, self.executor.execute_with_retry(spec).await) })
            .buffer_unordered(limit);

        while let Some((idx, outcome)) = settled.next().await {
            slots[idx] = Some(outcome);
        }

        slots
            .into_iter()
            .map(|o| o.unwrap_or_else(|| Err(Failure::transport("batch item produced no outcome"))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{BoundedExecutor, RetryPolicy};
    use crate::transport::{upstream_fn, CallError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Items whose target ends in "fail" return 500; others echo after `latency`.
    fn orchestrator(
        mode: BatchMode,
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    ) -> BatchOrchestrator<impl Upstream<Output = String>> {
        let upstream = upstream_fn(move |spec: RequestSpec, _cancel| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                if spec.target.ends_with("fail") {
                    Err(CallError::Status { code: 500, body: None })
                } else {
                    Ok(spec.target)
                }
            }
        });
        let executor = RetryingExecutor::new(BoundedExecutor::new(upstream)).with_policy(
            RetryPolicy::new()
                .with_max_attempts(2)
                .with_base_delay(Duration::from_millis(5)),
        );
        BatchOrchestrator::new(Arc::new(executor)).with_mode(mode)
    }

    fn specs(n: usize, fail_every: usize) -> Vec<RequestSpec> {
        (1..=n)
            .map(|i| {
                if i % fail_every == 0 {
                    RequestSpec::get(format!("/item/{}/fail", i))
                } else {
                    RequestSpec::get(format!("/item/{}", i))
                }
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_grouped_bounds_peak_concurrency() {
        let peak = Arc::new(AtomicUsize::new(0));
        let orch = orchestrator(BatchMode::Grouped, Arc::new(AtomicUsize::new(0)), peak.clone());

        let result = orch.execute_batch(specs(10, 100), Some(4)).await;
        assert_eq!(result.len(), 10);
        assert!(result.all_succeeded());
        assert_eq!(result.rounds(), Some(3));
        assert_eq!(peak.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pooled_bounds_peak_concurrency() {
        let peak = Arc::new(AtomicUsize::new(0));
        let orch = orchestrator(BatchMode::Pooled, Arc::new(AtomicUsize::new(0)), peak.clone());

        let result = orch.execute_batch(specs(9, 100), Some(2)).await;
        assert_eq!(result.len(), 9);
        assert_eq!(result.rounds(), None);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_recorded_at_original_indices() {
        for mode in [BatchMode::Grouped, BatchMode::Pooled] {
            let peak = Arc::new(AtomicUsize::new(0));
            let orch = orchestrator(mode, Arc::new(AtomicUsize::new(0)), peak.clone());
            let result = orch.execute_batch(specs(9, 3), None).await;
            assert_eq!(result.failed_indices(), &[2, 5, 8], "mode {:?}", mode);
            assert_eq!(result.get(0).unwrap().as_deref(), Ok("/item/1"));
            assert_eq!(result.get(4).unwrap().as_deref(), Ok("/item/5"));
            assert_eq!(peak.load(Ordering::SeqCst), DEFAULT_CONCURRENCY, "mode {:?}", mode);
            if mode == BatchMode::Grouped {
                assert_eq!(result.rounds(), Some(3));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_concurrency_limits_in_flight_items() {
        let peak = Arc::new(AtomicUsize::new(0));
        let orch = orchestrator(BatchMode::Grouped, Arc::new(AtomicUsize::new(0)), peak.clone());

        let result = orch.execute_batch(specs(7, 100), None).await;
        assert!(result.all_succeeded());
        assert_eq!(result.rounds(), Some(3));
        assert_eq!(peak.load(Ordering::SeqCst), 3);

        let peak = Arc::new(AtomicUsize::new(0));
        let orch = orchestrator(BatchMode::Grouped, Arc::new(AtomicUsize::new(0)), peak.clone())
            .with_default_concurrency(5);
        let result = orch.execute_batch(specs(7, 100), None).await;
        assert_eq!(result.rounds(), Some(2));
        assert_eq!(peak.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_concurrency_runs_one_at_a_time() {
        let peak = Arc::new(AtomicUsize::new(0));
        let orch = orchestrator(BatchMode::Grouped, Arc::new(AtomicUsize::new(0)), peak.clone());

        let result = orch.execute_batch(specs(3, 100), Some(0)).await;
        assert_eq!(result.rounds(), Some(3));
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch_settles_immediately() {
        let orch = orchestrator(
            BatchMode::Grouped,
            Arc::new(AtomicUsize::new(0)),
            Arc::new(AtomicUsize::new(0)),
        );
        let result = orch.execute_batch(Vec::new(), None).await;
        assert!(result.is_empty());
        assert_eq!(result.rounds(), Some(0));
    }
}
