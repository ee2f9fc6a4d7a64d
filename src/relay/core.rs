use crate::batch::{BatchOrchestrator, BatchResult};
use crate::config::RelayConfig;
use crate::executor::RetryingExecutor;
use crate::resilience::{AdmissionGate, AdmissionSnapshot};
use crate::transport::Upstream;
use crate::types::RequestSpec;
use crate::{Error, Result};
use std::sync::Arc;
use tracing::info;

/// Admission-checked entry point for single calls and batches.
pub struct Relay<U> {
    pub(crate) config: RelayConfig,
    pub(crate) gate: Arc<AdmissionGate>,
    pub(crate) executor: Arc<RetryingExecutor<U>>,
    pub(crate) batch: BatchOrchestrator<U>,
}

impl<U: Upstream> Relay<U> {
    pub fn builder(upstream: U) -> crate::relay::builder::RelayBuilder<U> {
        crate::relay::builder::RelayBuilder::new(upstream)
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn gate(&self) -> &Arc<AdmissionGate> {
        &self.gate
    }

    pub fn executor(&self) -> &Arc<RetryingExecutor<U>> {
        &self.executor
    }

    pub fn orchestrator(&self) -> &BatchOrchestrator<U> {
        &self.batch
    }

    /// Count one request for `identity` against its window.
    pub fn admit(&self, identity: &str) -> bool {
        self.gate.admit(identity)
    }

    pub fn admission_snapshot(&self, identity: &str) -> AdmissionSnapshot {
        self.gate.snapshot(identity)
    }

    fn check_admission(&self, identity: &str) -> Result<()> {
        let (admitted, snapshot) = self.gate.admit_with_snapshot(identity);
        if admitted {
            return Ok(());
        }
        let retry_after = snapshot.reset_after;
        info!(
            identity,
            retry_after_ms = retry_after.as_millis() as u64,
            "request denied by admission gate"
        );
        Err(Error::Denied {
            identity: identity.to_string(),
            retry_after,
        })
    }

    /// Admission check, then one call with retries.
    ///
    /// A denied identity gets [`Error::Denied`] and no attempt is made.
    pub async fn fetch(&self, identity: &str, spec: &RequestSpec) -> Result<U::Output> {
        self.check_admission(identity)?;
        Ok(self.executor.execute_with_retry(spec).await?)
    }

    /// Admission check (one admission per batch), then the whole batch.
    ///
    /// Item failures are reported inside the [`BatchResult`], not as an `Err`.
    pub async fn fetch_batch(
        &self,
        identity: &str,
        specs: Vec<RequestSpec>,
        concurrency: Option<usize>,
    ) -> Result<BatchResult<U::Output>> {
        self.check_admission(identity)?;
        Ok(self.batch.execute_batch(specs, concurrency).await)
    }
}
