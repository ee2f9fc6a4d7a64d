use crate::batch::BatchOrchestrator;
use crate::config::RelayConfig;
use crate::executor::{noop_observer, AttemptObserver, BoundedExecutor, RetryingExecutor};
use crate::resilience::AdmissionGate;
use crate::transport::Upstream;
use crate::Result;
use std::sync::Arc;

use super::core::Relay;

/// Builder for [`Relay`].
///
/// Without an explicit config the builder starts from [`RelayConfig::from_env`].
/// A gate passed through [`with_gate`](Self::with_gate) is shared as-is and
/// keeps its own window settings.
pub struct RelayBuilder<U> {
    upstream: U,
    config: Option<RelayConfig>,
    gate: Option<Arc<AdmissionGate>>,
    observer: Option<Arc<dyn AttemptObserver>>,
}

impl<U: Upstream> RelayBuilder<U> {
    pub fn new(upstream: U) -> Self {
        Self {
            upstream,
            config: None,
            gate: None,
            observer: None,
        }
    }

    pub fn with_config(mut self, config: RelayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Share an existing gate (e.g. one gate in front of several relays).
    pub fn with_gate(mut self, gate: Arc<AdmissionGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Result<Relay<U>> {
        let config = self.config.unwrap_or_else(RelayConfig::from_env);
        config.validate()?;

        let gate = self
            .gate
            .unwrap_or_else(|| Arc::new(AdmissionGate::new(config.admission())));

        let bounded = BoundedExecutor::new(self.upstream).with_default_timeout(config.timeout());
        let executor = Arc::new(
            RetryingExecutor::new(bounded)
                .with_policy(config.retry_policy())
                .with_observer(self.observer.unwrap_or_else(noop_observer)),
        );
        let batch = BatchOrchestrator::new(executor.clone())
            .with_default_concurrency(config.concurrency)
            .with_mode(config.batch_mode);

        Ok(Relay {
            config,
            gate,
            executor,
            batch,
        })
    }
}
