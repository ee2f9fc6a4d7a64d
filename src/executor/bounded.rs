//! Single-attempt execution under a deadline.

use crate::error::Failure;
use crate::transport::{CallError, Upstream};
use crate::types::{AttemptOutcome, RequestSpec};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default per-attempt deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Issues one call and races it against a deadline.
///
/// No retries, no interpretation of the payload. A call that outlives its
/// deadline is dropped and its cancellation token signaled; the executor does
/// not wait for it to wind down.
pub struct BoundedExecutor<U> {
    upstream: U,
    default_timeout: Duration,
}

impl<U: Upstream> BoundedExecutor<U> {
    pub fn new(upstream: U) -> Self {
        Self {
            upstream,
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn upstream(&self) -> &U {
        &self.upstream
    }

    /// Explicit argument, then the request's override, then the executor default.
    pub fn effective_timeout(&self, spec: &RequestSpec, timeout: Option<Duration>) -> Duration {
        timeout
            .or_else(|| spec.timeout())
            .unwrap_or(self.default_timeout)
    }

    /// Execute one attempt of `spec`.
    pub async fn execute(
        &self,
        spec: &RequestSpec,
        timeout: Option<Duration>,
    ) -> AttemptOutcome<U::Output> {
        let deadline = self.effective_timeout(spec, timeout);
        let cancel = CancellationToken::new();

        match tokio::time::timeout(deadline, self.upstream.call(spec, cancel.clone())).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(classify(e)),
            Err(_) => {
                cancel.cancel();
                debug!(
                    target_ref = spec.target.as_str(),
                    timeout_ms = deadline.as_millis() as u64,
                    "attempt deadline elapsed"
                );
                Err(Failure::Timeout { after: deadline })
            }
        }
    }
}

/// Map a raw upstream error onto the failure taxonomy.
pub fn classify(err: CallError) -> Failure {
    match err {
        CallError::Transport(message) => Failure::Transport { message },
        CallError::Status { code, body } => Failure::UpstreamStatus { code, body },
    }
}
