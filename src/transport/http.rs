use super::{CallError, Upstream};
use crate::types::{Method, RequestSpec};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use std::env;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

/// Correlation header attached to every outbound request.
pub const REQUEST_ID_HEADER: &str = "x-relay-request-id";

/// HTTP upstream returning JSON payloads.
///
/// Non-JSON success bodies come back as `Value::String`. The client carries no
/// request timeout of its own; deadlines belong to the bounded executor.
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: Option<Url>,
}

impl HttpUpstream {
    pub fn new() -> Result<Self> {
        // Pool knobs are env-overridable, everything else stays at reqwest defaults.
        let builder = reqwest::Client::builder()
            .pool_max_idle_per_host(
                env::var("RELAY_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(
                env::var("RELAY_HTTP_POOL_IDLE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(90),
            )));

        let client = builder.build().map_err(|e| {
            Error::configuration_with_context(
                format!("failed to build HTTP client: {}", e),
                ErrorContext::new().with_source("http_upstream"),
            )
        })?;

        Ok(Self {
            client,
            base_url: None,
        })
    }

    /// Resolve relative targets against `base`.
    pub fn with_base_url(mut self, base: &str) -> Result<Self> {
        let url = Url::parse(base).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base URL: {}", e),
                ErrorContext::new()
                    .with_field_path("base_url")
                    .with_details(base.to_string())
                    .with_source("http_upstream"),
            )
        })?;
        self.base_url = Some(url);
        Ok(self)
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    fn resolve(&self, target: &str) -> std::result::Result<Url, CallError> {
        let parsed = match &self.base_url {
            Some(base) => base.join(target),
            None => Url::parse(target),
        };
        parsed.map_err(|e| CallError::Transport(format!("invalid target '{}': {}", target, e)))
    }

    async fn send(&self, spec: &RequestSpec) -> std::result::Result<serde_json::Value, CallError> {
        let url = self.resolve(&spec.target)?;

        let mut req = match spec.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        };
        if let Some(payload) = &spec.payload {
            req = req.json(payload);
        }
        req = req
            .header("accept", "application/json")
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string());

        let resp = req
            .send()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.ok().filter(|b| !b.is_empty());
            return Err(CallError::Status {
                code: status.as_u16(),
                body,
            });
        }

        // A broken body after a 2xx is still "no usable response".
        let text = resp
            .text()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;
        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    type Output = serde_json::Value;

    async fn call(
        &self,
        spec: &RequestSpec,
        cancel: CancellationToken,
    ) -> std::result::Result<serde_json::Value, CallError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CallError::Transport("request cancelled".to_string())),
            res = self.send(spec) => res,
        }
    }
}
