//! 上游调用契约：定义执行器与具体数据源之间的接口。
//!
//! # Upstream Transport Module
//!
//! The executors never talk to a data provider directly. They drive an
//! [`Upstream`], which turns a [`RequestSpec`] into either a payload or a
//! [`CallError`].
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Upstream`] | Collaborator contract: one call, best-effort cancellation |
//! | [`CallError`] | Raw failure reported by an upstream, before classification |
//! | [`HttpUpstream`] | reqwest-backed provider returning JSON payloads |
//! | [`FnUpstream`] | Adapter for async closures (mock data sources, tests) |
//!
//! Cancellation is advisory. The executor signals the [`CancellationToken`]
//! when a deadline elapses and stops polling the call; an upstream that spawned
//! work of its own should watch the token and wind that work down.

pub mod http;

pub use http::HttpUpstream;

use crate::types::RequestSpec;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Raw failure reported by an upstream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    /// No response was obtained.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A response was obtained with a non-success status.
    #[error("Upstream status {code}")]
    Status { code: u16, body: Option<String> },
}

/// Opaque request/response endpoint.
#[async_trait]
pub trait Upstream: Send + Sync {
    type Output: Send + 'static;

    async fn call(
        &self,
        spec: &RequestSpec,
        cancel: CancellationToken,
    ) -> std::result::Result<Self::Output, CallError>;
}

#[async_trait]
impl<U> Upstream for Arc<U>
where
    U: Upstream + ?Sized,
{
    type Output = U::Output;

    async fn call(
        &self,
        spec: &RequestSpec,
        cancel: CancellationToken,
    ) -> std::result::Result<Self::Output, CallError> {
        (**self).call(spec, cancel).await
    }
}

/// Upstream backed by an async closure.
#[derive(Clone)]
pub struct FnUpstream<F> {
    f: F,
}

/// Wrap an async closure as an [`Upstream`].
///
/// ```rust
/// use upstream_relay::transport::{upstream_fn, CallError};
///
/// let upstream = upstream_fn(|spec, _cancel| async move {
///     if spec.target.ends_with("/broken") {
///         Err(CallError::Status { code: 502, body: None })
///     } else {
///         Ok(serde_json::json!({ "target": spec.target }))
///     }
/// });
/// # let _ = upstream;
/// ```
pub fn upstream_fn<F, Fut, T>(f: F) -> FnUpstream<F>
where
    F: Fn(RequestSpec, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<T, CallError>> + Send + 'static,
    T: Send + 'static,
{
    FnUpstream { f }
}

#[async_trait]
impl<F, Fut, T> Upstream for FnUpstream<F>
where
    F: Fn(RequestSpec, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<T, CallError>> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    async fn call(
        &self,
        spec: &RequestSpec,
        cancel: CancellationToken,
    ) -> std::result::Result<T, CallError> {
        (self.f)(spec.clone(), cancel).await
    }
}
