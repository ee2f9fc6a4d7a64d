//! 批量编排模块：在并发上限内执行一组请求，保持结果顺序并隔离单项失败。
//!
//! # Batch Orchestration Module
//!
//! Fans a sequence of [`RequestSpec`](crate::types::RequestSpec)s out through the
//! retrying executor with a concurrency ceiling.
//!
//! ## Guarantees
//!
//! - The result has one slot per input spec, in input order
//! - A failing item never cancels or aborts its siblings
//! - Retries are exhausted per item by the retrying executor; the orchestrator never retries
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchOrchestrator`] | Drives a batch under a concurrency limit |
//! | [`BatchMode`] | `Grouped` (group-at-a-time, default) or `Pooled` (refilling pool) |
//! | [`BatchResult`] | Index-aligned outcomes plus aggregate failure bookkeeping |
//!
//! ## Modes
//!
//! - **Grouped**: consecutive groups of `concurrency` items; each group settles
//!   completely before the next starts. Peak concurrency is exact, but a slot
//!   freed early stays idle until the group ends.
//! - **Pooled**: a new item starts the moment any slot frees.
//!
//! ## Example
//!
//! ```rust
//! use upstream_relay::batch::BatchOrchestrator;
//! use upstream_relay::executor::{BoundedExecutor, RetryingExecutor};
//! use upstream_relay::transport::{upstream_fn, CallError};
//! use upstream_relay::types::RequestSpec;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let upstream = upstream_fn(|spec, _cancel| async move {
//!     Ok::<_, CallError>(format!("payload for {}", spec.target))
//! });
//! let executor = Arc::new(RetryingExecutor::new(BoundedExecutor::new(upstream)));
//! let orchestrator = BatchOrchestrator::new(executor);
//!
//! let specs = vec![RequestSpec::get("/api/users"), RequestSpec::get("/api/sales")];
//! let result = orchestrator.execute_batch(specs, Some(2)).await;
//! assert!(result.all_succeeded());
//! assert_eq!(result.get(1).unwrap().as_deref(), Ok("payload for /api/sales"));
//! # }
//! ```

mod executor;
mod result;

pub use executor::{BatchMode, BatchOrchestrator, DEFAULT_CONCURRENCY};
pub use result::BatchResult;
