//! # upstream-relay
//!
//! 面向不可靠上游数据源的弹性请求编排：超时、重试、有界并发批处理与按身份准入控制。
//!
//! Resilient request orchestration for unreliable upstream data providers.
//!
//! ## Overview
//!
//! The relay guarantees delivery semantics for outbound calls: every attempt
//! runs under a deadline, failed attempts are retried with exponential
//! backoff, batches run under a concurrency ceiling with index-stable results,
//! and a per-identity fixed-window gate bounds how often a caller may start
//! work. It does not decide what to fetch, does not cache, and does not
//! validate payloads.
//!
//! ## Layers (leaf first)
//!
//! 1. [`AdmissionGate`]: per-identity fixed-window request counter
//! 2. [`BoundedExecutor`]: one attempt raced against a deadline
//! 3. [`RetryingExecutor`]: exponential-backoff retry over the bounded executor
//! 4. [`BatchOrchestrator`]: bounded fan-out with ordered, partial-failure results
//!
//! Callers consult the gate first. [`Relay`] bundles all four and enforces
//! that order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use upstream_relay::{HttpUpstream, Relay, RelayConfig, RequestSpec};
//!
//! #[tokio::main]
//! async fn main() -> upstream_relay::Result<()> {
//!     let upstream = HttpUpstream::new()?.with_base_url("http://localhost:3000")?;
//!     let relay = Relay::builder(upstream)
//!         .with_config(RelayConfig::from_env())
//!         .build()?;
//!
//!     let specs = vec![
//!         RequestSpec::get("/api/revenue"),
//!         RequestSpec::get("/api/active-users"),
//!         RequestSpec::get("/api/churn"),
//!     ];
//!     let result = relay.fetch_batch("dashboard-session-1", specs, None).await?;
//!     for (index, failure) in result.failures() {
//!         eprintln!("widget {index} failed: {failure}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`resilience`] | Admission gate (fixed-window, per identity) |
//! | [`transport`] | Upstream contract, HTTP and closure-backed upstreams |
//! | [`executor`] | Bounded and retrying executors, retry policy, attempt observers |
//! | [`batch`] | Batch orchestrator and batch results |
//! | [`relay`] | Facade and builder |
//! | [`config`] | Layered configuration (defaults, YAML, environment) |
//! | [`types`] | Request specs and attempt outcomes |

pub mod batch;
pub mod config;
pub mod executor;
pub mod relay;
pub mod resilience;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use batch::{BatchMode, BatchOrchestrator, BatchResult};
pub use config::RelayConfig;
pub use executor::{
    AttemptObserver, AttemptRecord, BoundedExecutor, RetryCondition, RetryPolicy,
    RetryingExecutor,
};
pub use relay::{Relay, RelayBuilder};
pub use resilience::{AdmissionConfig, AdmissionGate, AdmissionSnapshot};
pub use transport::{upstream_fn, CallError, FnUpstream, HttpUpstream, Upstream};
pub use types::{AttemptOutcome, Method, RequestSpec};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, Failure};
