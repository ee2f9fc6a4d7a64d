//! 类型模块：定义请求描述与单次尝试结果等核心数据类型。
//!
//! # Types Module
//!
//! Core data types shared by every layer of the relay.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RequestSpec`] | Immutable description of one logical upstream call |
//! | [`Method`] | Request method used by HTTP-style upstreams |
//! | [`AttemptOutcome`] | Result of one execution attempt (payload or classified [`Failure`](crate::Failure)) |
//!
//! ## Example
//!
//! ```rust
//! use upstream_relay::types::RequestSpec;
//! use std::time::Duration;
//!
//! let spec = RequestSpec::get("/api/metrics/cpu")
//!     .with_timeout(Duration::from_millis(2_500))
//!     .with_max_attempts(5);
//! assert_eq!(spec.timeout(), Some(Duration::from_millis(2_500)));
//! ```

pub mod request;

pub use request::{Method, RequestSpec};

use std::time::Duration;

/// Result of a single execution attempt.
///
/// Ephemeral: the retrying executor inspects it to decide the next state and
/// the batch orchestrator stores the terminal one at the item's index.
pub type AttemptOutcome<T> = std::result::Result<T, crate::Failure>;

/// Whole milliseconds covering `d`, rounded up so a non-zero duration never
/// becomes a zero millisecond setting.
pub(crate) fn millis_ceil(d: Duration) -> u64 {
    let ms = d.as_millis() + u128::from(d.subsec_nanos() % 1_000_000 != 0);
    u64::try_from(ms).unwrap_or(u64::MAX)
}
