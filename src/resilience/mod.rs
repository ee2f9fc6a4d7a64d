//! 准入控制模块：按调用方身份的固定窗口请求计数。
//!
//! # Admission Control Module
//!
//! Bounds how often a caller identity may issue requests into the relay.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`admission`] | Per-identity fixed-window request counter |
//!
//! ## Fixed Window
//!
//! Each identity gets a window of `window` length opened by its first request.
//! Up to `max_requests` calls are admitted inside the window; later calls are
//! denied until the window is touched again after it expired, at which point a
//! new window opens with a count of 1.
//!
//! ```rust
//! use upstream_relay::resilience::admission::{AdmissionConfig, AdmissionGate};
//! use std::time::Duration;
//!
//! let gate = AdmissionGate::new(
//!     AdmissionConfig::new()
//!         .with_max_requests(2)
//!         .with_window(Duration::from_secs(60)),
//! );
//!
//! assert!(gate.admit("dashboard-user-42"));
//! assert!(gate.admit("dashboard-user-42"));
//! assert!(!gate.admit("dashboard-user-42"));
//! assert_eq!(gate.remaining("dashboard-user-42"), 0);
//! ```

pub mod admission;

pub use admission::{AdmissionConfig, AdmissionGate, AdmissionSnapshot};
