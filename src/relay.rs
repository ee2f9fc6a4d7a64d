//! Relay facade: admission gate, retrying executor and batch orchestrator
//! wired from one [`RelayConfig`](crate::RelayConfig).
//!
//! Keep the public surface small. Each component stays usable on its own;
//! the facade only adds the "consult the gate before executing" discipline.

pub mod builder;
pub mod core;

pub use builder::RelayBuilder;
pub use core::Relay;
