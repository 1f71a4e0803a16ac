//! Network layer.
//!
//! # Data Flow
//! ```text
//! Configured bind address
//!     → listener.rs (bind once, report local address)
//!     → axum::serve (HTTP + WebSocket upgrades on the same port)
//! ```

pub mod listener;

pub use listener::{ListenerError, SharedListener};
