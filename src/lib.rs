//! Dynamic HTTP action dispatch with an attached messaging channel.
//!
//! Routes are declared in configuration as (verb, path, handler identifier)
//! triples. Handler identifiers resolve to [`Action`]s registered by the
//! host; the dispatcher extracts parameters, invokes the action and encodes
//! its [`Reply`] as JSON, XML, raw bytes or a file download. A WebSocket
//! messaging subsystem shares the same listener.
//!
//! ```text
//! config ─▶ RouteTable ─▶ Dispatcher ─▶ Action ─▶ ResponseEncoder
//!                 ▲                                      │
//!          ActionRegistry                          HTTP response
//!
//! LifecycleController: start/stop both subsystems on one listener
//! ```

// Core subsystems
pub mod action;
pub mod config;
pub mod http;
pub mod messaging;
pub mod net;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use action::{Action, ActionError, ActionRegistry, ActionResolver, Reply};
pub use config::AppConfig;
pub use http::RequestContext;
pub use lifecycle::{LifecycleController, LifecycleEvent, Shutdown};
