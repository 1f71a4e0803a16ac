//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (verb match, path normalization, sub-method split)
//!     → Return: RouteMatch or RouteMiss (NotFound / MethodNotAllowed)
//!
//! Route Compilation (at startup):
//!     RouteEntry[]
//!     → RouteDescriptor (verb, path, handler, sub-methods)
//!     → ActionResolver resolves handler identifiers
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First registered match wins

pub mod matcher;
pub mod router;

pub use matcher::Verb;
pub use router::{RegisteredRoute, RouteDescriptor, RouteError, RouteMatch, RouteMiss, RouteTable};
