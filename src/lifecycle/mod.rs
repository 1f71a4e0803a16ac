//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (controller.rs + startup.rs):
//!     Validate config → Build route table → Compose routers → Bind listener → Ready
//!
//! Shutdown (controller.rs + shutdown.rs):
//!     stop() → Trigger shutdown → Close sockets → Drain requests → Dead
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → binary calls stop()
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then routes, then the listener
//! - Listener opens last (traffic only when everything is attached)

pub mod controller;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use controller::{LifecycleController, LifecycleError, LifecycleEvent, Subsystem, SubsystemState};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::wait_for_signal;
