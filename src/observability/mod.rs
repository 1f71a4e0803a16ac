//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher, hub, controller produce:
//!     → logging.rs (structured log events, request ID on every line)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
