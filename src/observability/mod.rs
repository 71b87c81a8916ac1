//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Bootstrap and dispatch produce:
//!     → logging.rs (structured log events, console and rolling files)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, file)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LoggingError, LoggingGuard, LOG_DIR_ENV};
