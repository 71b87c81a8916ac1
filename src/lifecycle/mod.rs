//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     close() / signal → broadcast → serve loop stops accepting → drain → port released
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → resolve the future passed to Server::run_until_shutdown
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
