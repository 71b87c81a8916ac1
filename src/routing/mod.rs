//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Declaration (at startup, before any socket):
//!     Controller::routes(&mut Routes<C>)
//!     → path.rs (validate endpoint path)
//!     → Routes<C> (method, path, handler per controller type)
//!
//! Bootstrap:
//!     controller factory → instance
//!     → controller.rs (bind handlers to the instance)
//!     → path.rs (compose base + endpoint, router syntax)
//!     → registry.rs (ordered, read-only once the server is built)
//! ```
//!
//! # Design Decisions
//! - Declarations are explicit calls; no runtime reflection
//! - Registration never deduplicates; the router owns conflict handling
//! - Any invalid path aborts the registration step that declared it

pub mod controller;
pub mod endpoint;
pub mod error;
pub mod method;
pub mod path;
pub mod registry;

pub use controller::{Controller, Routes};
pub use endpoint::{BoxedHandler, Endpoint, HandlerResult};
pub use error::RouteError;
pub use method::HttpMethod;
pub use registry::EndpointRegistry;
