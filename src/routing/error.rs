//! Registration and dispatch error definitions.

use thiserror::Error;

/// Errors raised while declaring, registering or dispatching endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// A declared path does not start with `/`.
    #[error("Route {0} is not a valid route.")]
    InvalidRoutePath(String),

    /// Nothing was declared under the given controller-method identity.
    #[error("No method found in key {0}.")]
    NoMethodFound(String),

    /// A handler produced a response that cannot be written to the wire.
    #[error("Invalid response returned in the route of path {path}: {reason}")]
    InvalidRouteReturn { path: String, reason: String },

    /// Two routes cannot be registered side by side on the router.
    #[error("Route {path} conflicts with an existing route: {reason}")]
    ConflictingRoute { path: String, reason: String },
}
