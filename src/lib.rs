//! Controller-based routing over Axum.
//!
//! Controllers declare their endpoints once; the server mounts them, wraps
//! every handler in a recovery boundary, and writes either a JSON data
//! response or hands the response stream to the handler.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id → trace → timeout → middlewares ─┐
//!                                                                 ▼
//!                           ┌──────────── dispatch ─────────────────┐
//!                           │ EndpointRequest → handler             │
//!                           │ Err / panic → 500 data response       │
//!                           │ Data → JSON   Raw → ResponseStream    │
//!                           └───────────────────────────────────────┘
//!     Client Response ◀─────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use http::{
    DataResponse, EndpointRequest, EndpointResponse, Middleware, RawResponse, ResponseStream, Server,
    ServerBuilder, ServerError,
};
pub use lifecycle::Shutdown;
pub use routing::{Controller, Endpoint, EndpointRegistry, HandlerResult, HttpMethod, RouteError, Routes};
