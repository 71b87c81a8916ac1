//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → middleware/ (application middlewares, in declaration order)
//!     → dispatch.rs (read request, call handler, recover failures)
//!     → response.rs (data → JSON, raw → stream.rs)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;
pub mod stream;

pub use middleware::{Middleware, MountedMiddleware};
pub use request::{EndpointRequest, MakeRequestUuid, X_REQUEST_ID};
pub use response::{DataResponse, EndpointResponse, RawResponse};
pub use server::{Server, ServerBuilder, ServerError, ServerState};
pub use stream::{ResponseStream, StreamError};
