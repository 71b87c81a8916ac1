//! Endpoint descriptors.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::http::{EndpointRequest, EndpointResponse};
use crate::routing::path::validate_path;
use crate::routing::{HttpMethod, RouteError};

/// Result type returned by endpoint handlers.
pub type HandlerResult<R = EndpointResponse> = anyhow::Result<R>;

/// Type-erased handler shared by every request routed to an endpoint.
pub type BoxedHandler = Arc<dyn Fn(EndpointRequest) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// A single `(method, path)` pair bound to a handler.
///
/// Immutable once created; cloning only bumps the handler's reference count.
#[derive(Clone)]
pub struct Endpoint {
    path: String,
    method: HttpMethod,
    name: String,
    handler: BoxedHandler,
}

impl Endpoint {
    /// Create an endpoint, naming it after the handler's type.
    pub fn new<F, Fut, R>(path: impl Into<String>, method: HttpMethod, handler: F) -> Result<Self, RouteError>
    where
        F: Fn(EndpointRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<R>> + Send + 'static,
        R: Into<EndpointResponse>,
    {
        Self::named(handler_name::<F>(), path, method, handler)
    }

    /// Create an endpoint with an explicit identity.
    pub fn named<F, Fut, R>(
        name: impl Into<String>,
        path: impl Into<String>,
        method: HttpMethod,
        handler: F,
    ) -> Result<Self, RouteError>
    where
        F: Fn(EndpointRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<R>> + Send + 'static,
        R: Into<EndpointResponse>,
    {
        let path = path.into();
        validate_path(&path)?;
        Ok(Self::from_parts(path, method, name.into(), box_handler(handler)))
    }

    pub(crate) fn from_parts(path: String, method: HttpMethod, name: String, handler: BoxedHandler) -> Self {
        Self { path, method, name, handler }
    }

    /// Copy of this endpoint mounted at another path.
    pub(crate) fn at_path(&self, path: String) -> Self {
        Self { path, ..self.clone() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The controller-method identity of the handler.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> &BoxedHandler {
        &self.handler
    }

    /// Whether `key` is this endpoint's full identity or its trailing segments
    /// (`get_person`, `PersonController::get_person`).
    pub fn answers_to(&self, key: &str) -> bool {
        self.name == key
            || self
                .name
                .strip_suffix(key)
                .is_some_and(|prefix| prefix.ends_with("::"))
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

pub(crate) fn box_handler<F, Fut, R>(handler: F) -> BoxedHandler
where
    F: Fn(EndpointRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<R>> + Send + 'static,
    R: Into<EndpointResponse>,
{
    Arc::new(move |request: EndpointRequest| -> BoxFuture<'static, HandlerResult> {
        let fut = handler(request);
        Box::pin(async move { fut.await.map(Into::into) })
    })
}

pub(crate) fn handler_name<F>() -> String {
    std::any::type_name::<F>().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::DataResponse;

    async fn list_people(_req: EndpointRequest) -> HandlerResult<DataResponse> {
        Ok(DataResponse::ok())
    }

    #[test]
    fn test_endpoint_is_named_after_its_handler() {
        let endpoint = Endpoint::new("/people", HttpMethod::Get, list_people).unwrap();
        assert!(endpoint.name().ends_with("list_people"));
        assert!(endpoint.answers_to("list_people"));
        assert!(endpoint.answers_to("tests::list_people"));
        assert!(!endpoint.answers_to("people"));
    }

    #[test]
    fn test_invalid_path_is_rejected() {
        let err = Endpoint::new("people", HttpMethod::Get, list_people).unwrap_err();
        assert_eq!(err, RouteError::InvalidRoutePath("people".into()));
    }
}
