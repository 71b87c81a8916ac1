//! Application middleware.
//!
//! A middleware sees every request before endpoint dispatch and decides
//! whether to call `next`. Scoped middleware only runs for requests under
//! its path; the rest pass straight through.

use std::fmt;
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use axum::Router;
use futures_util::future::BoxFuture;

use crate::routing::path::{in_scope, normalize_middleware_path};
use crate::routing::RouteError;

/// A request interceptor mounted on the server.
pub trait Middleware: Send + Sync + 'static {
    /// Scope of this middleware; `None` applies it to every request.
    fn path(&self) -> Option<&str> {
        None
    }

    fn handle<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, Response>;
}

/// A middleware instance with its validated scope.
#[derive(Clone)]
pub struct MountedMiddleware {
    scope: Option<String>,
    name: &'static str,
    inner: Arc<dyn Middleware>,
}

impl MountedMiddleware {
    /// Fails with [`RouteError::InvalidRoutePath`] if the scope does not start with `/`.
    pub fn new<M: Middleware>(middleware: M) -> Result<Self, RouteError> {
        let scope = middleware.path().map(normalize_middleware_path).transpose()?;
        Ok(Self {
            scope,
            name: std::any::type_name::<M>(),
            inner: Arc::new(middleware),
        })
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, request: Request, next: Next) -> Response {
        if let Some(scope) = &self.scope {
            if !in_scope(scope, request.uri().path()) {
                return next.run(request).await;
            }
        }
        self.inner.handle(request, next).await
    }

    /// Wrap every route (and the fallback) of `router` with this middleware.
    pub(crate) fn apply(self, router: Router) -> Router {
        let mounted = Arc::new(self);
        router.layer(axum::middleware::from_fn(move |request: Request, next: Next| {
            let mounted = Arc::clone(&mounted);
            async move { mounted.run(request, next).await }
        }))
    }
}

impl fmt::Debug for MountedMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountedMiddleware")
            .field("scope", &self.scope)
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{HeaderValue, StatusCode};
    use axum::routing::get;
    use tower::ServiceExt;

    struct Stamp {
        scope: Option<&'static str>,
        value: &'static str,
    }

    impl Middleware for Stamp {
        fn path(&self) -> Option<&str> {
            self.scope
        }

        fn handle<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                let mut response = next.run(request).await;
                response.headers_mut().append("x-stamp", HeaderValue::from_static(self.value));
                response
            })
        }
    }

    struct Deny;

    impl Middleware for Deny {
        fn path(&self) -> Option<&str> {
            Some("/admin/")
        }

        fn handle<'a>(&'a self, _request: Request, _next: Next) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::FORBIDDEN;
                response
            })
        }
    }

    fn router() -> Router {
        Router::new()
            .route("/api/people", get(|| async { "people" }))
            .route("/admin/stats", get(|| async { "stats" }))
    }

    async fn stamps(router: Router, path: &str) -> (StatusCode, Vec<String>) {
        let response = router
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let stamps = response
            .headers()
            .get_all("x-stamp")
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        (response.status(), stamps)
    }

    #[test]
    fn test_scope_must_start_with_slash() {
        let err = MountedMiddleware::new(Stamp { scope: Some("api"), value: "a" }).unwrap_err();
        assert_eq!(err, RouteError::InvalidRoutePath("api".into()));
    }

    #[tokio::test]
    async fn test_scoped_middleware_skips_other_paths() {
        let mounted = MountedMiddleware::new(Stamp { scope: Some("/api/"), value: "api" }).unwrap();
        assert_eq!(mounted.scope(), Some("/api"));
        let router = mounted.apply(router());

        assert_eq!(stamps(router.clone(), "/api/people").await, (StatusCode::OK, vec!["api".to_string()]));
        assert_eq!(stamps(router, "/admin/stats").await, (StatusCode::OK, vec![]));
    }

    #[tokio::test]
    async fn test_global_middleware_sees_unmatched_requests() {
        let router = MountedMiddleware::new(Stamp { scope: None, value: "all" }).unwrap().apply(router());
        assert_eq!(stamps(router, "/nowhere").await, (StatusCode::NOT_FOUND, vec!["all".to_string()]));
    }

    #[tokio::test]
    async fn test_middleware_can_short_circuit() {
        let router = MountedMiddleware::new(Deny).unwrap().apply(router());
        assert_eq!(stamps(router.clone(), "/admin/stats").await.0, StatusCode::FORBIDDEN);
        assert_eq!(stamps(router, "/api/people").await.0, StatusCode::OK);
    }
}
