//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Mount middlewares, then controllers and the shared registry, on an Axum router
//! - Wire up the tower layers (tracing, timeout, request ID)
//! - Bind the configured address on `listen` and release it on `close`
//!
//! # Design Decisions
//! - Any registration failure aborts construction; there is no partially wired server
//! - Routes are grouped per path; a later (path, method) pair replaces an earlier one
//! - The serve loop runs on its own task and stops through the [`Shutdown`] broadcast

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::http::dispatch::method_router;
use crate::http::middleware::{Middleware, MountedMiddleware};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::DataResponse;
use crate::lifecycle::Shutdown;
use crate::routing::controller::mount;
use crate::routing::path::{compose_path, to_router_syntax};
use crate::routing::{Controller, Endpoint, EndpointRegistry, HttpMethod, RouteError};

const DEFAULT_HOSTNAME: &str = "0.0.0.0";

/// Errors raised by the server lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// `close` was called on a server that is not listening.
    #[error("Server is not running.")]
    NotRunning,

    #[error("Server is already listening on {0}.")]
    AlreadyRunning(SocketAddr),

    #[error("Failed to bind {address}: {source}")]
    Bind { address: String, source: io::Error },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The serve task panicked or was cancelled.
    #[error("Server task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Route(#[from] RouteError),
}

/// Where the server is in its lifecycle.
///
/// There is no terminal closed state: `Stopped` covers it, and a stopped
/// server may `listen` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Constructed,
    Running,
    Stopped,
}

type ControllerFactory = Box<dyn FnOnce() -> Result<Vec<Endpoint>, RouteError> + Send>;
type MiddlewareFactory = Box<dyn FnOnce() -> Result<MountedMiddleware, RouteError> + Send>;

/// Collects controllers, middlewares and settings for a [`Server`].
pub struct ServerBuilder {
    config: ServerConfig,
    controllers: Vec<ControllerFactory>,
    middlewares: Vec<MiddlewareFactory>,
    registry: EndpointRegistry,
}

impl ServerBuilder {
    fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            controllers: Vec::new(),
            middlewares: Vec::new(),
            registry: EndpointRegistry::new(),
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Port to bind; `0` picks a free one.
    pub fn port(mut self, port: u16) -> Self {
        self.config.listener.port = port;
        self
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.config.listener.hostname = Some(hostname.into());
        self
    }

    /// Register a controller. `factory` runs during [`ServerBuilder::build`].
    pub fn controller<C, F>(mut self, factory: F) -> Self
    where
        C: Controller,
        F: FnOnce() -> C + Send + 'static,
    {
        self.controllers.push(Box::new(move || {
            let controller = factory();
            tracing::info!(
                controller = std::any::type_name::<C>(),
                path = controller.path(),
                "Setting up controller"
            );
            mount(controller)
        }));
        self
    }

    /// Register a middleware. Middlewares run in registration order.
    pub fn middleware<M, F>(mut self, factory: F) -> Self
    where
        M: Middleware,
        F: FnOnce() -> M + Send + 'static,
    {
        self.middlewares.push(Box::new(move || MountedMiddleware::new(factory())));
        self
    }

    /// Free-standing endpoints mounted next to the controllers.
    pub fn registry(mut self, registry: EndpointRegistry) -> Self {
        self.registry.extend(registry.iter().cloned());
        self
    }

    /// Mount everything and build the router.
    ///
    /// Fails on the first invalid path; the error is logged and returned.
    pub fn build(self) -> Result<Server, RouteError> {
        let ServerBuilder {
            config,
            controllers,
            middlewares,
            registry,
        } = self;

        let assembled = assemble(controllers, middlewares, registry).and_then(|(middlewares, endpoints)| {
            let router = build_router(&config, &endpoints, middlewares)?;
            Ok((router, endpoints))
        });

        let (router, endpoints) = match assembled {
            Ok(assembled) => assembled,
            Err(error) => {
                tracing::error!(error = %error, "Server setup failed, aborting construction");
                return Err(error);
            }
        };

        tracing::info!(endpoints = endpoints.len(), "Waiting for listen call...");
        Ok(Server {
            config,
            router,
            endpoints,
            state: ServerState::Constructed,
            running: None,
        })
    }
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("config", &self.config)
            .field("controllers", &self.controllers.len())
            .field("middlewares", &self.middlewares.len())
            .field("registry", &self.registry)
            .finish()
    }
}

fn assemble(
    controllers: Vec<ControllerFactory>,
    middlewares: Vec<MiddlewareFactory>,
    registry: EndpointRegistry,
) -> Result<(Vec<MountedMiddleware>, EndpointRegistry), RouteError> {
    tracing::info!("Setting up the middlewares...");
    let middlewares = middlewares
        .into_iter()
        .map(|factory| {
            let mounted = factory()?;
            tracing::info!(middleware = mounted.name(), scope = ?mounted.scope(), "Middleware mounted");
            Ok(mounted)
        })
        .collect::<Result<Vec<_>, RouteError>>()?;
    tracing::info!("All middlewares have been set up.");

    let mut endpoints = EndpointRegistry::new();
    for endpoint in &registry {
        let path = to_router_syntax(&compose_path("", endpoint.path()));
        endpoints.push(endpoint.at_path(path));
    }

    tracing::info!("Setting up controllers...");
    for factory in controllers {
        endpoints.extend(factory()?);
    }
    tracing::info!("All controllers have been set up.");

    Ok((middlewares, endpoints))
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
fn build_router(
    config: &ServerConfig,
    endpoints: &EndpointRegistry,
    middlewares: Vec<MountedMiddleware>,
) -> Result<Router, RouteError> {
    let mut routes: BTreeMap<&str, Vec<(HttpMethod, Endpoint)>> = BTreeMap::new();
    for endpoint in endpoints {
        let methods = routes.entry(endpoint.path()).or_default();
        match methods.iter_mut().find(|(method, _)| *method == endpoint.method()) {
            Some(existing) => {
                tracing::warn!(
                    path = endpoint.path(),
                    method = %endpoint.method(),
                    replaced = existing.1.name(),
                    handler = endpoint.name(),
                    "Duplicate endpoint, the last registration wins"
                );
                existing.1 = endpoint.clone();
            }
            None => methods.push((endpoint.method(), endpoint.clone())),
        }
    }

    let body_limit = config.limits.body_limit_bytes;
    let mut router = Router::new();
    for (path, methods) in routes {
        tracing::debug!(path, methods = methods.len(), "Registering route");
        let methods = method_router(methods, body_limit);
        // paths are validated up front, so a panic here is an overlap
        router = std::panic::catch_unwind(AssertUnwindSafe(move || router.route(path, methods))).map_err(|panic| {
            RouteError::ConflictingRoute {
                path: path.to_string(),
                reason: panic
                    .downcast_ref::<String>()
                    .cloned()
                    .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
                    .unwrap_or_default(),
            }
        })?;
    }

    let mut router = router
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed);

    for middleware in middlewares.into_iter().rev() {
        router = middleware.apply(router);
    }

    Ok(router
        .layer(TimeoutLayer::new(Duration::from_secs(config.limits.request_timeout_secs)))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(set_request_id_layer()))
}

async fn not_found(uri: Uri) -> Response {
    let data = DataResponse::new(404).with_message(format!("NOT_FOUND: {}", uri.path()));
    (StatusCode::NOT_FOUND, Json(data)).into_response()
}

async fn method_not_allowed(method: Method, uri: Uri) -> Response {
    let data = DataResponse::new(405).with_message(format!("METHOD_NOT_ALLOWED: {} {}", method, uri.path()));
    (StatusCode::METHOD_NOT_ALLOWED, Json(data)).into_response()
}

struct RunningServer {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    task: JoinHandle<io::Result<()>>,
}

/// A wired server, ready to listen.
pub struct Server {
    config: ServerConfig,
    router: Router,
    endpoints: EndpointRegistry,
    state: ServerState,
    running: Option<RunningServer>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Bind the configured address and start serving.
    ///
    /// Returns once the socket is bound, with the actual local address.
    pub async fn listen(&mut self) -> Result<SocketAddr, ServerError> {
        if let Some(running) = &self.running {
            return Err(ServerError::AlreadyRunning(running.local_addr));
        }

        let hostname = self.config.listener.hostname.as_deref().unwrap_or(DEFAULT_HOSTNAME);
        let port = self.config.listener.port;
        let listener = TcpListener::bind((hostname, port))
            .await
            .map_err(|source| ServerError::Bind {
                address: format!("{}:{}", hostname, port),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let shutdown = Shutdown::new();
        let mut signal = shutdown.subscribe();
        let router = self.router.clone();
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = signal.recv().await;
                })
                .await
        });

        tracing::info!(address = %local_addr, "Listening on port {}.", local_addr.port());
        self.running = Some(RunningServer {
            local_addr,
            shutdown,
            task,
        });
        self.state = ServerState::Running;
        Ok(local_addr)
    }

    /// Stop serving, wait for in-flight requests, and release the port.
    pub async fn close(&mut self) -> Result<(), ServerError> {
        let running = self.running.take().ok_or(ServerError::NotRunning)?;
        running.shutdown.trigger();
        let served = running.task.await.map_err(|e| ServerError::Task(e.to_string()));
        self.state = ServerState::Stopped;
        served??;
        tracing::info!(address = %running.local_addr, "Server closed");
        Ok(())
    }

    /// Listen, wait for `signal`, then close.
    pub async fn run_until_shutdown<S>(mut self, signal: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()>,
    {
        self.listen().await?;
        signal.await;
        tracing::info!("Shutdown signal received");
        self.close().await
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Every mounted endpoint, with composed paths, in mount order.
    pub fn endpoints(&self) -> &EndpointRegistry {
        &self.endpoints
    }

    pub fn find_endpoint(&self, name: &str) -> Result<&Endpoint, RouteError> {
        self.endpoints.find(name)
    }

    /// The fully layered router, for serving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.shutdown.trigger();
        }
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("endpoints", &self.endpoints.len())
            .field("state", &self.state)
            .field("local_addr", &self.local_addr())
            .finish()
    }
}
