//! Waypost demo server.
//!
//! Serves a single `PersonController` behind a request logging middleware.
//!
//! ```text
//! GET /person/:id        → {"code":200,"message":"SUCCESS","content":{"id":..,"name":"John Doe"}}
//! GET /person/:id/card   → plain text, streamed
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use clap::Parser;
use futures_util::future::BoxFuture;
use serde_json::json;

use waypost::config::{load_config, ServerConfig};
use waypost::lifecycle::shutdown_signal;
use waypost::observability::{init_logging, metrics};
use waypost::{
    Controller, DataResponse, EndpointRequest, HandlerResult, Middleware, RawResponse, ResponseStream, RouteError,
    Routes, Server,
};

#[derive(Parser, Debug)]
#[command(name = "waypost", version, about = "Waypost demo server")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the listener hostname
    #[arg(long)]
    hostname: Option<String>,
}

#[derive(Debug, Default)]
struct PersonController;

impl PersonController {
    async fn get_person(self: Arc<Self>, req: EndpointRequest) -> HandlerResult<DataResponse> {
        Ok(DataResponse::ok().with_message("SUCCESS").with_content(json!({
            "id": req.param("id"),
            "name": "John Doe",
        })))
    }

    async fn get_card(self: Arc<Self>, req: EndpointRequest) -> HandlerResult<RawResponse> {
        let id = req.param("id").unwrap_or_default().to_string();
        Ok(RawResponse::new(move |stream: ResponseStream| async move {
            stream.set_status(StatusCode::OK)?;
            stream.set_header("content-type", "text/plain; charset=utf-8")?;
            stream.write(format!("Person #{}\n", id)).await?;
            stream.write("Name: John Doe\n").await?;
            Ok::<_, anyhow::Error>(())
        }))
    }
}

impl Controller for PersonController {
    fn path(&self) -> &str {
        "/person"
    }

    fn routes(routes: &mut Routes<Self>) -> Result<(), RouteError> {
        routes.get("/:id", Self::get_person)?;
        routes.get("/:id/card", Self::get_card)?;
        Ok(())
    }
}

/// Logs every request with its status and latency.
#[derive(Debug, Default)]
struct RequestLogMiddleware;

impl Middleware for RequestLogMiddleware {
    fn handle<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let start = Instant::now();
            let method = request.method().clone();
            let path = request.uri().path().to_string();
            let response = next.run(request).await;
            tracing::info!(
                method = %method,
                path = %path,
                status = response.status().as_u16(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Middleware called"
            );
            response
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = cli.port {
        config.listener.port = port;
    }
    if let Some(hostname) = cli.hostname {
        config.listener.hostname = Some(hostname);
    }

    let _logging = init_logging(&config.logging)?;
    tracing::info!("waypost v{} starting", env!("CARGO_PKG_VERSION"));

    if config.metrics.enabled {
        match config.metrics.address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.metrics.address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = Server::builder()
        .config(config)
        .middleware(RequestLogMiddleware::default)
        .controller(PersonController::default)
        .build()?;

    server.run_until_shutdown(shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
