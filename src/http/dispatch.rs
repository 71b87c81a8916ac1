//! Endpoint dispatch.
//!
//! # Responsibilities
//! - Read the request into an [`EndpointRequest`]
//! - Invoke the handler; turn errors and panics into `500` data responses
//! - Write data responses as JSON, run raw responses against a live stream
//! - Record per-route metrics
//!
//! # Design Decisions
//! - This is the only recovery boundary for handler code: nothing a handler
//!   does reaches the server's own error path
//! - Raw callbacks run on their own task so the body can stream after the
//!   head has been returned

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use axum::Json;
use futures_util::FutureExt;

use crate::http::stream::ResponseStream;
use crate::http::{DataResponse, EndpointRequest, EndpointResponse, RawResponse};
use crate::observability::metrics;
use crate::routing::{Endpoint, HttpMethod};

/// Method router dispatching `methods` to their endpoints.
pub(crate) fn method_router(endpoints: Vec<(HttpMethod, Endpoint)>, body_limit: usize) -> MethodRouter {
    endpoints
        .into_iter()
        .fold(MethodRouter::new(), |router, (method, endpoint)| {
            router.on(method.filter(), move |request: Request| {
                let endpoint = endpoint.clone();
                async move { dispatch(&endpoint, request, body_limit).await }
            })
        })
}

/// Run one request through an endpoint.
pub async fn dispatch(endpoint: &Endpoint, request: Request, body_limit: usize) -> Response {
    let start = Instant::now();

    let response = match EndpointRequest::from_request(request, body_limit).await {
        Ok(request) => {
            let outcome = invoke(endpoint, request).await;
            normalize(endpoint, outcome).await
        }
        Err(rejection) => write_data(endpoint, rejection),
    };

    metrics::record_request(endpoint.method().as_str(), endpoint.path(), response.status().as_u16(), start);
    response
}

/// Call the handler. Errors and panics come back as `500` data responses.
pub async fn invoke(endpoint: &Endpoint, request: EndpointRequest) -> EndpointResponse {
    let handler = Arc::clone(endpoint.handler());
    let outcome = AssertUnwindSafe(async move { handler(request).await })
        .catch_unwind()
        .await;

    match flatten(outcome) {
        Ok(response) => response,
        Err(error) => {
            tracing::error!(
                route = endpoint.path(),
                handler = endpoint.name(),
                "An uncaught error was thrown in the {} method: {:#} | {:?}",
                endpoint.name(),
                error,
                error
            );
            metrics::record_handler_failure(endpoint.path());
            DataResponse::internal_error(format!("{:#}", error)).into()
        }
    }
}

/// Turn a handler's response into the wire response.
pub async fn normalize(endpoint: &Endpoint, response: EndpointResponse) -> Response {
    match response {
        EndpointResponse::Data(data) => write_data(endpoint, data),
        EndpointResponse::Raw(raw) => write_raw(endpoint, raw).await,
    }
}

fn write_data(endpoint: &Endpoint, data: DataResponse) -> Response {
    match data.into_http(endpoint.path()) {
        Ok(response) => response,
        Err(error) => {
            tracing::error!(route = endpoint.path(), handler = endpoint.name(), error = %error, "Invalid handler response");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(DataResponse::internal_error(error))).into_response()
        }
    }
}

async fn write_raw(endpoint: &Endpoint, raw: RawResponse) -> Response {
    let (stream, head) = ResponseStream::channel();
    let handle = stream.clone();
    let callback = raw.into_callback();
    let route = endpoint.path().to_string();

    tokio::spawn(async move {
        let outcome = AssertUnwindSafe(async move { callback(stream).await })
            .catch_unwind()
            .await;
        match flatten(outcome) {
            Ok(()) => handle.finish(),
            Err(error) => {
                if handle.is_committed() {
                    tracing::error!(route = %route, "Raw response failed after streaming started: {:#} | {:?}", error, error);
                    metrics::record_handler_failure(&route);
                }
                handle.fail(error).await;
            }
        }
    });

    match head.await {
        Ok(Ok(head)) => head.into_response(),
        Ok(Err(error)) => {
            tracing::error!(
                route = endpoint.path(),
                handler = endpoint.name(),
                "An uncaught error was thrown in the raw response of the {} method: {:#} | {:?}",
                endpoint.name(),
                error,
                error
            );
            metrics::record_handler_failure(endpoint.path());
            write_data(endpoint, DataResponse::internal_error(format!("{:#}", error)))
        }
        Err(_) => {
            tracing::error!(route = endpoint.path(), "Raw response task ended without a response");
            write_data(endpoint, DataResponse::internal_error("response stream closed without a response"))
        }
    }
}

fn flatten<T>(outcome: Result<anyhow::Result<T>, Box<dyn Any + Send>>) -> anyhow::Result<T> {
    match outcome {
        Ok(result) => result,
        Err(panic) => Err(anyhow::anyhow!("panicked: {}", panic_message(panic.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}
