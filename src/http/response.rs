//! Endpoint responses.
//!
//! # Responsibilities
//! - Model the two response shapes a handler may return
//! - Serialize data responses as `{code, message?, content?}` with `code` as
//!   the HTTP status
//! - Build the uniform `500` payload used by every recovery path
//!
//! # Design Decisions
//! - The response shape is a closed enum; foreign shapes cannot be returned
//! - A `code` outside the HTTP status range is the only invalid return left

use std::fmt;
use std::future::Future;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::stream::ResponseStream;
use crate::routing::RouteError;

/// Structured JSON response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResponse {
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

impl DataResponse {
    pub fn new(code: u16) -> Self {
        Self { code, message: None, content: None }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn created() -> Self {
        Self::new(201)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<Value>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Attach any serializable value as content.
    pub fn serialize_content<T: Serialize>(self, content: &T) -> serde_json::Result<Self> {
        Ok(self.with_content(serde_json::to_value(content)?))
    }

    /// The uniform payload for failures caught at the recovery boundary.
    pub fn internal_error(details: impl fmt::Display) -> Self {
        Self::new(500).with_message(format!("INTERNAL_SERVER_ERROR: {}", details))
    }

    /// Write this response for the route at `path`.
    ///
    /// Fails with [`RouteError::InvalidRouteReturn`] when `code` is not a
    /// valid HTTP status.
    pub fn into_http(self, path: &str) -> Result<Response, RouteError> {
        let status = StatusCode::from_u16(self.code).map_err(|_| RouteError::InvalidRouteReturn {
            path: path.to_string(),
            reason: format!("code {} is not a valid HTTP status", self.code),
        })?;
        Ok((status, Json(self)).into_response())
    }
}

type RawCallback = Box<dyn FnOnce(ResponseStream) -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// Hands the response stream over to the handler.
///
/// The callback sets the status and headers, then writes the body in as many
/// chunks as it likes. Returning an error before anything was written turns
/// the response into a `500` data response.
pub struct RawResponse {
    callback: RawCallback,
}

impl RawResponse {
    pub fn new<F, Fut>(callback: F) -> Self
    where
        F: FnOnce(ResponseStream) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            callback: Box::new(move |stream: ResponseStream| -> BoxFuture<'static, anyhow::Result<()>> {
                Box::pin(callback(stream))
            }),
        }
    }

    pub(crate) fn into_callback(self) -> RawCallback {
        self.callback
    }
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse").finish_non_exhaustive()
    }
}

/// What a handler returns.
#[derive(Debug)]
pub enum EndpointResponse {
    Data(DataResponse),
    Raw(RawResponse),
}

impl From<DataResponse> for EndpointResponse {
    fn from(data: DataResponse) -> Self {
        EndpointResponse::Data(data)
    }
}

impl From<RawResponse> for EndpointResponse {
    fn from(raw: RawResponse) -> Self {
        EndpointResponse::Raw(raw)
    }
}
