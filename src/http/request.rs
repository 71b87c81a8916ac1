//! Request handling.
//!
//! # Responsibilities
//! - Assign a unique request ID (UUID v4) as early as possible
//! - Hand handlers a fully read request: parts, path parameters, body
//!
//! # Design Decisions
//! - The body is buffered up to the configured limit before the handler runs
//! - An existing `x-request-id` from the client is kept, not replaced

use std::str::Utf8Error;

use axum::body::{Body, Bytes};
use axum::extract::rejection::RawPathParamsRejection;
use axum::extract::{FromRequestParts, Query, RawPathParams};
use axum::http::{request::Parts, Extensions, HeaderMap, HeaderValue, Method, Request, Uri};
use serde::de::DeserializeOwned;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use uuid::Uuid;

use crate::http::DataResponse;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates `x-request-id` values from random UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Layer assigning request IDs to requests that arrive without one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer copying the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// The request object passed to endpoint handlers.
#[derive(Debug)]
pub struct EndpointRequest {
    parts: Parts,
    params: Vec<(String, String)>,
    body: Bytes,
}

impl EndpointRequest {
    pub fn new(parts: Parts, params: Vec<(String, String)>, body: Bytes) -> Self {
        Self { parts, params, body }
    }

    /// Read an incoming request: path parameters first, then the body up to
    /// `body_limit` bytes. Failures become `400` data responses.
    pub async fn from_request(request: Request<Body>, body_limit: usize) -> Result<Self, DataResponse> {
        let (mut parts, body) = request.into_parts();

        let params = match RawPathParams::from_request_parts(&mut parts, &()).await {
            Ok(raw) => raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            // not routed through a path with parameters
            Err(RawPathParamsRejection::MissingPathParams(_)) => Vec::new(),
            Err(rejection) => {
                return Err(DataResponse::new(400).with_message(format!("BAD_REQUEST: {}", rejection.body_text())));
            }
        };

        let body = axum::body::to_bytes(body, body_limit).await.map_err(|e| {
            DataResponse::new(400).with_message(format!("BAD_REQUEST: failed to read request body: {}", e))
        })?;

        Ok(Self::new(parts, params, body))
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Header value as text; `None` when absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    pub fn request_id(&self) -> Option<&str> {
        self.header(X_REQUEST_ID)
    }

    /// Value of a path parameter (`/person/{id}` → `param("id")`).
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Deserialize the query string.
    pub fn query<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let Query(query) = Query::<T>::try_from_uri(&self.parts.uri)?;
        Ok(query)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.body)
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}
