//! Ordered store of endpoint descriptors.
//!
//! Append-only while the server is being built, read-only afterwards.
//! Identical `(method, path)` pairs are kept as-is; the router decides
//! what happens when both are attached.

use std::future::Future;

use crate::http::{EndpointRequest, EndpointResponse};
use crate::routing::endpoint::HandlerResult;
use crate::routing::{Endpoint, HttpMethod, RouteError};

#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    endpoints: Vec<Endpoint>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an endpoint named after its handler.
    pub fn add_endpoint<F, Fut, R>(&mut self, path: &str, method: HttpMethod, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(EndpointRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<R>> + Send + 'static,
        R: Into<EndpointResponse>,
    {
        let endpoint = Endpoint::new(path, method, handler)?;
        Ok(self.push(endpoint))
    }

    /// Append an endpoint under an explicit identity.
    pub fn add_named_endpoint<F, Fut, R>(
        &mut self,
        name: &str,
        path: &str,
        method: HttpMethod,
        handler: F,
    ) -> Result<&mut Self, RouteError>
    where
        F: Fn(EndpointRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<R>> + Send + 'static,
        R: Into<EndpointResponse>,
    {
        let endpoint = Endpoint::named(name, path, method, handler)?;
        Ok(self.push(endpoint))
    }

    pub fn push(&mut self, endpoint: Endpoint) -> &mut Self {
        tracing::debug!(
            method = %endpoint.method(),
            path = endpoint.path(),
            name = endpoint.name(),
            "Endpoint registered"
        );
        self.endpoints.push(endpoint);
        self
    }

    /// All endpoints in declaration order.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// First endpoint declared under the given identity.
    pub fn find(&self, name: &str) -> Result<&Endpoint, RouteError> {
        self.endpoints
            .iter()
            .find(|e| e.answers_to(name))
            .ok_or_else(|| RouteError::NoMethodFound(name.to_string()))
    }
}

impl Extend<Endpoint> for EndpointRegistry {
    fn extend<I: IntoIterator<Item = Endpoint>>(&mut self, iter: I) {
        for endpoint in iter {
            self.push(endpoint);
        }
    }
}

impl<'a> IntoIterator for &'a EndpointRegistry {
    type Item = &'a Endpoint;
    type IntoIter = std::slice::Iter<'a, Endpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.endpoints.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::DataResponse;

    async fn health(_req: EndpointRequest) -> HandlerResult<DataResponse> {
        Ok(DataResponse::ok())
    }

    async fn version(_req: EndpointRequest) -> HandlerResult<DataResponse> {
        Ok(DataResponse::ok().with_message("0.1.0"))
    }

    #[test]
    fn test_endpoints_keep_declaration_order_and_duplicates() {
        let mut registry = EndpointRegistry::new();
        registry
            .add_endpoint("/health", HttpMethod::Get, health)
            .unwrap()
            .add_endpoint("/version", HttpMethod::Get, version)
            .unwrap()
            .add_endpoint("/health", HttpMethod::Get, health)
            .unwrap();

        let paths: Vec<_> = registry.iter().map(|e| e.path()).collect();
        assert_eq!(paths, ["/health", "/version", "/health"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_invalid_path_leaves_registry_untouched() {
        let mut registry = EndpointRegistry::new();
        let err = registry.add_endpoint("health", HttpMethod::Get, health).unwrap_err();
        assert_eq!(err, RouteError::InvalidRoutePath("health".into()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_find_by_identity() {
        let mut registry = EndpointRegistry::new();
        registry.add_endpoint("/version", HttpMethod::Get, version).unwrap();
        registry.add_named_endpoint("status", "/status", HttpMethod::Head, health).unwrap();

        assert_eq!(registry.find("version").unwrap().path(), "/version");
        assert_eq!(registry.find("status").unwrap().method(), HttpMethod::Head);
        assert_eq!(registry.find("missing").unwrap_err(), RouteError::NoMethodFound("missing".into()));
    }
}
