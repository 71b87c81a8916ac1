//! Route path validation and composition.
//!
//! # Responsibilities
//! - Reject paths that do not start with `/`
//! - Join a controller base path with an endpoint path without doubled or
//!   missing separators
//! - Translate `:name` / `*name` segments into the router's `{name}` syntax
//!
//! Duplicate parameters and conflicting patterns are left to the router.

use crate::routing::RouteError;

/// Fails with [`RouteError::InvalidRoutePath`] unless `path` starts with `/`
/// and every parameter segment can be translated for the router: `:` and
/// `*` need a name, and a `*name` catch-all must be the last segment.
pub fn validate_path(path: &str) -> Result<&str, RouteError> {
    let invalid = || RouteError::InvalidRoutePath(path.to_string());
    if !path.starts_with('/') {
        return Err(invalid());
    }

    let segments: Vec<&str> = path.split('/').collect();
    for (i, segment) in segments.iter().enumerate() {
        if *segment == ":" || *segment == "*" {
            return Err(invalid());
        }
        let is_last = i + 1 == segments.len() || (i + 2 == segments.len() && segments[i + 1].is_empty());
        if segment.starts_with('*') && !is_last {
            return Err(invalid());
        }
    }
    Ok(path)
}

/// Removes a single trailing `/`.
pub fn strip_trailing_slash(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}

/// Joins a controller base path and an endpoint path.
///
/// An empty result (`"/" + "/"`) resolves to the root path.
pub fn compose_path(base: &str, endpoint: &str) -> String {
    let composed = format!("{}{}", strip_trailing_slash(base), strip_trailing_slash(endpoint));
    if composed.is_empty() {
        "/".to_string()
    } else {
        composed
    }
}

/// Rewrites `:name` and `*name` segments into `{name}` and `{*name}`.
pub fn to_router_syntax(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':').filter(|n| !n.is_empty()) {
                format!("{{{}}}", name)
            } else if let Some(name) = segment.strip_prefix('*').filter(|n| !n.is_empty()) {
                format!("{{*{}}}", name)
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Normalizes a middleware scope: validated, trimmed, no trailing `/`.
pub fn normalize_middleware_path(path: &str) -> Result<String, RouteError> {
    let path = validate_path(path)?.trim();
    Ok(strip_trailing_slash(path).to_string())
}

/// Whether `request_path` falls under `scope` on a segment boundary.
pub fn in_scope(scope: &str, request_path: &str) -> bool {
    if scope.is_empty() {
        return true;
    }
    match request_path.strip_prefix(scope) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
