//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Check addresses and log levels parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::ServerConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("limits.request_timeout_secs must be greater than 0")]
    ZeroTimeout,

    #[error("limits.body_limit_bytes must be greater than 0")]
    ZeroBodyLimit,

    #[error("listener.hostname must not be empty")]
    EmptyHostname,

    #[error("logging.level '{0}' is not a valid filter")]
    InvalidLogLevel(String),

    #[error("logging.file_prefix must not be empty")]
    EmptyFilePrefix,

    #[error("metrics.address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.limits.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.limits.body_limit_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }
    if matches!(config.listener.hostname.as_deref(), Some(h) if h.trim().is_empty()) {
        errors.push(ValidationError::EmptyHostname);
    }
    if EnvFilter::try_new(&config.logging.level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(config.logging.level.clone()));
    }
    if config.logging.directory.is_some() && config.logging.file_prefix.trim().is_empty() {
        errors.push(ValidationError::EmptyFilePrefix);
    }
    if config.metrics.enabled && config.metrics.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(config.metrics.address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn test_all_errors_are_reported() {
        let mut config = ServerConfig::default();
        config.limits.request_timeout_secs = 0;
        config.limits.body_limit_bytes = 0;
        config.metrics.enabled = true;
        config.metrics.address = "nowhere".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::ZeroTimeout,
                ValidationError::ZeroBodyLimit,
                ValidationError::InvalidMetricsAddress("nowhere".to_string()),
            ]
        );
    }

    #[test]
    fn test_log_level_must_parse() {
        let mut config = ServerConfig::default();
        config.logging.level = "waypost=loud".to_string();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::InvalidLogLevel("waypost=loud".to_string())])
        );
    }

    #[test]
    fn test_disabled_metrics_address_is_not_checked() {
        let mut config = ServerConfig::default();
        config.metrics.address = "nowhere".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
