//! Configuration validation.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

/// A single validation failure with enough context to fix the file.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn err(field: &str, message: &str) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Validate a loaded configuration, collecting every problem rather than
/// stopping at the first.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(err(
            "listener.bind_address",
            "must be a socket address like 0.0.0.0:8080",
        ));
    }
    if config.upstream.timeout_secs == 0 {
        errors.push(err("upstream.timeout_secs", "must be greater than zero"));
    }
    if config.upstream.max_body_size == 0 {
        errors.push(err("upstream.max_body_size", "must be greater than zero"));
    }
    if config.rate_limit.window_secs == 0 {
        errors.push(err("rate_limit.window_secs", "must be greater than zero"));
    }
    if config.rate_limit.default_ceiling == 0 {
        errors.push(err("rate_limit.default_ceiling", "must be greater than zero"));
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(err(
            "observability.metrics_address",
            "must be a socket address like 0.0.0.0:9090",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
