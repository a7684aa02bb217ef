//! Gateway error taxonomy and HTTP mapping.
//!
//! Every pipeline stage fails with one of these variants; nothing is
//! silently swallowed. Each variant maps to exactly one response status and
//! a structured JSON body with a machine-readable detail list.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced to the caller by the proxy pipeline.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing, invalid, expired, or inactive credential.
    #[error("invalid or expired API key")]
    Unauthorized,

    /// Unknown or inactive target API.
    #[error("API not found or inactive")]
    TargetNotFound(String),

    /// The principal holds no active subscription for the target.
    #[error("no active subscription for this API")]
    NoActiveSubscription { principal: String, target: String },

    /// The subscription's monthly request ceiling is reached.
    #[error("monthly usage limit exceeded")]
    QuotaExceeded { limit: u64, used: u64 },

    /// The per-key fixed-window ceiling is reached.
    #[error("too many requests")]
    RateLimited,

    /// The upstream connection could not be completed at all. Non-2xx
    /// upstream statuses are valid outcomes, not this error.
    #[error("failed to proxy request")]
    UpstreamUnavailable {
        url: String,
        timed_out: bool,
        detail: String,
    },

    /// Counter-store or other infrastructure outage.
    #[error("internal gateway fault")]
    Internal(String),
}

impl GatewayError {
    /// Response status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::TargetNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::NoActiveSubscription { .. } => StatusCode::FORBIDDEN,
            GatewayError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::UpstreamUnavailable { timed_out, .. } => {
                if *timed_out {
                    StatusCode::GATEWAY_TIMEOUT
                } else {
                    StatusCode::BAD_GATEWAY
                }
            }
            GatewayError::Internal(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Machine-readable detail lines for the error body.
    pub fn details(&self) -> Vec<String> {
        match self {
            GatewayError::Unauthorized => {
                vec!["missing, invalid, expired, or inactive API key".into()]
            }
            GatewayError::TargetNotFound(id) => vec![format!("target id: {id}")],
            GatewayError::NoActiveSubscription { principal, target } => vec![
                format!("principal: {principal}"),
                format!("target id: {target}"),
            ],
            GatewayError::QuotaExceeded { limit, used } => {
                vec![format!("limit: {limit}"), format!("used: {used}")]
            }
            GatewayError::RateLimited => vec!["per-key rate limit window exhausted".into()],
            GatewayError::UpstreamUnavailable { url, detail, .. } => {
                vec![detail.clone(), format!("target url: {url}")]
            }
            GatewayError::Internal(msg) => vec![msg.clone()],
        }
    }

    /// Build the structured body returned to the caller.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            details: self.details(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// JSON error body: message plus machine-readable detail list.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: Vec<String>,
    pub timestamp: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = Json(self.to_body()).into_response();
        *response.status_mut() = status;
        response
    }
}
