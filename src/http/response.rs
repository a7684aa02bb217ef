//! Response composition.
//!
//! Merges the upstream response (or a gateway error) into the final reply,
//! always attaching the rate-limit headers so callers can self-throttle.
//! Upstream headers pass through a deny list so hop-by-hop fields and
//! credential material never reach the caller.

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::SecondsFormat;

use crate::error::GatewayError;
use crate::gateway::{RateLimitStatus, UpstreamResponse};

pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Upstream response headers never relayed to the caller: hop-by-hop
/// fields, recomputed framing, and anything credential-shaped the upstream
/// might echo back.
const DENIED_RESPONSE_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "transfer-encoding",
    "upgrade",
    "trailer",
    "content-length",
    "authorization",
    "x-api-key",
];

/// Build the final response for the original caller.
pub fn compose(
    result: Result<UpstreamResponse, GatewayError>,
    rate_limit: &RateLimitStatus,
) -> Response {
    let mut response = match result {
        Ok(upstream) => {
            let mut response = Response::new(Body::from(upstream.body));
            *response.status_mut() =
                StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
            let headers = response.headers_mut();
            for (name, value) in &upstream.headers {
                if !DENIED_RESPONSE_HEADERS.contains(&name.as_str()) {
                    headers.append(name.clone(), value.clone());
                }
            }
            response
        }
        Err(error) => error.into_response(),
    };

    attach_rate_limit_headers(&mut response, rate_limit);
    response
}

/// Attach `X-RateLimit-Limit`, `X-RateLimit-Remaining` (never negative),
/// and `X-RateLimit-Reset` (ISO-8601) to a response.
pub fn attach_rate_limit_headers(response: &mut Response, rate_limit: &RateLimitStatus) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&rate_limit.limit.to_string()) {
        headers.insert(RATE_LIMIT_LIMIT, value);
    }
    if let Ok(value) = HeaderValue::from_str(&rate_limit.remaining.to_string()) {
        headers.insert(RATE_LIMIT_REMAINING, value);
    }
    let reset = rate_limit.reset.to_rfc3339_opts(SecondsFormat::Secs, true);
    if let Ok(value) = HeaderValue::from_str(&reset) {
        headers.insert(RATE_LIMIT_RESET, value);
    }
}
