//! Inbound request decomposition.
//!
//! Pulls the pieces the pipeline needs out of the raw request: the
//! presented credential, the best-effort client country, and the query
//! string. The original request is otherwise forwarded verbatim.

use axum::http::{header, HeaderMap};

/// Header carrying the caller's credential.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Best-effort country stamped by the edge (CDN or LB).
pub const GEO_COUNTRY_HEADER: &str = "x-geo-country";

/// Extract the presented credential from `x-api-key` or a bearer token.
/// `x-api-key` wins when both are present.
pub fn extract_credential(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return Some(value.to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Best-effort client country; "unknown" when the edge did not stamp one.
pub fn extract_country(headers: &HeaderMap) -> String {
    headers
        .get(GEO_COUNTRY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("unknown")
        .to_string()
}
