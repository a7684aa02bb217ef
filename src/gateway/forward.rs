//! Outbound request construction and dispatch.
//!
//! Builds `base_url + path + query`, copies inbound headers through an
//! explicit deny list, substitutes the outbound authentication header with
//! the target-held credential, and issues exactly one call with a bounded
//! timeout. All upstream status codes are valid outcomes; only a
//! connection-level failure (network error, timeout, DNS) is an error here.
//! Retries are a caller concern and never happen automatically.

use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use bytes::Bytes;

use crate::error::GatewayError;
use crate::store::TargetApi;

/// Headers never copied from the inbound request to the upstream one:
/// hop-by-hop headers plus inbound credential material. The outbound client
/// computes its own host and content-length.
const DENIED_REQUEST_HEADERS: &[&str] = &[
    "host",
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
    "authorization",
    "x-api-key",
];

static OUTBOUND_AUTH_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// Copy inbound headers, dropping hop-by-hop headers and the caller's
/// credentials. The gateway credential must never travel further than the
/// resolver, and the upstream credential is attached separately.
pub fn forwardable_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if !DENIED_REQUEST_HEADERS.contains(&name.as_str()) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

/// Whether a method carries a request body worth forwarding.
pub fn carries_body(method: &Method) -> bool {
    method == Method::POST
        || method == Method::PUT
        || method == Method::PATCH
        || method == Method::DELETE
}

/// Join base URL, remaining path, and original query string.
pub fn build_url(base_url: &str, path: &str, query: Option<&str>) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    match query {
        Some(q) if !q.is_empty() => format!("{base}/{path}?{q}"),
        _ => format!("{base}/{path}"),
    }
}

/// A completed upstream exchange, whatever the status code.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Issues outbound requests against registered targets.
pub struct UpstreamForwarder {
    client: reqwest::Client,
    timeout: Duration,
}

impl UpstreamForwarder {
    pub fn new(timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| GatewayError::Internal(format!("outbound client init failed: {e}")))?;
        Ok(Self { client, timeout })
    }

    /// The per-call upper bound enforced on every outbound request,
    /// independent of caller cancellation.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue exactly one outbound call and buffer the response.
    pub async fn forward(
        &self,
        target: &TargetApi,
        method: Method,
        path: &str,
        query: Option<&str>,
        inbound_headers: &HeaderMap,
        body: Bytes,
    ) -> Result<UpstreamResponse, GatewayError> {
        let url = build_url(&target.base_url, path, query);

        let mut headers = forwardable_headers(inbound_headers);
        if let Some(credential) = &target.upstream_api_key {
            match HeaderValue::from_str(credential) {
                Ok(value) => {
                    headers.insert(OUTBOUND_AUTH_HEADER.clone(), value);
                }
                Err(_) => {
                    return Err(GatewayError::Internal(format!(
                        "upstream credential for target {} is not a valid header value",
                        target.id
                    )));
                }
            }
        }

        let mut request = self
            .client
            .request(method.clone(), url.as_str())
            .headers(headers)
            .timeout(self.timeout);
        if carries_body(&method) && !body.is_empty() {
            request = request.body(body);
        }

        tracing::debug!(target = %target.id, %method, %url, "forwarding to upstream");

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                return Err(GatewayError::UpstreamUnavailable {
                    url,
                    timed_out: e.is_timeout(),
                    detail: e.to_string(),
                });
            }
        };

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        // Body read failures (including mid-stream timeouts) are still
        // connection-level failures of this one attempt.
        match response.bytes().await {
            Ok(body) => Ok(UpstreamResponse { status, headers, body }),
            Err(e) => Err(GatewayError::UpstreamUnavailable {
                url,
                timed_out: e.is_timeout(),
                detail: e.to_string(),
            }),
        }
    }
}
