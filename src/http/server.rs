//! HTTP server setup and the proxy handler.
//!
//! # Responsibilities
//! - Create the Axum router with the proxy and health routes
//! - Wire up middleware (tracing, request ID, outer timeout)
//! - Decompose inbound requests and run the pipeline
//! - Compose the final response (rate-limit headers on every reply)

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{any, get};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::gateway::{Gateway, ProxyRequest};
use crate::http::{request, response};

/// Slack added to the outer request timeout so it never undercuts the
/// forwarder's own upstream bound.
const TIMEOUT_SLACK_SECS: u64 = 5;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub max_body_size: usize,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server around a constructed pipeline.
    pub fn new(config: &GatewayConfig, gateway: Arc<Gateway>) -> Self {
        let state = AppState {
            gateway,
            max_body_size: config.upstream.max_body_size,
        };

        let router = Router::new()
            .route("/proxy/{target}/{*path}", any(proxy_path_handler))
            .route("/proxy/{target}", any(proxy_root_handler))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.upstream.timeout_secs + TIMEOUT_SLACK_SECS,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http());

        Self { router }
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            tracing::error!(error = %e, "failed to install Ctrl+C handler");
                        }
                    }
                    _ = shutdown.recv() => {}
                }
                tracing::info!("shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn proxy_path_handler(
    State(state): State<AppState>,
    Path((target, path)): Path<(String, String)>,
    request: Request,
) -> Response {
    proxy(state, target, path, request).await
}

async fn proxy_root_handler(
    State(state): State<AppState>,
    Path(target): Path<String>,
    request: Request,
) -> Response {
    proxy(state, target, String::new(), request).await
}

/// Decompose the inbound request, run the pipeline, compose the reply.
async fn proxy(state: AppState, target_id: String, path: String, inbound: Request) -> Response {
    let (parts, body) = inbound.into_parts();

    let credential = request::extract_credential(&parts.headers);
    let country = request::extract_country(&parts.headers);
    let query = parts.uri.query().map(str::to_string);

    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(_) => {
            let mut reply = (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(serde_json::json!({
                    "error": "request body too large",
                    "details": [format!("limit: {} bytes", state.max_body_size)],
                })),
            )
                .into_response();
            response::attach_rate_limit_headers(
                &mut reply,
                &state.gateway.untouched_rate_limit(),
            );
            return reply;
        }
    };

    let outcome = state
        .gateway
        .handle(
            credential,
            ProxyRequest {
                target_id,
                path,
                query,
                method: parts.method,
                headers: parts.headers,
                body,
                country,
            },
        )
        .await;

    response::compose(outcome.result, &outcome.rate_limit)
}
