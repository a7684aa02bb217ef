//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use axum::Router;
use chrono::{Duration as ChronoDuration, Utc};
use tokio::net::TcpListener;

use gateway_proxy::config::GatewayConfig;
use gateway_proxy::gateway::auth::hash_credential;
use gateway_proxy::gateway::Gateway;
use gateway_proxy::http::HttpServer;
use gateway_proxy::lifecycle::Shutdown;
use gateway_proxy::store::{
    ApiKey, MemoryCounterStore, MemoryStore, Subscription, TargetApi,
};

/// Start a programmable mock upstream on an ephemeral port.
///
/// The closure sees the full forwarded request, so tests can assert on the
/// headers and body the gateway actually sent.
pub async fn start_upstream<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(Request) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let app = Router::new().fallback(move |request: Request| {
        let f = f.clone();
        async move {
            let (status, body) = f(request).await;
            Response::builder()
                .status(status)
                .body(Body::from(body))
                .unwrap()
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// A running gateway with seedable in-memory stores.
pub struct Harness {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub shutdown: Shutdown,
}

/// Spawn a gateway on an ephemeral port.
pub async fn spawn_gateway(config: GatewayConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let counters = Arc::new(MemoryCounterStore::new());
    let gateway = Arc::new(
        Gateway::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            counters,
            &config,
        )
        .unwrap(),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(&config, gateway);
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    Harness {
        base_url: format!("http://{addr}"),
        store,
        shutdown,
    }
}

pub fn seed_key(store: &MemoryStore, id: &str, secret: &str, principal: &str, ceiling: u32) {
    store.insert_key(ApiKey {
        id: id.into(),
        key_hash: hash_credential(secret),
        principal: principal.into(),
        rate_limit: ceiling,
        active: true,
        expires_at: None,
        last_used: None,
    });
}

pub fn seed_expired_key(store: &MemoryStore, id: &str, secret: &str, principal: &str) {
    store.insert_key(ApiKey {
        id: id.into(),
        key_hash: hash_credential(secret),
        principal: principal.into(),
        rate_limit: 100,
        active: true,
        expires_at: Some(Utc::now() - ChronoDuration::minutes(1)),
        last_used: None,
    });
}

pub fn seed_target(store: &MemoryStore, id: &str, base_url: &str, active: bool) {
    store.insert_target(TargetApi {
        id: id.into(),
        name: format!("{id} upstream"),
        base_url: base_url.into(),
        upstream_api_key: Some(format!("upstream-cred-{id}")),
        active,
    });
}

pub fn seed_subscription(store: &MemoryStore, principal: &str, target: &str, monthly_limit: u64) {
    store.insert_subscription(Subscription {
        principal: principal.into(),
        target: target.into(),
        monthly_limit,
        active: true,
        created_at: Utc::now() - ChronoDuration::days(5),
        expires_at: None,
    });
}

/// Non-pooled client so each test request opens a fresh connection.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
