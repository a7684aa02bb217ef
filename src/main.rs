//! API Gateway Proxy
//!
//! Authenticates API-key holders, enforces per-key rate limits and
//! per-subscription monthly quotas, forwards requests to registered
//! upstream APIs, and records every forwarded attempt exactly once.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────┐
//!                 │                  API GATEWAY                      │
//!                 │                                                   │
//!  Client ───────▶│  http/server ─▶ Key Resolver ─▶ Rate Limiter     │
//!                 │                      │               │            │
//!                 │                      ▼               ▼            │
//!                 │              Target Lookup ─▶ Quota Enforcer      │
//!                 │                                      │            │
//!                 │                                      ▼            │
//!  Client ◀───────│  Response Composer ◀── Upstream Forwarder ───────┼──▶ Upstream API
//!                 │          ▲                   │                    │
//!                 │          │                   ▼                    │
//!                 │          └────────── Usage Recorder (always)      │
//!                 └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use gateway_proxy::config::{loader, GatewayConfig};
use gateway_proxy::gateway::Gateway;
use gateway_proxy::http::HttpServer;
use gateway_proxy::lifecycle::Shutdown;
use gateway_proxy::observability::{logging, metrics};
use gateway_proxy::store::{MemoryCounterStore, MemoryStore};

#[derive(Debug, Parser)]
#[command(name = "gateway-proxy", about = "API gateway proxy core")]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => loader::load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&format!(
        "gateway_proxy={},tower_http=info",
        config.observability.log_level
    ));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream_timeout_secs = config.upstream.timeout_secs,
        rate_limit_window_secs = config.rate_limit.window_secs,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    // Store handles are acquired once here and injected downward; no
    // component reaches for ambient global state.
    let store = Arc::new(MemoryStore::new());
    let counters = Arc::new(MemoryCounterStore::new());
    let gateway = Arc::new(Gateway::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        counters,
        &config,
    )?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config, gateway);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
