//! API Gateway Proxy Core
//!
//! Authenticates API-key holders, enforces per-key rate limits and
//! per-subscription monthly quotas, forwards requests to registered upstream
//! APIs, and durably records usage for billing.

pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod store;

pub use config::schema::GatewayConfig;
pub use error::GatewayError;
pub use gateway::Gateway;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
