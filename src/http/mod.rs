//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound connection
//!     → server.rs (Axum setup, routing, middleware)
//!     → request.rs (credential/country/query extraction)
//!     → [gateway pipeline decides and forwards]
//!     → response.rs (merge upstream reply, attach rate-limit headers)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use server::{AppState, HttpServer};
