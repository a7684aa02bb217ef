//! Lifecycle management subsystem.
//!
//! Startup order is config → stores → gateway → listener; shutdown stops
//! accepting, lets in-flight forwards finish (usage accounting stays
//! accurate), then exits.

pub mod shutdown;

pub use shutdown::Shutdown;
