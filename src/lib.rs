//! Site Cache - process-local data cache and preview store
//!
//! Provides a TTL cache over document store reads with prefix invalidation
//! and fetch coalescing, plus a short-lived preview settings store, served
//! over HTTP for a multi-tenant site platform.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod preview;
pub mod sites;
pub mod tasks;
pub mod upstream;

pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_cleanup_task;
