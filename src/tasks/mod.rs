//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expiry cleanup: purges expired cache entries and sweeps expired previews

mod cleanup;

pub use cleanup::spawn_cleanup_task;
