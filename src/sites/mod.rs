//! Sites Module
//!
//! Cached reads of user and page documents for public site rendering, and
//! owner-only writes that keep the cache consistent with the document store.

mod service;

pub use service::SiteService;
