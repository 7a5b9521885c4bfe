//! Preview Module
//!
//! Short-lived, unauthenticated store bridging the preview settings writer
//! and the preview renderer through a generated, unlisted identifier.
//! Previews live only in this process and do not survive a restart.

mod id;
mod store;

pub use id::generate_preview_id;
pub use store::{PreviewEntry, PreviewSettings, PreviewStore};

// == Public Constants ==
/// Fixed preview lifetime (30 minutes)
pub const PREVIEW_TTL_SECS: u64 = 30 * 60;

/// Length of the random suffix of a preview id
pub const PREVIEW_ID_SUFFIX_LEN: usize = 12;
