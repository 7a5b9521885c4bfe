//! Preview identifiers: `<username>_<epochMillis>_<suffix>`.

use rand::distr::Alphanumeric;
use rand::Rng;

use crate::preview::PREVIEW_ID_SUFFIX_LEN;

/// Generates an unlisted preview id for `username` at `now_ms`.
///
/// Hard to enumerate but not a secret: previews must only ever carry
/// theme and layout settings.
pub fn generate_preview_id(username: &str, now_ms: u64) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(PREVIEW_ID_SUFFIX_LEN)
        .map(char::from)
        .collect();

    format!("{username}_{now_ms}_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_format() {
        let id = generate_preview_id("bob", 1_700_000_000_123);
        let suffix = id.strip_prefix("bob_1700000000123_").unwrap();

        assert_eq!(suffix.len(), PREVIEW_ID_SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_username_with_underscores_is_kept_verbatim() {
        let id = generate_preview_id("jane_doe", 5);
        assert!(id.starts_with("jane_doe_5_"));
    }

    #[test]
    fn test_ids_differ_within_same_millisecond() {
        let a = generate_preview_id("bob", 42);
        let b = generate_preview_id("bob", 42);
        assert_ne!(a, b);
    }
}
