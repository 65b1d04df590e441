//! Tag value sanitization
//!
//! Long values (document ids, query statements) are bounded before they are
//! attached to a span so the span payload stays small. Truncation shape is
//! load-bearing: downstream consumers key off the 512 + "..." format.

use std::borrow::Cow;

/// Maximum number of characters kept from an oversized tag value
pub const MAX_TAG_LEN: usize = 512;

/// Suffix appended to a truncated value
pub const ELLIPSIS: &str = "...";

/// Truncate a tag value to at most [`MAX_TAG_LEN`] characters.
///
/// Values at or under the limit are returned unchanged (borrowed). Oversized
/// values keep their first 512 characters and gain a 3-character ellipsis,
/// giving a fixed result length of 515. Counting is per `char`, not per byte,
/// so multi-byte input never splits mid-character.
pub fn truncate(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(MAX_TAG_LEN) {
        None => Cow::Borrowed(text),
        Some((byte_idx, _)) => {
            let mut out = String::with_capacity(byte_idx + ELLIPSIS.len());
            out.push_str(&text[..byte_idx]);
            out.push_str(ELLIPSIS);
            Cow::Owned(out)
        }
    }
}

/// Map absent or empty input to `None`.
///
/// Tagging helpers treat missing optional metadata as "unknown", never as an
/// error; this is the single place that decides what counts as missing.
#[inline]
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_input_unchanged() {
        assert_eq!(truncate("get"), "get");
        assert_eq!(truncate(""), "");
        let exactly_max: String = "x".repeat(MAX_TAG_LEN);
        assert_eq!(truncate(&exactly_max), exactly_max);
        assert!(matches!(truncate(&exactly_max), Cow::Borrowed(_)));
    }

    #[test]
    fn test_oversized_input_truncated() {
        let long: String = "a".repeat(600);
        let out = truncate(&long);
        assert_eq!(out.chars().count(), MAX_TAG_LEN + ELLIPSIS.len());
        assert!(out.starts_with(&"a".repeat(MAX_TAG_LEN)));
        assert!(out.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_truncate_is_idempotent() {
        let long: String = "b".repeat(1000);
        let once = truncate(&long).into_owned();
        let twice = truncate(&once).into_owned();
        assert_eq!(once, twice);

        let short = "small";
        assert_eq!(truncate(truncate(short).as_ref()), short);
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        // 600 three-byte chars; a byte-based cut would split mid-character
        let long: String = "\u{20AC}".repeat(600);
        let out = truncate(&long);
        assert_eq!(out.chars().count(), MAX_TAG_LEN + ELLIPSIS.len());
        assert!(out.starts_with('\u{20AC}'));
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("bucket")), Some("bucket"));
        assert_eq!(non_empty(Some("")), None);
        assert_eq!(non_empty(None), None);
    }
}
