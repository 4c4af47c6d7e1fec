//! Canonical match predicates for text and image-name lookups.
//!
//! Backends are free to over-approximate (a pattern operator may match more
//! rows than intended); the client re-applies these predicates to every row
//! a backend returns.

use crate::MatchMode;

/// Whole-string text comparison under `mode`.
///
/// # Returns
/// `true` when `stored` equals `query` exactly, or after Unicode lowercase
/// folding for [`MatchMode::CaseInsensitive`].
pub fn text_matches(mode: MatchMode, stored: &str, query: &str) -> bool {
    match mode {
        MatchMode::Exact => stored == query,
        MatchMode::CaseInsensitive => {
            stored == query || stored.to_lowercase() == query.to_lowercase()
        }
    }
}

/// Loose image lookup: `fragment` anywhere inside the stored URL.
pub fn image_name_matches(image_url: &str, fragment: &str) -> bool {
    image_url.contains(fragment)
}

/// Escape SQL `LIKE` metacharacters so a pattern operator compares the whole
/// string literally.
pub fn escape_like_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_case_insensitive_disagree_on_case() {
        assert!(text_matches(MatchMode::CaseInsensitive, "Hello World", "hello world"));
        assert!(!text_matches(MatchMode::Exact, "Hello World", "hello world"));
        assert!(text_matches(MatchMode::Exact, "Hello World", "Hello World"));
    }

    #[test]
    fn matchers_are_whole_string() {
        for mode in [MatchMode::Exact, MatchMode::CaseInsensitive] {
            assert!(!text_matches(mode, "a cat", "cat"), "mode: {}", mode);
            assert!(!text_matches(mode, "cat", "a cat"), "mode: {}", mode);
            assert!(!text_matches(mode, "a cat", "a%"), "mode: {}", mode);
        }
        assert!(text_matches(MatchMode::CaseInsensitive, "ÜBER", "über"));
    }

    #[test]
    fn image_name_match_is_substring() {
        let url = "https://x.co/storage/v1/object/public/images/1700000000123_cat.png";
        assert!(image_name_matches(url, "cat.png"));
        assert!(image_name_matches(url, "at.p"));
        assert!(!image_name_matches(url, "dog.png"));
    }

    #[test]
    fn escape_like_pattern_escapes_metacharacters() {
        assert_eq!(escape_like_pattern("100%_done\\"), "100\\%\\_done\\\\");
        assert_eq!(escape_like_pattern("plain"), "plain");
    }
}
