//! Utilities for deriving object keys from uploaded file names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Fallback name for uploads whose file name sanitizes to nothing.
const FALLBACK_FILE_NAME: &str = "upload";

/// Upload timestamps are unix milliseconds; shorter digit runs are part of
/// the user's file name.
const MIN_TIMESTAMP_DIGITS: usize = 10;

/// How uploaded files are keyed inside the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyScheme {
    /// `public/<sanitized-file-name>`; re-uploading a name collides at the store.
    Public,
    /// `<unix-millis>_<sanitized-file-name>`.
    #[default]
    Timestamped,
}

impl FromStr for KeyScheme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "timestamped" | "timestamp" => Ok(Self::Timestamped),
            other => Err(format!(
                "unknown key scheme '{}'; expected 'public' or 'timestamped'",
                other
            )),
        }
    }
}

/// Reduce a client-supplied file name to a safe single path segment.
///
/// Keeps only the final path component, maps anything outside
/// `[A-Za-z0-9._-]` to `_`, collapses `_` runs and strips leading dots and
/// underscores.
///
/// # Returns
/// The sanitized name, or `"upload"` when nothing usable remains.
pub fn sanitize_file_name(name: &str) -> String {
    let last = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let mut sanitized = String::with_capacity(last.len());
    for ch in last.chars() {
        let mapped = if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
            ch
        } else {
            '_'
        };
        if mapped == '_' && sanitized.ends_with('_') {
            continue;
        }
        sanitized.push(mapped);
    }
    let trimmed = sanitized.trim_start_matches(['.', '_']);
    if trimmed.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Build the bucket key for an upload.
///
/// # Arguments
/// - `scheme`: Key layout.
/// - `file_name`: Client-supplied file name (sanitized here).
/// - `now`: Upload time used by [`KeyScheme::Timestamped`].
pub fn object_key(scheme: KeyScheme, file_name: &str, now: DateTime<Utc>) -> String {
    let sanitized = sanitize_file_name(file_name);
    match scheme {
        KeyScheme::Public => format!("public/{}", sanitized),
        KeyScheme::Timestamped => format!("{}_{}", now.timestamp_millis(), sanitized),
    }
}

/// Recover the sanitized upload file name from a stored image URL.
///
/// Takes the last path segment (query and fragment dropped) and
/// percent-decodes it. Under [`KeyScheme::Timestamped`] a `<unix-millis>_`
/// prefix is stripped; under [`KeyScheme::Public`] leading digits belong to
/// the uploaded name and are kept.
pub fn stored_file_name(image_url: &str, scheme: KeyScheme) -> String {
    let without_suffix = image_url
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    let segment = without_suffix.rsplit('/').next().unwrap_or_default();
    let decoded = urlencoding::decode(segment)
        .map(|value| value.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    match scheme {
        KeyScheme::Public => decoded,
        KeyScheme::Timestamped => strip_timestamp_prefix(&decoded).to_string(),
    }
}

fn strip_timestamp_prefix(name: &str) -> &str {
    let digits = name.bytes().take_while(u8::is_ascii_digit).count();
    if digits < MIN_TIMESTAMP_DIGITS {
        return name;
    }
    match name[digits..].strip_prefix('_') {
        Some(rest) if !rest.is_empty() => rest,
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sanitize_file_name_matrix() {
        let cases = [
            ("cat.png", "cat.png"),
            ("my cat (1).png", "my_cat_1_.png"),
            ("../../etc/passwd", "passwd"),
            ("C:\\Users\\me\\dog.jpg", "dog.jpg"),
            (".hidden.png", "hidden.png"),
            ("über.png", "ber.png"),
            ("   ", "upload"),
            ("///", "upload"),
        ];
        for (input, expected) in cases {
            assert_eq!(sanitize_file_name(input), expected, "input: {}", input);
        }
    }

    #[test]
    fn object_key_follows_scheme() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            object_key(KeyScheme::Public, "cat.png", now),
            "public/cat.png"
        );
        assert_eq!(
            object_key(KeyScheme::Timestamped, "my cat.png", now),
            "1700000000123_my_cat.png"
        );
    }

    #[test]
    fn stored_file_name_strips_timestamp_prefix_and_query() {
        let cases = [
            (
                "https://x.co/storage/v1/object/public/images/1700000000123_cat.png",
                "cat.png",
            ),
            (
                "https://x.co/storage/v1/object/public/images/public/cat.png?download=1",
                "cat.png",
            ),
            ("https://x.co/images/2024_report.png", "2024_report.png"),
            ("https://x.co/images/my%20cat.png", "my cat.png"),
            ("https://x.co/images/1700000000123_", "1700000000123_"),
        ];
        for (url, expected) in cases {
            assert_eq!(
                stored_file_name(url, KeyScheme::Timestamped),
                expected,
                "url: {}",
                url
            );
        }
    }

    #[test]
    fn stored_file_name_keeps_digit_prefix_for_public_keys() {
        let url = "https://x.co/storage/v1/object/public/images/public/2024010112_x.png";
        assert_eq!(stored_file_name(url, KeyScheme::Public), "2024010112_x.png");
        assert_eq!(stored_file_name(url, KeyScheme::Timestamped), "x.png");
    }

    #[test]
    fn key_scheme_parses_known_values() {
        assert_eq!("public".parse::<KeyScheme>(), Ok(KeyScheme::Public));
        assert_eq!(" Timestamp ".parse::<KeyScheme>(), Ok(KeyScheme::Timestamped));
        assert!("random".parse::<KeyScheme>().is_err());
    }
}
