//! Public object URL building and normalization.

const DOUBLED_PUBLIC_SEGMENT: &str = "/public/public/";
const SINGLE_PUBLIC_SEGMENT: &str = "/public/";

/// Collapse doubled `/public/public/` path segments into a single `/public/`.
///
/// Runs until no doubled segment remains, so `normalize(normalize(u)) ==
/// normalize(u)` for every input. No other part of the URL is touched.
///
/// # Returns
/// The normalized URL, or the input unchanged when it has no doubled segment.
pub fn normalize_public_url(url: &str) -> String {
    if !url.contains(DOUBLED_PUBLIC_SEGMENT) {
        return url.to_string();
    }
    let mut normalized = url.to_string();
    while normalized.contains(DOUBLED_PUBLIC_SEGMENT) {
        normalized = normalized.replace(DOUBLED_PUBLIC_SEGMENT, SINGLE_PUBLIC_SEGMENT);
    }
    normalized
}

/// Build the public read URL for an object stored in `bucket`.
///
/// # Arguments
/// - `base`: Hosted service base URL (trailing `/` ignored).
/// - `bucket`: Storage bucket name.
/// - `object_path`: Object path relative to the bucket.
///
/// # Returns
/// `<base>/storage/v1/object/public/<bucket>/<object_path>`, normalized.
pub fn public_object_url(base: &str, bucket: &str, object_path: &str) -> String {
    let base = base.trim_end_matches('/');
    let bucket = bucket.trim_matches('/');
    let object_path = object_path.trim_start_matches('/');
    normalize_public_url(&format!(
        "{}/storage/v1/object/public/{}/{}",
        base, bucket, object_path
    ))
}

#[cfg(test)]
mod tests {
    use super::{normalize_public_url, public_object_url};

    #[test]
    fn normalize_collapses_doubled_public_segment() {
        assert_eq!(
            normalize_public_url("https://x.co/storage/v1/object/public/public/img.png"),
            "https://x.co/storage/v1/object/public/img.png"
        );
    }

    #[test]
    fn normalize_leaves_clean_urls_unchanged() {
        let cases = [
            "https://x.co/storage/v1/object/public/images/public/img.png",
            "https://x.co/public/img.png",
            "",
            "public/public",
            "/publicpublic/",
        ];
        for url in cases {
            assert_eq!(normalize_public_url(url), url, "url: {}", url);
        }
    }

    #[test]
    fn normalize_is_idempotent_for_repeated_segments() {
        let cases = [
            "/public/public/public/a.png",
            "https://x.co/public/public/public/public/b",
            "a/public/public/b/public/public/c",
            "/public/public//public/public/",
        ];
        for url in cases {
            let once = normalize_public_url(url);
            assert!(!once.contains("/public/public/"), "url: {}", url);
            assert_eq!(normalize_public_url(&once), once, "url: {}", url);
        }
    }

    #[test]
    fn public_object_url_joins_parts_without_doubled_slashes() {
        assert_eq!(
            public_object_url("https://x.co/", "images", "/public/cat.png"),
            "https://x.co/storage/v1/object/public/images/public/cat.png"
        );
        assert_eq!(
            public_object_url("https://x.co", "images", "1700000000000_cat.png"),
            "https://x.co/storage/v1/object/public/images/1700000000000_cat.png"
        );
    }
}
