//! Source-image URL repair.

/// Storage backend whose signed object URLs come back truncated.
const BROKEN_URL_MARKER: &str = "https://storage.googleapis.com/livepeer-ai-video-dev";

/// Proxy that re-derives the full object URL.
const REPAIR_PROXY: &str = "https://dca-fix-images.livepeer.fun/?image=";

/// Rewrite image URLs from the storage backend that truncates them.
///
/// Anything else passes through untouched.
pub fn repair_image_url(url: &str) -> String {
    if url.contains(BROKEN_URL_MARKER) {
        format!("{REPAIR_PROXY}{url}")
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broken_url_is_proxied() {
        let url = "https://storage.googleapis.com/livepeer-ai-video-dev/abc.png";
        let fixed = repair_image_url(url);
        assert!(fixed.starts_with(REPAIR_PROXY));
        assert!(fixed.ends_with(url));
    }

    #[test]
    fn test_other_urls_pass_through() {
        let url = "https://example.com/image.png";
        assert_eq!(repair_image_url(url), url);
    }
}
