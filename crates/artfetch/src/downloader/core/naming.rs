//! URL rewriting and file naming
//!
//! Everything here is pure string work so the rules can be tested without a
//! server: quality substitution, the cache-defeat token, extension lookup and
//! the base name taken from an asset URL.

use std::path::Path;

use super::ImageQuality;

/// Extensions for the content types the image CDN is known to serve
pub const EXTENSION_BY_CONTENT_TYPE: &[(&str, &str)] = &[
    ("image/avif", ".avif"),
    ("image/bmp", ".bmp"),
    ("image/gif", ".gif"),
    ("image/jpeg", ".jpg"),
    ("image/jpg", ".jpg"),
    ("image/png", ".png"),
    ("image/tiff", ".tiff"),
    ("image/webp", ".webp"),
];

/// Rewrite the `/large/` path segment to the requested tier
///
/// The CDN encodes the resolution as a path component and project JSON always
/// lists the `large` variant. URLs without the segment pass through untouched.
pub fn apply_quality(url: &str, quality: ImageQuality) -> String {
    url.replace("/large/", &format!("/{}/", quality.as_str()))
}

/// Fresh random query token for the cache-defeat parameter
pub fn cache_defeat_token() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// Append an unpredictable bare query key so the edge cache always misses
///
/// A cache hit can return a re-encoded image with stripped colour profiles;
/// a miss returns the original bytes.
pub fn no_cache_url(url: &str) -> String {
    let token = cache_defeat_token();
    if url.contains('?') {
        if url.ends_with('?') || url.ends_with('&') {
            format!("{}{}", url, token)
        } else {
            format!("{}&{}", url, token)
        }
    } else {
        format!("{}?{}", url, token)
    }
}

/// Strip query string and fragment from a URL
fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// Extension for a download, including the leading dot
///
/// The declared content type wins; the URL suffix is only consulted when the
/// header is missing or not in [`EXTENSION_BY_CONTENT_TYPE`]. Returns an empty
/// string when neither yields anything.
pub fn resolve_extension(content_type: Option<&str>, url: &str) -> String {
    let from_header = content_type
        .map(|value| value.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .and_then(|mime| {
            EXTENSION_BY_CONTENT_TYPE
                .iter()
                .find(|(known, _)| *known == mime)
                .map(|(_, ext)| ext.to_string())
        });

    from_header.unwrap_or_else(|| url_extension(url))
}

fn url_extension(url: &str) -> String {
    let path = strip_query(url);
    let basename = path.rsplit('/').next().unwrap_or(path);
    Path::new(basename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

/// File name stem taken from an asset URL
///
/// `https://cdn/p/images/large/001.jpg?17` becomes `001`. Falls back to
/// `image` when the URL has no usable last segment.
pub fn derive_base_name(url: &str) -> String {
    let path = strip_query(url);
    let basename = path.rsplit('/').next().unwrap_or(path);
    Path::new(basename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("image")
        .to_string()
}
