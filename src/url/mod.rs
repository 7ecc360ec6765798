//! URL handling module for Seo-Ripple
//!
//! This module provides URL normalization, link resolution, www-insensitive host
//! comparison, and the domain filter applied to discovered links.

mod domain;
mod normalize;

use url::Url;

// Re-export main functions
pub use domain::{extract_domain, same_site, strip_www};
pub use normalize::{normalize_start_url, normalize_url, resolve_link};

/// File extensions treated as images and never fetched as pages
const IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".bmp", ".ico", ".tif", ".tiff", ".avif",
];

/// Returns true if the URL path ends with a known image extension
///
/// # Examples
///
/// ```
/// use url::Url;
/// use seo_ripple::url::is_image_url;
///
/// assert!(is_image_url(&Url::parse("https://example.com/logo.PNG").unwrap()));
/// assert!(!is_image_url(&Url::parse("https://example.com/about").unwrap()));
/// ```
pub fn is_image_url(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Policy restricting which discovered links may be crawled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainFilter {
    /// Only the start host (www-insensitive)
    Same,
    /// Any host
    Any,
}

impl DomainFilter {
    /// Maps the configured mode string; "same" restricts, anything else does not
    pub fn from_mode(mode: &str) -> Self {
        if mode.trim().eq_ignore_ascii_case("same") {
            Self::Same
        } else {
            Self::Any
        }
    }

    /// Returns true if `candidate` may be crawled in a crawl rooted at `start`
    pub fn allows(&self, start: &Url, candidate: &Url) -> bool {
        match self {
            Self::Same => same_site(start, candidate),
            Self::Any => true,
        }
    }
}
