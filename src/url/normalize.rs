use crate::UrlError;
use url::Url;

/// Normalizes a URL according to Seo-Ripple's normalization rules
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not http:// or https://
/// 3. Require a host
/// 4. Remove fragment (everything after #)
/// 5. Remove trailing slash (except for root /)
///
/// Host lowercasing and dot-segment removal are handled by the parser itself.
/// Query strings are kept as-is: two URLs differing only in their query are
/// different pages.
///
/// # Examples
///
/// ```
/// use seo_ripple::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.COM/page/#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Normalizes a user-supplied start URL
///
/// Same as [`normalize_url`], except that a missing scheme defaults to https.
pub fn normalize_start_url(raw: &str) -> Result<Url, UrlError> {
    let trimmed = raw.trim();
    if trimmed.contains("://") {
        normalize_url(trimmed)
    } else {
        normalize_url(&format!("https://{}", trimmed))
    }
}

/// Resolves an href found on a page against that page's URL
///
/// Returns None if the link should be excluded:
/// - empty hrefs
/// - javascript:, mailto:, tel:, data: and any other non-HTTP(S) scheme
/// - hrefs that cannot be resolved
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    let joined = base_url.join(href).ok()?;
    normalize_parsed(joined).ok()
}

fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed };
        let trimmed = trimmed.to_string();
        url.set_path(&trimmed);
    }

    Ok(url)
}
