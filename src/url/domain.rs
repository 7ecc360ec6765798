use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host, it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use seo_ripple::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Strips a leading "www." from a host
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Compares the hosts of two URLs, treating "www." as interchangeable with the bare host
///
/// Scheme and port are ignored.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use seo_ripple::url::same_site;
///
/// let a = Url::parse("https://example.com/").unwrap();
/// let b = Url::parse("http://www.example.com/about").unwrap();
/// assert!(same_site(&a, &b));
/// ```
pub fn same_site(a: &Url, b: &Url) -> bool {
    match (extract_domain(a), extract_domain(b)) {
        (Some(a), Some(b)) => strip_www(&a) == strip_www(&b),
        _ => false,
    }
}
