//! HTML parser for extracting SEO structure
//!
//! This module turns a page body into the SEO fields of a `PageResult`:
//! - Title, meta description, canonical URL
//! - Meta robots directives and document language
//! - Headings H1 through H6
//! - Internal and external links
//! - Images with their alt text
//!
//! Parsing is pure: no network access and no shared state.

use crate::page::{Headings, ImageRef};
use crate::url::{resolve_link, same_site};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

/// Bytes inspected when deciding whether a body is markup at all
const BINARY_SNIFF_LEN: usize = 1024;

/// Extraction errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("Body is binary data, not markup")]
    Binary,
}

/// SEO fields extracted from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// Trimmed text of the first <title>, empty when absent
    pub title: String,

    pub meta_description: String,

    /// Raw href of <link rel="canonical">, empty when absent
    pub canonical_url: String,

    pub meta_robots: Option<String>,

    /// Value of <html lang>
    pub lang: Option<String>,

    pub headings: Headings,

    /// Links to the page's own host (www-insensitive), absolute and normalized
    pub internal_links: Vec<String>,

    /// Links to any other host
    pub external_links: Vec<String>,

    pub images: Vec<ImageRef>,
}

/// Parses an HTML body and extracts its SEO structure
///
/// # Link Extraction Rules
///
/// - Every `<a href>` is resolved against the page URL and normalized
/// - Non-HTTP(S) targets (`javascript:`, `mailto:`, `tel:`, `data:`) are dropped
/// - Links are deduplicated within the page, keeping first-seen order
/// - `rel="nofollow"` links are kept
///
/// # Arguments
///
/// * `html` - The raw response body
/// * `base_url` - The URL of the page, used for resolving relative links
///
/// # Returns
///
/// * `Ok(ParsedPage)` - Successfully parsed page
/// * `Err(ParseError)` - The base URL is invalid or the body is not markup
///
/// # Example
///
/// ```
/// use seo_ripple::crawler::parse_page;
///
/// let html = br#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let parsed = parse_page(html, "https://example.com/").unwrap();
/// assert_eq!(parsed.title, "Test");
/// assert_eq!(parsed.internal_links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_page(html: &[u8], base_url: &str) -> Result<ParsedPage, ParseError> {
    let base = Url::parse(base_url).map_err(|_| ParseError::InvalidBaseUrl(base_url.to_string()))?;

    let sniff = &html[..html.len().min(BINARY_SNIFF_LEN)];
    if sniff.contains(&0) {
        return Err(ParseError::Binary);
    }

    let text = String::from_utf8_lossy(html);
    let document = Html::parse_document(&text);

    let (internal_links, external_links) = extract_links(&document, &base);

    Ok(ParsedPage {
        title: extract_title(&document),
        meta_description: meta_content(&document, "description").unwrap_or_default(),
        canonical_url: extract_canonical(&document),
        meta_robots: meta_content(&document, "robots"),
        lang: extract_lang(&document),
        headings: extract_headings(&document),
        internal_links,
        external_links,
        images: extract_images(&document, &base),
    })
}

fn extract_title(document: &Html) -> String {
    let Ok(title_selector) = Selector::parse("title") else {
        return String::new();
    };

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Returns the trimmed content of the first `<meta name=...>` with the given name
fn meta_content(document: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse("meta[name]").ok()?;

    document
        .select(&selector)
        .find(|element| {
            element
                .value()
                .attr("name")
                .is_some_and(|n| n.trim().eq_ignore_ascii_case(name))
        })
        .map(|element| {
            element
                .value()
                .attr("content")
                .unwrap_or("")
                .trim()
                .to_string()
        })
}

fn extract_canonical(document: &Html) -> String {
    let Ok(selector) = Selector::parse("link[rel][href]") else {
        return String::new();
    };

    document
        .select(&selector)
        .find(|element| {
            element.value().attr("rel").is_some_and(|rel| {
                rel.split_whitespace()
                    .any(|token| token.eq_ignore_ascii_case("canonical"))
            })
        })
        .and_then(|element| element.value().attr("href"))
        .map(|href| href.trim().to_string())
        .unwrap_or_default()
}

fn extract_lang(document: &Html) -> Option<String> {
    let selector = Selector::parse("html[lang]").ok()?;

    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("lang"))
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
}

fn extract_headings(document: &Html) -> Headings {
    let mut headings = Headings::default();

    for level in 1..=6u8 {
        let Ok(selector) = Selector::parse(&format!("h{}", level)) else {
            continue;
        };
        let Some(slot) = headings.level_mut(level) else {
            continue;
        };

        slot.extend(
            document
                .select(&selector)
                .map(collapsed_text)
                .filter(|text| !text.is_empty()),
        );
    }

    headings
}

/// Concatenated descendant text with whitespace runs collapsed
fn collapsed_text(element: ElementRef<'_>) -> String {
    let raw: String = element.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts all valid links, split into (internal, external)
fn extract_links(document: &Html, base_url: &Url) -> (Vec<String>, Vec<String>) {
    let mut internal = Vec::new();
    let mut external = Vec::new();
    let mut seen = HashSet::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let Some(absolute_url) = resolve_link(href, base_url) else {
                continue;
            };

            let link = absolute_url.to_string();
            if !seen.insert(link.clone()) {
                continue;
            }

            if same_site(base_url, &absolute_url) {
                internal.push(link);
            } else {
                external.push(link);
            }
        }
    }

    (internal, external)
}

fn extract_images(document: &Html, base_url: &Url) -> Vec<ImageRef> {
    let mut images = Vec::new();
    let mut seen = HashSet::new();

    if let Ok(img_selector) = Selector::parse("img[src]") {
        for element in document.select(&img_selector) {
            let Some(src) = element.value().attr("src") else {
                continue;
            };
            let Some(absolute_url) = resolve_link(src, base_url) else {
                continue;
            };

            let url = absolute_url.to_string();
            if !seen.insert(url.clone()) {
                continue;
            }

            images.push(ImageRef {
                url,
                alt: element.value().attr("alt").unwrap_or("").trim().to_string(),
            });
        }
    }

    images
}
