//! Sitemap discovery and parsing
//!
//! Sitemaps are used to seed a crawl. Discovery looks for `Sitemap:` lines in
//! robots.txt and falls back to `/sitemap.xml`. Parsing collects the `<loc>`
//! entries of a `<urlset>`, following the children of a `<sitemapindex>`.

use crate::robots::fetch_robots;
use crate::RippleError;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::borrow::Cow;
use std::collections::{HashSet, VecDeque};
use url::Url;

/// Maximum number of sitemap files read for one crawl, index files included
const MAX_SITEMAP_FILES: usize = 50;

/// Source of seed URLs
#[async_trait]
pub trait SitemapSource: Send + Sync {
    /// Finds the sitemap of the site `base` belongs to
    async fn discover_sitemap_url(&self, base: &Url) -> Result<Url, RippleError>;

    /// Returns every page URL listed by the sitemap
    async fn parse_sitemap(&self, sitemap: &Url) -> Result<Vec<String>, RippleError>;
}

/// What a sitemap file contains
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// A `<urlset>`: page URLs
    UrlSet(Vec<String>),
    /// A `<sitemapindex>`: URLs of further sitemaps
    Index(Vec<String>),
}

/// Parses sitemap XML
///
/// The document goes through the HTML parser, which keeps unknown elements
/// and their nesting, so `<loc>` entries can be selected directly. CDATA
/// sections are turned into escaped text first, since HTML treats them as
/// comments. Namespaced entries such as `<image:loc>` are not matched.
///
/// # Example
///
/// ```
/// use seo_ripple::sitemap::{parse_sitemap_xml, SitemapDocument};
///
/// let xml = r#"<urlset><url><loc> https://example.com/a </loc></url></urlset>"#;
/// assert_eq!(
///     parse_sitemap_xml(xml),
///     SitemapDocument::UrlSet(vec!["https://example.com/a".to_string()])
/// );
/// ```
pub fn parse_sitemap_xml(xml: &str) -> SitemapDocument {
    let document = Html::parse_document(&expand_cdata(xml));

    let mut locs = Vec::new();
    if let Ok(loc_selector) = Selector::parse("loc") {
        locs.extend(
            document
                .select(&loc_selector)
                .map(|element| element.text().collect::<String>().trim().to_string())
                .filter(|loc| !loc.is_empty()),
        );
    }

    let is_index = Selector::parse("sitemapindex")
        .map(|selector| document.select(&selector).next().is_some())
        .unwrap_or(false);

    if is_index {
        SitemapDocument::Index(locs)
    } else {
        SitemapDocument::UrlSet(locs)
    }
}

/// Replaces each `<![CDATA[...]]>` section with its escaped content
fn expand_cdata(xml: &str) -> Cow<'_, str> {
    const OPEN: &str = "<![CDATA[";
    const CLOSE: &str = "]]>";

    if !xml.contains(OPEN) {
        return Cow::Borrowed(xml);
    }

    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let section = &rest[start + OPEN.len()..];
        // An unterminated section runs to the end of the document
        let (content, after) = match section.find(CLOSE) {
            Some(end) => (&section[..end], &section[end + CLOSE.len()..]),
            None => (section, ""),
        };
        for c in content.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                c => out.push(c),
            }
        }
        rest = after;
    }
    out.push_str(rest);

    Cow::Owned(out)
}

/// Sitemap source backed by HTTP
#[derive(Debug, Clone)]
pub struct HttpSitemap {
    client: Client,
    max_files: usize,
}

impl HttpSitemap {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            max_files: MAX_SITEMAP_FILES,
        }
    }

    /// Limits how many sitemap files a single parse may read
    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files.max(1);
        self
    }

    async fn fetch_text(&self, url: &Url) -> Result<String, RippleError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| RippleError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RippleError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| RippleError::Http {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl SitemapSource for HttpSitemap {
    async fn discover_sitemap_url(&self, base: &Url) -> Result<Url, RippleError> {
        match fetch_robots(&self.client, base).await {
            Ok(robots) => {
                if let Some(url) = robots
                    .sitemaps()
                    .iter()
                    .find_map(|entry| base.join(entry).ok())
                {
                    tracing::debug!("Sitemap {} declared in robots.txt", url);
                    return Ok(url);
                }
            }
            Err(e) => tracing::debug!("Could not read robots.txt for sitemap discovery: {}", e),
        }

        Ok(base.join("/sitemap.xml")?)
    }

    async fn parse_sitemap(&self, sitemap: &Url) -> Result<Vec<String>, RippleError> {
        // The root must be readable; nested sitemaps are best effort
        let root = self.fetch_text(sitemap).await?;

        let mut urls = Vec::new();
        let mut pending = VecDeque::new();
        let mut seen = HashSet::new();
        let mut files_read = 1;
        seen.insert(sitemap.to_string());

        let mut document = parse_sitemap_xml(&root);
        loop {
            match document {
                SitemapDocument::UrlSet(locs) => urls.extend(locs),
                SitemapDocument::Index(children) => {
                    for child in children {
                        let Ok(child_url) = sitemap.join(&child) else {
                            continue;
                        };
                        if seen.insert(child_url.to_string()) {
                            pending.push_back(child_url);
                        }
                    }
                }
            }

            let Some(next) = pending.pop_front() else {
                break;
            };
            if files_read >= self.max_files {
                tracing::warn!(
                    "Sitemap file limit of {} reached, {} nested sitemaps skipped",
                    self.max_files,
                    pending.len() + 1
                );
                break;
            }

            files_read += 1;
            document = match self.fetch_text(&next).await {
                Ok(xml) => parse_sitemap_xml(&xml),
                Err(e) => {
                    tracing::warn!("Skipping nested sitemap {}: {}", next, e);
                    SitemapDocument::UrlSet(Vec::new())
                }
            };
        }

        tracing::debug!("Sitemap {} listed {} URLs", sitemap, urls.len());
        Ok(urls)
    }
}
