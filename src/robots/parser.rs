//! Robots.txt parser implementation
//!
//! Allow/Disallow matching is delegated to the robotstxt crate (a port of
//! Google's matcher). Sitemap lines, which the matcher ignores, are read
//! directly from the file.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content
    content: String,
    /// Skip matching entirely (missing robots.txt)
    allow_all: bool,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// Used when the site has no robots.txt.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - The full URL (or path) to check
    /// * `user_agent` - Product token of the crawler, e.g. "seo-ripple"
    ///
    /// # Returns
    ///
    /// * `true` - If the URL is allowed
    /// * `false` - If the URL is disallowed
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Sitemap URLs declared with `Sitemap:` lines, in file order
    pub fn sitemaps(&self) -> Vec<String> {
        directives(&self.content)
            .filter(|(key, value)| key == "sitemap" && !value.is_empty())
            .map(|(_, value)| value.to_string())
            .collect()
    }
}

/// Extracts the product token from a full user agent string
///
/// "seo-ripple/0.1 (+https://example.com)" becomes "seo-ripple".
pub fn product_token(user_agent: &str) -> &str {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .find(|token| !token.is_empty())
        .unwrap_or(user_agent)
}

/// Iterates over `(lowercase key, value)` pairs, skipping comments and blank lines
fn directives(content: &str) -> impl Iterator<Item = (String, &str)> {
    content.lines().filter_map(|line| {
        let line = line.split('#').next().unwrap_or("").trim();
        let (key, value) = line.split_once(':')?;
        Some((key.trim().to_lowercase(), value.trim()))
    })
}
