//! Database schema definitions
//!
//! This module contains the SQL schema of exported crawl databases. One file
//! can hold several crawls; every row hangs off a `crawls` row.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per exported crawl
CREATE TABLE IF NOT EXISTS crawls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    start_url TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    page_count INTEGER NOT NULL,
    dropped_links INTEGER NOT NULL DEFAULT 0,
    cancelled INTEGER NOT NULL DEFAULT 0
);

-- One row per stored page
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    crawl_id INTEGER NOT NULL REFERENCES crawls(id),
    url TEXT NOT NULL,
    final_url TEXT NOT NULL,
    depth INTEGER NOT NULL,
    status_code INTEGER NOT NULL,
    response_time_ms INTEGER NOT NULL,
    content_type TEXT NOT NULL,
    title TEXT NOT NULL,
    meta_description TEXT NOT NULL,
    canonical_url TEXT NOT NULL,
    lang TEXT,
    meta_robots TEXT,
    x_robots_tag TEXT,
    noindex INTEGER NOT NULL,
    nofollow INTEGER NOT NULL,
    canonicalized INTEGER NOT NULL,
    indexable INTEGER NOT NULL,
    error TEXT,
    crawled_at TEXT NOT NULL,
    UNIQUE(crawl_id, url)
);

CREATE INDEX IF NOT EXISTS idx_pages_crawl ON pages(crawl_id);
CREATE INDEX IF NOT EXISTS idx_pages_status ON pages(status_code);

-- Redirect hops in order
CREATE TABLE IF NOT EXISTS redirects (
    page_id INTEGER NOT NULL REFERENCES pages(id),
    position INTEGER NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    PRIMARY KEY(page_id, position)
);

-- Headings in document order per level
CREATE TABLE IF NOT EXISTS headings (
    page_id INTEGER NOT NULL REFERENCES pages(id),
    level INTEGER NOT NULL,
    position INTEGER NOT NULL,
    text TEXT NOT NULL,
    PRIMARY KEY(page_id, level, position)
);

-- Outbound links
CREATE TABLE IF NOT EXISTS links (
    page_id INTEGER NOT NULL REFERENCES pages(id),
    position INTEGER NOT NULL,
    target_url TEXT NOT NULL,
    internal INTEGER NOT NULL,
    PRIMARY KEY(page_id, position)
);

CREATE INDEX IF NOT EXISTS idx_links_target ON links(target_url);

-- Images referenced by pages
CREATE TABLE IF NOT EXISTS images (
    page_id INTEGER NOT NULL REFERENCES pages(id),
    position INTEGER NOT NULL,
    url TEXT NOT NULL,
    alt TEXT NOT NULL,
    PRIMARY KEY(page_id, position)
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
