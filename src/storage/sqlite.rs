//! SQLite writer for crawl reports

use crate::output::CrawlReport;
use crate::page::PageResult;
use crate::storage::schema::initialize_schema;
use rusqlite::{params, Connection, Transaction};
use std::path::Path;

/// Writes crawl reports into a SQLite database
pub struct SqliteReportWriter {
    conn: Connection,
}

impl SqliteReportWriter {
    /// Opens (or creates) a database file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteReportWriter)` - Database opened with the schema in place
    /// * `Err(rusqlite::Error)` - Failed to open database
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Writes a whole report in one transaction
    ///
    /// # Returns
    ///
    /// The id of the new `crawls` row
    pub fn write_report(&mut self, report: &CrawlReport) -> Result<i64, rusqlite::Error> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO crawls (start_url, started_at, finished_at, page_count, dropped_links, cancelled)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                report.start_url,
                report.started_at.to_rfc3339(),
                report.finished_at.to_rfc3339(),
                report.outcome.pages.len() as i64,
                report.outcome.dropped_links as i64,
                report.outcome.cancelled,
            ],
        )?;
        let crawl_id = tx.last_insert_rowid();

        for page in &report.outcome.pages {
            insert_page(&tx, crawl_id, page)?;
        }

        tx.commit()?;

        tracing::debug!(
            "Wrote crawl {} with {} pages to SQLite",
            crawl_id,
            report.outcome.pages.len()
        );

        Ok(crawl_id)
    }
}

fn insert_page(tx: &Transaction<'_>, crawl_id: i64, page: &PageResult) -> Result<(), rusqlite::Error> {
    let ix = &page.indexability;

    tx.execute(
        "INSERT INTO pages (
            crawl_id, url, final_url, depth, status_code, response_time_ms, content_type,
            title, meta_description, canonical_url, lang, meta_robots, x_robots_tag,
            noindex, nofollow, canonicalized, indexable, error, crawled_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            crawl_id,
            page.url,
            page.final_url,
            page.depth,
            page.status_code,
            page.response_time_ms as i64,
            page.content_type,
            page.title,
            page.meta_description,
            page.canonical_url,
            page.lang,
            ix.meta_robots,
            ix.x_robots_tag,
            ix.noindex,
            ix.nofollow,
            ix.canonicalized,
            ix.indexable,
            page.error,
            page.crawled_at.to_rfc3339(),
        ],
    )?;
    let page_id = tx.last_insert_rowid();

    let mut redirect_stmt = tx.prepare_cached(
        "INSERT INTO redirects (page_id, position, url, status) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, hop) in page.redirect_chain.iter().enumerate() {
        redirect_stmt.execute(params![page_id, position as i64, hop.url, hop.status])?;
    }

    let mut heading_stmt = tx.prepare_cached(
        "INSERT INTO headings (page_id, level, position, text) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for level in 1..=6u8 {
        for (position, text) in page.headings.level(level).iter().enumerate() {
            heading_stmt.execute(params![page_id, level, position as i64, text])?;
        }
    }

    let mut link_stmt = tx.prepare_cached(
        "INSERT INTO links (page_id, position, target_url, internal) VALUES (?1, ?2, ?3, ?4)",
    )?;
    let links = page
        .internal_links
        .iter()
        .map(|link| (link, true))
        .chain(page.external_links.iter().map(|link| (link, false)));
    for (position, (link, internal)) in links.enumerate() {
        link_stmt.execute(params![page_id, position as i64, link, internal])?;
    }

    let mut image_stmt = tx.prepare_cached(
        "INSERT INTO images (page_id, position, url, alt) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, image) in page.images.iter().enumerate() {
        image_stmt.execute(params![page_id, position as i64, image.url, image.alt])?;
    }

    Ok(())
}
