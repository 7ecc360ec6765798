//! Storage module for crawl data
//!
//! This module handles where crawl data lives, including:
//! - The link graph store consulted by the crawler (`LinkGraphStore`)
//! - An in-memory store used by default (`MemoryLinkGraph`)
//! - The SQLite database written when a crawl is exported as `sqlite`

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryLinkGraph;
pub use schema::{initialize_schema, SCHEMA_SQL};
pub use sqlite::SqliteReportWriter;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Append-only store of page-to-page edges
///
/// Edges are never deduplicated across calls and cycles are allowed.
pub trait LinkGraphStore: Send + Sync {
    /// Appends edges from `source` to every URL in `targets`, in order
    fn record_edges(&self, source: &str, targets: &[String]);

    /// Returns a copy of every edge recorded so far
    fn snapshot(&self) -> LinkGraph;
}

/// Source URL to ordered target URLs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkGraph {
    edges: BTreeMap<String, Vec<String>>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edges(&mut self, source: &str, targets: &[String]) {
        self.edges
            .entry(source.to_string())
            .or_default()
            .extend(targets.iter().cloned());
    }

    /// Targets linked from `source`, empty if it has no recorded edges
    pub fn targets(&self, source: &str) -> &[String] {
        self.edges.get(source).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn source_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }
}

impl FromIterator<(String, Vec<String>)> for LinkGraph {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        let mut graph = LinkGraph::new();
        for (source, targets) in iter {
            graph.add_edges(&source, &targets);
        }
        graph
    }
}
