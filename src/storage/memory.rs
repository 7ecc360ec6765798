use crate::storage::{LinkGraph, LinkGraphStore};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Link graph kept in process memory
#[derive(Debug, Default)]
pub struct MemoryLinkGraph {
    edges: RwLock<HashMap<String, Vec<String>>>,
}

impl MemoryLinkGraph {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LinkGraphStore for MemoryLinkGraph {
    fn record_edges(&self, source: &str, targets: &[String]) {
        let mut edges = self.edges.write().unwrap_or_else(PoisonError::into_inner);
        edges
            .entry(source.to_string())
            .or_default()
            .extend(targets.iter().cloned());
    }

    fn snapshot(&self) -> LinkGraph {
        let edges = self.edges.read().unwrap_or_else(PoisonError::into_inner);
        edges
            .iter()
            .map(|(source, targets)| (source.clone(), targets.clone()))
            .collect()
    }
}
