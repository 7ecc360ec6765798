//! Shared crawl bookkeeping: the claim-once visited set and the page budget

use dashmap::DashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Set of URLs already claimed by a worker
///
/// The first claimant of a URL wins; entries are never released.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: DashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a URL
    ///
    /// # Returns
    ///
    /// * `true` - The caller is the first claimant and owns the URL
    /// * `false` - Another worker already claimed it
    pub fn claim(&self, url: &str) -> bool {
        self.urls.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Upper bound on the number of stored pages
///
/// Slots are reserved with compare-and-swap, so concurrent workers can never
/// push the count past the limit.
#[derive(Debug)]
pub struct PageBudget {
    limit: usize,
    used: AtomicUsize,
}

impl PageBudget {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            used: AtomicUsize::new(0),
        }
    }

    /// Reserves one slot; returns false when the budget is spent
    pub fn try_reserve(&self) -> bool {
        self.used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                (used < self.limit).then_some(used + 1)
            })
            .is_ok()
    }

    pub fn is_exhausted(&self) -> bool {
        self.used.load(Ordering::SeqCst) >= self.limit
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
