//! Robots.txt caching implementation
//!
//! Parsed robots.txt files are kept per origin and refetched after 24 hours.
//! A failed fetch is remembered for a minute so an unreachable origin is not
//! asked again for every URL.

use crate::robots::ParsedRobots;
use chrono::{DateTime, Duration, Utc};

/// How long a fetched robots.txt stays valid
const ROBOTS_TTL_HOURS: i64 = 24;

/// How long a failed fetch is remembered
const FAILURE_TTL_SECS: i64 = 60;

/// Cached robots.txt data for one origin
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed file, or why it could not be fetched
    pub robots: Result<ParsedRobots, String>,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    /// Wraps freshly fetched robots data, timestamped now
    pub fn new(robots: ParsedRobots) -> Self {
        Self {
            robots: Ok(robots),
            fetched_at: Utc::now(),
        }
    }

    /// Records a failed fetch, timestamped now
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            robots: Err(reason.into()),
            fetched_at: Utc::now(),
        }
    }

    pub fn ttl(&self) -> Duration {
        match self.robots {
            Ok(_) => Duration::hours(ROBOTS_TTL_HOURS),
            Err(_) => Duration::seconds(FAILURE_TTL_SECS),
        }
    }

    /// Checks if the entry has outlived its TTL
    pub fn is_stale(&self) -> bool {
        self.age() > self.ttl()
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }
}
