//! TTL cache for read-only command results.
//!
//! Keyed by the full connection identity plus the literal command string so
//! two hosts (or two users) never share an entry. Entries expire passively;
//! there is no capacity bound because the key space is the fleet size times a
//! handful of commands.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::CliOutput;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub command: String,
}

struct CacheEntry {
    inserted_at: Instant,
    output: CliOutput,
}

pub(crate) struct CommandCache {
    ttl: Duration,
    entries: HashMap<CacheKey, CacheEntry>,
}

impl CommandCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Fresh entry for the key, dropping it on the way out if it has expired.
    pub fn get(&mut self, key: &CacheKey) -> Option<CliOutput> {
        match self.entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.output.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&mut self, key: CacheKey, output: CliOutput) {
        self.entries.insert(
            key,
            CacheEntry {
                inserted_at: Instant::now(),
                output,
            },
        );
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
