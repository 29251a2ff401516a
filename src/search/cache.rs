//! Bounded result cache with FIFO eviction.
//!
//! Plain query keys live until evicted. Context-aware keys also expire
//! after a TTL. Eviction order is insertion order, tracked by an explicit
//! queue next to the map.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

use crate::places::LocationResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Basic search path; no TTL.
    Query(String),
    /// Context-aware path; query plus a bounded note prefix, subject to TTL.
    Contextual { query: String, notes_prefix: String },
}

fn normalize(query: &str) -> String {
    query.trim().to_lowercase()
}

impl CacheKey {
    pub fn for_query(query: &str) -> Self {
        CacheKey::Query(normalize(query))
    }

    pub fn for_context(query: &str, notes: &str, prefix_chars: usize) -> Self {
        CacheKey::Contextual {
            query: normalize(query),
            notes_prefix: notes.chars().take(prefix_chars).collect(),
        }
    }

    pub fn expires(&self) -> bool {
        matches!(self, CacheKey::Contextual { .. })
    }

    /// Short stable digest, safe to log without leaking note text.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        match self {
            CacheKey::Query(query) => {
                hasher.update(b"q:");
                hasher.update(query.as_bytes());
            }
            CacheKey::Contextual {
                query,
                notes_prefix,
            } => {
                hasher.update(b"c:");
                hasher.update(query.as_bytes());
                hasher.update([0u8]);
                hasher.update(notes_prefix.as_bytes());
            }
        }

        hasher.finalize()[..8]
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    results: Vec<LocationResult>,
    timestamp: Instant,
}

#[derive(Debug)]
pub struct ResultCache {
    capacity: usize,
    context_ttl: Duration,
    entries: HashMap<CacheKey, CacheEntry>,
    order: VecDeque<CacheKey>,
}

impl ResultCache {
    pub fn new(capacity: usize, context_ttl: Duration) -> Self {
        Self {
            capacity,
            context_ttl,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached results for `key`. Expired context entries are dropped and
    /// reported as a miss.
    pub fn get(&mut self, key: &CacheKey) -> Option<Vec<LocationResult>> {
        let entry = self.entries.get(key)?;

        if key.expires() && entry.timestamp.elapsed() > self.context_ttl {
            log::debug!("cache key={} outcome=expired", key.fingerprint());
            self.remove(key);
            return None;
        }

        Some(entry.results.clone())
    }

    /// Store `results`, replacing any previous entry and moving the key to
    /// the back of the eviction queue. Evicts the oldest key once over
    /// capacity.
    pub fn insert(&mut self, key: CacheKey, results: Vec<LocationResult>) {
        if self.entries.contains_key(&key) {
            self.order.retain(|k| k != &key);
        }

        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                results,
                timestamp: Instant::now(),
            },
        );

        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            log::debug!("cache key={} outcome=evicted", oldest.fingerprint());
            self.entries.remove(&oldest);
        }
    }

    fn remove(&mut self, key: &CacheKey) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}
