//! In-memory forecast cache.
//!
//! Entries expire after a fixed age. Expired entries are dropped when read,
//! and every insert sweeps all expired entries, so entries that are never
//! read again do not pile up. A size cap evicts the oldest entry when full.
//! Misses (`None`) are cached like hits.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::types::Forecast;

/// How long a cached lookup stays valid.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Maximum number of cached lookups.
pub const DEFAULT_CAPACITY: usize = 256;

/// Coordinates rounded to three decimals plus the requested date.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(lat: f64, lon: f64, date_iso: &str) -> Self {
        Self(format!("c:{:.3},{:.3}|{}", lat, lon, date_iso))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
struct Entry {
    stored_at: Instant,
    value: Option<Forecast>,
}

#[derive(Debug)]
pub struct ForecastCache {
    entries: Mutex<HashMap<CacheKey, Entry>>,
    ttl: Duration,
    capacity: usize,
}

impl Default for ForecastCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

impl ForecastCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a key. The outer `None` is a cache miss; `Some(None)` is a
    /// cached "no forecast".
    pub fn get(&self, key: &CacheKey) -> Option<Option<Forecast>> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &CacheKey, now: Instant) -> Option<Option<Forecast>> {
        let mut entries = self.entries.lock();
        let expired = self.is_expired(entries.get(key)?, now);
        if expired {
            entries.remove(key);
            tracing::debug!("Forecast cache expired: {}", key.as_str());
            return None;
        }
        entries.get(key).map(|e| e.value.clone())
    }

    pub fn insert(&self, key: CacheKey, value: Option<Forecast>) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn insert_at(&self, key: CacheKey, value: Option<Forecast>, now: Instant) {
        let mut entries = self.entries.lock();
        Self::sweep_locked(&mut entries, self.ttl, now);

        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.stored_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                tracing::debug!("Forecast cache full, evicting {}", oldest.as_str());
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            Entry {
                stored_at: now,
                value,
            },
        );
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock();
        Self::sweep_locked(&mut entries, self.ttl, now)
    }

    fn sweep_locked(entries: &mut HashMap<CacheKey, Entry>, ttl: Duration, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, e| now.saturating_duration_since(e.stored_at) <= ttl);
        before - entries.len()
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) > self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
