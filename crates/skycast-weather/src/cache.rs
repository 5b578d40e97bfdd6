//! Per-location snapshot cache with a freshness window.
//!
//! Entries are never evicted; a newer snapshot overwrites the old one.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::storage::{read_json, weather_key, write_json, KvStore, LAST_VIEWED_KEY};
use crate::types::WeatherSnapshot;

/// Result of a freshness check
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Fresh(WeatherSnapshot),
    Stale(WeatherSnapshot),
    Missing,
}

#[derive(Clone)]
pub struct WeatherCache {
    store: Arc<dyn KvStore>,
    freshness: Duration,
}

impl WeatherCache {
    pub fn new(store: Arc<dyn KvStore>, freshness_minutes: u32) -> Self {
        Self {
            store,
            freshness: Duration::minutes(i64::from(freshness_minutes)),
        }
    }

    pub fn get(&self, location_id: &str) -> Option<WeatherSnapshot> {
        self.read(&weather_key(location_id))
    }

    pub fn put(&self, snapshot: &WeatherSnapshot) {
        self.write(&weather_key(&snapshot.location.id), snapshot);
    }

    /// Most recently displayed snapshot, used to restore the view on startup
    pub fn last_viewed(&self) -> Option<WeatherSnapshot> {
        self.read(LAST_VIEWED_KEY)
    }

    pub fn set_last_viewed(&self, snapshot: &WeatherSnapshot) {
        self.write(LAST_VIEWED_KEY, snapshot);
    }

    /// Fresh iff `now - last_updated` is strictly inside the window.
    pub fn lookup(&self, location_id: &str, now: DateTime<Utc>) -> CacheLookup {
        match self.get(location_id) {
            Some(snapshot) if now - snapshot.last_updated < self.freshness => {
                CacheLookup::Fresh(snapshot)
            }
            Some(snapshot) => CacheLookup::Stale(snapshot),
            None => CacheLookup::Missing,
        }
    }

    fn read(&self, key: &str) -> Option<WeatherSnapshot> {
        match read_json(self.store.as_ref(), key) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Ignoring unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    fn write(&self, key: &str, snapshot: &WeatherSnapshot) {
        if let Err(e) = write_json(self.store.as_ref(), key, snapshot) {
            tracing::warn!("Failed to write cache entry {}: {}", key, e);
        }
    }
}
