//! Saved-locations list.
//!
//! The whole list lives under one key and every mutation is a
//! read-modify-write. Mutations return the intended list even when the
//! write fails, so in-memory state still reflects the user's action.

use std::sync::Arc;

use crate::storage::{read_json, write_json, KvStore, SAVED_LOCATIONS_KEY};
use crate::types::Location;

#[derive(Clone)]
pub struct LocationStore {
    store: Arc<dyn KvStore>,
}

impl LocationStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Saved locations in insertion order. Missing or unreadable data is an empty list.
    pub fn list(&self) -> Vec<Location> {
        match read_json::<Vec<Location>>(self.store.as_ref(), SAVED_LOCATIONS_KEY) {
            Ok(locations) => locations.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Failed to load saved locations: {}", e);
                Vec::new()
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.list().iter().any(|l| l.id == id)
    }

    /// Append a location unless one with the same id is already saved.
    /// Existing entries are left untouched.
    pub fn upsert(&self, location: &Location) -> Vec<Location> {
        let mut locations = self.list();
        if locations.iter().any(|l| l.id == location.id) {
            return locations;
        }
        locations.push(location.clone());
        self.persist(&locations);
        locations
    }

    pub fn remove(&self, id: &str) -> Vec<Location> {
        let mut locations = self.list();
        let before = locations.len();
        locations.retain(|l| l.id != id);
        if locations.len() != before {
            self.persist(&locations);
        }
        locations
    }

    pub fn toggle_favorite(&self, id: &str) -> Vec<Location> {
        let mut locations = self.list();
        if let Some(location) = locations.iter_mut().find(|l| l.id == id) {
            location.favorite = !location.favorite;
            self.persist(&locations);
        }
        locations
    }

    fn persist(&self, locations: &[Location]) {
        if let Err(e) = write_json(self.store.as_ref(), SAVED_LOCATIONS_KEY, locations) {
            tracing::warn!("Failed to save locations: {}", e);
        }
    }
}

/// Favorites first, otherwise preserving order.
pub fn favorites_first(locations: &[Location]) -> Vec<Location> {
    let mut ordered = locations.to_vec();
    ordered.sort_by_key(|l| !l.favorite);
    ordered
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::storage::MemoryStore;
    use crate::types::{StorageError, StorageResult};

    struct ReadOnlyStore(MemoryStore);

    impl KvStore for ReadOnlyStore {
        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            self.0.get(key)
        }
        fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::WriteFailed("disk full".into()))
        }
        fn delete(&self, _key: &str) -> StorageResult<()> {
            Err(StorageError::WriteFailed("disk full".into()))
        }
    }

    fn store() -> LocationStore {
        LocationStore::new(Arc::new(MemoryStore::new()))
    }

    fn berlin() -> Location {
        Location::new("Berlin", 52.52, 13.41)
    }

    fn paris() -> Location {
        Location::new("Paris", 48.85, 2.35)
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        assert!(store().list().is_empty());
    }

    #[test]
    fn test_upsert_appends_in_order() {
        let locations = store();
        locations.upsert(&berlin());
        let list = locations.upsert(&paris());

        assert_eq!(list, vec![berlin(), paris()]);
        assert_eq!(locations.list(), list);
        assert!(locations.contains(&paris().id));
    }

    #[test]
    fn test_upsert_existing_id_does_not_overwrite() {
        let locations = store();
        locations.upsert(&berlin());

        let mut renamed = berlin();
        renamed.name = "Berlin, Germany".into();
        let list = locations.upsert(&renamed);

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "Berlin");
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let locations = store();
        locations.upsert(&berlin());

        assert_eq!(locations.remove("nope"), vec![berlin()]);
        assert!(locations.remove(&berlin().id).is_empty());
        assert!(locations.list().is_empty());
    }

    #[test]
    fn test_toggle_favorite() {
        let locations = store();
        locations.upsert(&berlin());

        let list = locations.toggle_favorite(&berlin().id);
        assert!(list[0].favorite);
        assert!(locations.list()[0].favorite);

        let list = locations.toggle_favorite(&berlin().id);
        assert!(!list[0].favorite);

        // Absent id changes nothing
        assert_eq!(locations.toggle_favorite("nope"), locations.list());
    }

    #[test]
    fn test_corrupt_list_reads_as_empty() {
        let backing = Arc::new(MemoryStore::new());
        backing.set(SAVED_LOCATIONS_KEY, "not json").unwrap();

        let locations = LocationStore::new(backing);
        assert!(locations.list().is_empty());
        assert_eq!(locations.upsert(&berlin()), vec![berlin()]);
    }

    #[test]
    fn test_write_failure_still_returns_intended_list() {
        let locations = LocationStore::new(Arc::new(ReadOnlyStore(MemoryStore::new())));

        let list = locations.upsert(&berlin());
        assert_eq!(list, vec![berlin()]);
        assert!(locations.list().is_empty());
    }

    #[test]
    fn test_favorites_first_is_stable() {
        let mut tokyo = Location::new("Tokyo", 35.68, 139.69);
        tokyo.favorite = true;
        let mut oslo = Location::new("Oslo", 59.91, 10.75);
        oslo.favorite = true;

        let ordered = favorites_first(&[berlin(), tokyo.clone(), paris(), oslo.clone()]);
        let names: Vec<&str> = ordered.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Tokyo", "Oslo", "Berlin", "Paris"]);
    }
}
