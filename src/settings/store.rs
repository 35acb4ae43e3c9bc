//! In-memory settings store.
//!
//! One record per user id. Records are handed out as clones; the store owns
//! the originals.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use super::{NewSightWords, SettingsUpdate, SightWords};
use crate::errors::StoreError;

pub trait SettingsStore: Send + Sync {
    fn get(&self, user_id: &str) -> Result<Option<SightWords>, StoreError>;

    /// Insert a record, assigning the next id and applying field defaults.
    fn create(&self, data: NewSightWords) -> Result<SightWords, StoreError>;

    /// Replace the mutable fields of an existing record. `None` when the user
    /// has no record yet; callers create instead.
    fn update(
        &self,
        user_id: &str,
        data: &SettingsUpdate,
    ) -> Result<Option<SightWords>, StoreError>;
}

struct Inner {
    records: HashMap<String, SightWords>,
    next_id: i64,
}

pub struct MemStorage {
    inner: Mutex<Inner>,
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStorage {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                records: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Store pre-populated with the default user's seed word list.
    pub fn seeded() -> Result<Self, StoreError> {
        let store = Self::new();
        store.create(NewSightWords::seed())?;
        Ok(store)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl SettingsStore for MemStorage {
    fn get(&self, user_id: &str) -> Result<Option<SightWords>, StoreError> {
        Ok(self.lock()?.records.get(user_id).cloned())
    }

    fn create(&self, data: NewSightWords) -> Result<SightWords, StoreError> {
        let mut inner = self.lock()?;
        let id = inner.next_id;
        inner.next_id += 1;

        let record = data.into_record(id);
        debug!("Created settings record {id} for '{}'", record.user_id);
        inner.records.insert(record.user_id.clone(), record.clone());
        Ok(record)
    }

    fn update(
        &self,
        user_id: &str,
        data: &SettingsUpdate,
    ) -> Result<Option<SightWords>, StoreError> {
        let mut inner = self.lock()?;
        let Some(record) = inner.records.get_mut(user_id) else {
            return Ok(None);
        };
        record.replace_with(data);
        debug!("Updated settings record {} for '{user_id}'", record.id);
        Ok(Some(record.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{DEFAULT_USER_ID, SEED_WORDS};

    fn update(words: &[&str]) -> SettingsUpdate {
        SettingsUpdate {
            words: words.iter().map(|w| w.to_string()).collect(),
            random_order: true,
            auto_advance: true,
            speech_enabled: false,
            speech_rate: "1.5".into(),
            speech_pitch: "0.5".into(),
            speech_voice: Some("en-gb".into()),
        }
    }

    #[test]
    fn empty_store_has_no_record() {
        let store = MemStorage::new();
        assert_eq!(store.get(DEFAULT_USER_ID).unwrap(), None);
    }

    #[test]
    fn update_without_record_returns_none() {
        let store = MemStorage::new();
        assert_eq!(store.update(DEFAULT_USER_ID, &update(&["cat"])).unwrap(), None);
        assert_eq!(store.get(DEFAULT_USER_ID).unwrap(), None);
    }

    #[test]
    fn ids_increase_per_create() {
        let store = MemStorage::new();
        let a = store
            .create(NewSightWords {
                user_id: Some("a".into()),
                ..NewSightWords::default()
            })
            .unwrap();
        let b = store
            .create(NewSightWords {
                user_id: Some("b".into()),
                ..NewSightWords::default()
            })
            .unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[test]
    fn update_replaces_fields_and_keeps_identity() {
        let store = MemStorage::seeded().unwrap();
        let seeded = store.get(DEFAULT_USER_ID).unwrap().unwrap();
        assert_eq!(seeded.words.len(), SEED_WORDS.len());

        let updated = store
            .update(DEFAULT_USER_ID, &update(&["sun", "moon"]))
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, seeded.id);
        assert_eq!(updated.user_id, DEFAULT_USER_ID);
        assert_eq!(updated.words, vec!["sun", "moon"]);
        assert!(updated.random_order);
        assert_eq!(updated.speech_voice.as_deref(), Some("en-gb"));
        assert_eq!(store.get(DEFAULT_USER_ID).unwrap().unwrap(), updated);
    }

    #[test]
    fn callers_receive_copies() {
        let store = MemStorage::seeded().unwrap();
        let mut copy = store.get(DEFAULT_USER_ID).unwrap().unwrap();
        copy.words.clear();
        assert!(!store.get(DEFAULT_USER_ID).unwrap().unwrap().words.is_empty());
    }
}
