//! Persisted measurement history.
//!
//! The whole list lives in one slot of a [`KeyValueStore`] as a JSON array and
//! is rewritten in full after every mutation.

mod export;
mod kv;

pub use export::{export_csv, export_json};
pub use kv::{default_data_dir, FileStore, KeyValueStore, MemoryStore};

use crate::model::Measurement;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Measurements in the order their runs completed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryList(Vec<Measurement>);

impl HistoryList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a persisted payload. Entries with negative or non-finite values
    /// reject the whole payload.
    pub fn from_json(raw: &str) -> Result<Self> {
        let list: HistoryList = serde_json::from_str(raw).context("parse history")?;
        if let Some(pos) = list.0.iter().position(|m| !m.is_well_formed()) {
            anyhow::bail!("history entry {pos} has out-of-range values");
        }
        Ok(list)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("serialize history")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Measurement> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Measurement> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Measurement] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<Measurement> {
        self.0.clone()
    }

    fn push(&mut self, measurement: Measurement) {
        self.0.push(measurement);
    }

    fn rename(&mut self, index: usize, name: String) -> bool {
        match self.0.get_mut(index) {
            Some(m) => {
                m.name = name;
                true
            }
            None => false,
        }
    }

    fn remove(&mut self, index: usize) -> Option<Measurement> {
        (index < self.0.len()).then(|| self.0.remove(index))
    }
}

impl From<Vec<Measurement>> for HistoryList {
    fn from(v: Vec<Measurement>) -> Self {
        Self(v)
    }
}

impl<'a> IntoIterator for &'a HistoryList {
    type Item = &'a Measurement;
    type IntoIter = std::slice::Iter<'a, Measurement>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Read the history in `key`. Missing, unreadable or malformed data reads as
/// an empty list.
pub fn load_history<K: KeyValueStore>(kv: &K, key: &str) -> HistoryList {
    let raw = match kv.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return HistoryList::new(),
        Err(e) => {
            warn!(key, "history slot unreadable, starting empty: {e:#}");
            return HistoryList::new();
        }
    };
    match HistoryList::from_json(&raw) {
        Ok(list) => {
            debug!(key, entries = list.len(), "history loaded");
            list
        }
        Err(e) => {
            warn!(key, "history slot malformed, starting empty: {e:#}");
            HistoryList::new()
        }
    }
}

/// Sole owner of the in-memory history; every mutation writes through.
pub struct HistoryStore<K> {
    kv: K,
    key: String,
    list: HistoryList,
}

impl<K: KeyValueStore> HistoryStore<K> {
    /// Open the store and load whatever `key` currently holds.
    pub fn open(kv: K, key: impl Into<String>) -> Self {
        let key = key.into();
        let list = load_history(&kv, &key);
        Self { kv, key, list }
    }

    /// Re-read the persisted list, bypassing the in-memory copy.
    pub fn load(&self) -> HistoryList {
        load_history(&self.kv, &self.key)
    }

    pub fn list(&self) -> &HistoryList {
        &self.list
    }

    pub fn append(&mut self, measurement: Measurement) -> Result<()> {
        info!(
            depth = measurement.depth,
            elapsed = measurement.elapsed_time,
            "measurement recorded"
        );
        self.list.push(measurement);
        self.persist()
    }

    /// Rename the entry at `index`. Returns `Ok(false)` without touching
    /// storage when `index` is out of range.
    pub fn rename(&mut self, index: usize, name: impl Into<String>) -> Result<bool> {
        if !self.list.rename(index, name.into()) {
            debug!(index, len = self.list.len(), "rename ignored: no such entry");
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Remove the entry at `index`; later entries shift down by one.
    /// Returns `Ok(None)` without touching storage when `index` is out of range.
    pub fn delete(&mut self, index: usize) -> Result<Option<Measurement>> {
        let Some(removed) = self.list.remove(index) else {
            debug!(index, len = self.list.len(), "delete ignored: no such entry");
            return Ok(None);
        };
        self.persist()?;
        Ok(Some(removed))
    }

    fn persist(&mut self) -> Result<()> {
        let raw = self.list.to_json()?;
        self.kv
            .set(&self.key, &raw)
            .with_context(|| format!("save history slot {}", self.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Sample, DEFAULT_STORAGE_KEY};

    fn m(t: f64) -> Measurement {
        Measurement::from_sample(Sample::at(t))
    }

    /// Store whose writes always fail.
    struct ReadOnly;

    impl KeyValueStore for ReadOnly {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }
        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            anyhow::bail!("read-only")
        }
    }

    #[test]
    fn empty_slot_loads_empty() {
        let store = HistoryStore::open(MemoryStore::new(), DEFAULT_STORAGE_KEY);
        assert!(store.list().is_empty());
    }

    #[test]
    fn malformed_payloads_load_empty() {
        for raw in [
            "not json",
            "{\"depth\": 1}",
            "[{\"depth\": 1.0, \"elapsedTime\": 0.5}]",
            "[{\"depth\": \"deep\", \"elapsedTime\": 0.5, \"name\": \"x\"}]",
            "[{\"depth\": -1.0, \"elapsedTime\": 0.5, \"name\": \"x\"}]",
        ] {
            let mut kv = MemoryStore::new();
            kv.set("h", raw).unwrap();
            assert!(load_history(&kv, "h").is_empty(), "payload {raw:?}");
        }
    }

    #[test]
    fn reads_the_persisted_layout() {
        let mut kv = MemoryStore::new();
        kv.set(
            "h",
            r#"[{"depth":19.6,"elapsedTime":2.0,"name":"Well"},{"depth":4.9,"elapsedTime":1.0,"name":"Measurement"}]"#,
        )
        .unwrap();
        let list = load_history(&kv, "h");
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(0).unwrap().name, "Well");
        assert_eq!(list.get(1).unwrap().elapsed_time, 1.0);
    }

    #[test]
    fn append_writes_through() {
        let kv = MemoryStore::new();
        let mut store = HistoryStore::open(kv.clone(), "h");
        store.append(m(1.0)).unwrap();
        store.append(m(2.0)).unwrap();
        assert_eq!(load_history(&kv, "h").as_slice(), store.list().as_slice());
        assert_eq!(store.load().len(), 2);
    }

    #[test]
    fn rename_changes_only_the_name() {
        let kv = MemoryStore::new();
        let mut store = HistoryStore::open(kv.clone(), "h");
        store.append(m(1.0)).unwrap();
        store.append(m(2.0)).unwrap();
        let before = store.list().get(1).unwrap().clone();

        assert!(store.rename(1, "X").unwrap());
        let after = store.list().get(1).unwrap();
        assert_eq!(after.name, "X");
        assert_eq!(after.depth, before.depth);
        assert_eq!(after.elapsed_time, before.elapsed_time);
        assert_eq!(load_history(&kv, "h").get(1).unwrap().name, "X");
    }

    #[test]
    fn delete_shifts_later_entries() {
        let mut store = HistoryStore::open(MemoryStore::new(), "h");
        for t in [1.0, 2.0, 3.0] {
            store.append(m(t)).unwrap();
        }
        let removed = store.delete(1).unwrap().unwrap();
        assert_eq!(removed.elapsed_time, 2.0);
        assert_eq!(store.list().len(), 2);
        assert_eq!(store.list().get(1).unwrap().elapsed_time, 3.0);
        assert_eq!(store.load(), *store.list());
    }

    #[test]
    fn out_of_range_is_ignored() {
        let kv = MemoryStore::new();
        let mut store = HistoryStore::open(kv.clone(), "h");
        assert!(!store.rename(0, "X").unwrap());
        assert!(store.delete(0).unwrap().is_none());
        // No write happened at all.
        assert!(kv.get("h").unwrap().is_none());
    }

    #[test]
    fn failed_write_keeps_in_memory_state() {
        let mut store = HistoryStore::open(ReadOnly, "h");
        assert!(store.append(m(1.0)).is_err());
        assert_eq!(store.list().len(), 1);
    }
}
