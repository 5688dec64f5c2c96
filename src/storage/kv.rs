use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Named string slots that outlive the process.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Default location for persisted data.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("freefall-depth")
}

/// One `<key>.json` file per slot inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.slot_path(key);
        match std::fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create {}", self.dir.display()))?;
        let path = self.slot_path(key);
        // Write then rename so readers never see a half-written slot.
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        std::fs::write(&tmp, value).with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
        Ok(())
    }
}

/// In-memory slots. Clones share the same slots, which lets a test reopen
/// "the same storage" as a fresh process would.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(slots.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("freefall-depth-kv-{}", rand::random::<u64>()))
    }

    #[test]
    fn missing_file_slot_is_none() {
        let store = FileStore::new(temp_dir());
        assert!(store.get("nothing").unwrap().is_none());
    }

    #[test]
    fn file_slot_round_trips() {
        let dir = temp_dir();
        let mut store = FileStore::new(&dir);
        store.set("slot", "[1,2]").unwrap();
        assert_eq!(store.get("slot").unwrap().as_deref(), Some("[1,2]"));
        assert!(!dir.join("slot.json.tmp").exists());

        let reopened = FileStore::new(&dir);
        assert_eq!(reopened.get("slot").unwrap().as_deref(), Some("[1,2]"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn memory_clones_share_slots() {
        let mut a = MemoryStore::new();
        let b = a.clone();
        a.set("k", "v").unwrap();
        assert_eq!(b.get("k").unwrap().as_deref(), Some("v"));
    }
}
