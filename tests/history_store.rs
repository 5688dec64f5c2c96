use freefall_depth::model::{Measurement, Sample};
use freefall_depth::storage::{load_history, FileStore, HistoryStore, KeyValueStore};
use std::path::PathBuf;

const KEY: &str = "measurementHistory";

struct TempDir(PathBuf);

impl TempDir {
    fn new() -> Self {
        Self(std::env::temp_dir().join(format!("freefall-depth-it-{}", rand::random::<u64>())))
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn run(t: f64) -> Measurement {
    Measurement::from_sample(Sample::at(t))
}

#[test]
fn first_launch_has_empty_history() {
    let dir = TempDir::new();
    let store = HistoryStore::open(FileStore::new(&dir.0), KEY);
    assert!(store.list().is_empty());
    assert!(store.load().is_empty());
}

#[test]
fn next_session_sees_the_same_list() {
    let dir = TempDir::new();
    let expected = {
        let mut store = HistoryStore::open(FileStore::new(&dir.0), KEY);
        for t in [0.5, 1.0, 1.5, 2.0] {
            store.append(run(t)).unwrap();
        }
        store.rename(0, "Garden well").unwrap();
        store.rename(3, "Quarry").unwrap();
        store.delete(1).unwrap();
        store.list().clone()
    };

    let reopened = HistoryStore::open(FileStore::new(&dir.0), KEY);
    assert_eq!(*reopened.list(), expected);
    let names: Vec<&str> = reopened.list().iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Garden well", "Measurement", "Quarry"]);
}

#[test]
fn slot_holds_a_plain_json_array() {
    let dir = TempDir::new();
    let kv = FileStore::new(&dir.0);
    let mut store = HistoryStore::open(kv.clone(), KEY);
    store.append(run(2.0)).unwrap();

    let raw = std::fs::read_to_string(kv.slot_path(KEY)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let entry = &value.as_array().unwrap()[0];
    assert_eq!(entry["name"], "Measurement");
    assert_eq!(entry["elapsedTime"], 2.0);
    assert!((entry["depth"].as_f64().unwrap() - 19.6).abs() < 1e-9);
}

#[test]
fn corrupt_slot_reads_as_empty_and_is_replaced_on_write() {
    let dir = TempDir::new();
    let mut kv = FileStore::new(&dir.0);
    kv.set(KEY, "{ this is not json").unwrap();

    let mut store = HistoryStore::open(kv.clone(), KEY);
    assert!(store.list().is_empty());
    store.append(run(1.0)).unwrap();
    assert_eq!(load_history(&kv, KEY).len(), 1);
}

#[test]
fn separate_keys_do_not_share_history() {
    let dir = TempDir::new();
    let mut a = HistoryStore::open(FileStore::new(&dir.0), "a");
    a.append(run(1.0)).unwrap();
    let b = HistoryStore::open(FileStore::new(&dir.0), "b");
    assert!(b.list().is_empty());
}
