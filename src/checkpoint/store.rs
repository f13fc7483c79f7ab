//! Checkpoint sinks, indexed by simulated time.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::time::SimTime;

use super::Checkpoint;

/// An ordered collection of checkpoints, keyed by time.
pub trait CheckpointStore<S> {
    /// Record a checkpoint. A second checkpoint at the same time replaces
    /// the first.
    fn save(&mut self, checkpoint: Checkpoint<S>) -> SimResult<()>;

    /// Times of all stored checkpoints, ascending.
    fn times(&self) -> SimResult<Vec<SimTime>>;

    /// The checkpoint taken at exactly `time`, or `NoCheckpoint`.
    fn load(&self, time: SimTime) -> SimResult<Checkpoint<S>>;
}

impl<S, T: CheckpointStore<S>> CheckpointStore<S> for Rc<RefCell<T>> {
    fn save(&mut self, checkpoint: Checkpoint<S>) -> SimResult<()> {
        self.borrow_mut().save(checkpoint)
    }

    fn times(&self) -> SimResult<Vec<SimTime>> {
        self.borrow().times()
    }

    fn load(&self, time: SimTime) -> SimResult<Checkpoint<S>> {
        self.borrow().load(time)
    }
}

impl<S, T: CheckpointStore<S> + ?Sized> CheckpointStore<S> for Box<T> {
    fn save(&mut self, checkpoint: Checkpoint<S>) -> SimResult<()> {
        (**self).save(checkpoint)
    }

    fn times(&self) -> SimResult<Vec<SimTime>> {
        (**self).times()
    }

    fn load(&self, time: SimTime) -> SimResult<Checkpoint<S>> {
        (**self).load(time)
    }
}

// ── MemoryStore ───────────────────────────────────────────────────────

/// Keeps checkpoints in memory.
#[derive(Debug, Clone)]
pub struct MemoryStore<S> {
    checkpoints: BTreeMap<SimTime, Checkpoint<S>>,
}

impl<S> MemoryStore<S> {
    pub fn new() -> Self {
        MemoryStore {
            checkpoints: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// Checkpoints in time order.
    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint<S>> {
        self.checkpoints.values()
    }
}

impl<S> Default for MemoryStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone> CheckpointStore<S> for MemoryStore<S> {
    fn save(&mut self, checkpoint: Checkpoint<S>) -> SimResult<()> {
        self.checkpoints.insert(checkpoint.time, checkpoint);
        Ok(())
    }

    fn times(&self) -> SimResult<Vec<SimTime>> {
        Ok(self.checkpoints.keys().copied().collect())
    }

    fn load(&self, time: SimTime) -> SimResult<Checkpoint<S>> {
        self.checkpoints
            .get(&time)
            .cloned()
            .ok_or(SimError::NoCheckpoint(time))
    }
}

// ── DirectoryStore ────────────────────────────────────────────────────

const EXTENSION: &str = "json";

/// Writes each checkpoint to its own JSON file in a directory.
///
/// The file stem is the checkpoint time in its shortest round-trip
/// decimal form, e.g. `11.json` or `2.5.json`. Files whose stem is not a
/// time in that form, such as `011.json` or `1e1.json`, are ignored.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    /// Use `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> SimResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(DirectoryStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding the checkpoint at `time`.
    pub fn path_for(&self, time: SimTime) -> PathBuf {
        self.dir.join(format!("{}.{}", time, EXTENSION))
    }
}

impl<S: Serialize + DeserializeOwned> CheckpointStore<S> for DirectoryStore {
    fn save(&mut self, checkpoint: Checkpoint<S>) -> SimResult<()> {
        let path = self.path_for(checkpoint.time);
        let json = serde_json::to_string(&checkpoint)?;
        fs::write(&path, json)?;
        debug!(time = %checkpoint.time, path = %path.display(), "checkpoint written");
        Ok(())
    }

    fn times(&self) -> SimResult<Vec<SimTime>> {
        let mut times = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            // Only canonical names, so every listed time can be loaded.
            let parsed = stem
                .parse::<f64>()
                .ok()
                .and_then(|value| SimTime::new(value).ok())
                .filter(|time| time.to_string() == stem);
            if let Some(time) = parsed {
                times.push(time);
            }
        }
        times.sort();
        Ok(times)
    }

    fn load(&self, time: SimTime) -> SimResult<Checkpoint<S>> {
        let path = self.path_for(time);
        if !path.is_file() {
            return Err(SimError::NoCheckpoint(time));
        }
        let json = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoint(time: f64, state: i64) -> Checkpoint<i64> {
        Checkpoint {
            time: SimTime::new(time).unwrap(),
            state,
            random_state: None,
        }
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        store.save(checkpoint(11.0, 2)).unwrap();
        store.save(checkpoint(0.0, 1)).unwrap();

        assert_eq!(store.len(), 2);
        let times: Vec<f64> = store.times().unwrap().iter().map(|t| t.value()).collect();
        assert_eq!(times, vec![0.0, 11.0]);
        assert_eq!(store.load(SimTime::new(11.0).unwrap()).unwrap().state, 2);
        assert!(matches!(
            store.load(SimTime::new(5.0).unwrap()),
            Err(SimError::NoCheckpoint(_))
        ));
        let states: Vec<i64> = store.iter().map(|c| c.state).collect();
        assert_eq!(states, vec![1, 2]);
    }

    #[test]
    fn test_directory_store() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::new(tmp.path().join("checkpoints")).unwrap();
        store.save(checkpoint(2.5, 7)).unwrap();
        store.save(checkpoint(22.0, 9)).unwrap();
        store.save(checkpoint(0.0, 3)).unwrap();
        fs::write(store.dir().join("notes.txt"), "ignored").unwrap();
        fs::write(store.dir().join("junk.json"), "{}").unwrap();
        fs::write(store.dir().join("022.json"), "{}").unwrap();
        fs::write(store.dir().join("2.2e1.json"), "{}").unwrap();
        fs::write(store.dir().join("1e1.json"), "{}").unwrap();

        assert!(store.path_for(SimTime::new(2.5).unwrap()).ends_with("2.5.json"));
        let times: Vec<f64> = CheckpointStore::<i64>::times(&store)
            .unwrap()
            .iter()
            .map(|t| t.value())
            .collect();
        assert_eq!(times, vec![0.0, 2.5, 22.0]);
        for time in CheckpointStore::<i64>::times(&store).unwrap() {
            let loaded: SimResult<Checkpoint<i64>> = store.load(time);
            assert!(loaded.is_ok(), "listed time {} does not load", time);
        }

        let loaded: Checkpoint<i64> = store.load(SimTime::new(22.0).unwrap()).unwrap();
        assert_eq!(loaded, checkpoint(22.0, 9));

        let missing: SimResult<Checkpoint<i64>> = store.load(SimTime::new(1.0).unwrap());
        assert!(matches!(missing, Err(SimError::NoCheckpoint(_))));
    }

    #[test]
    fn test_shared_store() {
        let shared = Rc::new(RefCell::new(MemoryStore::new()));
        let mut handle = Rc::clone(&shared);
        handle.save(checkpoint(1.0, 1)).unwrap();
        assert_eq!(shared.borrow().len(), 1);
    }
}
