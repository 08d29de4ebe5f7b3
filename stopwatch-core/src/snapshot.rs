//! Persisted stopwatch snapshot and the best-effort adapter around a
//! key-value store.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::laps::{Lap, LapRecorder};

pub const STORAGE_KEY: &str = "stopwatch_state_v1";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage quota exceeded")]
    QuotaExceeded,
}

/// String key-value storage, e.g. a directory of files.
pub trait KeyValueStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).write(key, value)
    }
}

/// In-memory store; can be told to reject writes.
#[derive(Debug, Default)]
pub struct MemStore {
    entries: RefCell<HashMap<String, String>>,
    reject_writes: Cell<bool>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.set(reject);
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }
}

impl KeyValueStore for MemStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.reject_writes.get() {
            return Err(StoreError::QuotaExceeded);
        }
        self.insert(key, value);
        Ok(())
    }
}

/// What survives a reload. Running state is deliberately absent, so a
/// restored stopwatch is always paused.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PersistedState {
    pub accumulated_ms: u64,
    pub laps: LapRecorder,
}

#[derive(Serialize)]
struct SnapshotOut {
    elapsed: u64,
    laps: Vec<Lap>,
}

#[derive(Deserialize)]
struct SnapshotIn {
    #[serde(default)]
    elapsed: Option<serde_json::Number>,
    #[serde(default)]
    laps: Vec<Lap>,
}

impl PersistedState {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&SnapshotOut {
            elapsed: self.accumulated_ms,
            laps: self.laps.newest_first().copied().collect(),
        })
    }

    /// Parses a snapshot. Anything unusable yields `None`.
    pub fn from_json(raw: &str) -> Option<Self> {
        let parsed: SnapshotIn = serde_json::from_str(raw).ok()?;
        let accumulated_ms = match parsed.elapsed {
            Some(elapsed) => elapsed_ms(&elapsed)?,
            None => 0,
        };
        Some(Self {
            accumulated_ms,
            laps: LapRecorder::from_newest_first(parsed.laps)?,
        })
    }
}

/// Integers are taken exactly; only fractional values are rounded.
fn elapsed_ms(elapsed: &serde_json::Number) -> Option<u64> {
    if let Some(ms) = elapsed.as_u64() {
        return Some(ms);
    }
    let ms = elapsed.as_f64()?;
    if !ms.is_finite() {
        return None;
    }
    Some(ms.max(0.0).round() as u64)
}

/// Saves and loads [`PersistedState`] under a single key. Failures are
/// logged and swallowed; in-memory state is never affected.
pub struct Persistence<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> Persistence<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, STORAGE_KEY)
    }

    pub fn with_key(store: S, key: &str) -> Self {
        Self {
            store,
            key: key.to_string(),
        }
    }

    pub fn save(&self, state: &PersistedState) {
        let data = match state.to_json() {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Failed to encode stopwatch state: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.write(&self.key, &data) {
            log::warn!("Failed to save stopwatch state: {}", e);
        }
    }

    pub fn load(&self) -> Option<PersistedState> {
        match self.store.read(&self.key) {
            Ok(Some(raw)) => {
                let state = PersistedState::from_json(&raw);
                if state.is_none() {
                    log::warn!("Ignoring malformed stopwatch state under {:?}", self.key);
                }
                state
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Failed to load stopwatch state: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> PersistedState {
        let mut laps = LapRecorder::new();
        laps.record(1000);
        laps.record(2500);
        laps.record(2500);
        PersistedState {
            accumulated_ms: 4200,
            laps,
        }
    }

    #[test]
    fn test_round_trip() {
        let persistence = Persistence::new(MemStore::new());
        let state = sample_state();
        persistence.save(&state);
        assert_eq!(persistence.load(), Some(state));

        let empty = PersistedState::default();
        persistence.save(&empty);
        assert_eq!(persistence.load(), Some(empty));
    }

    #[test]
    fn test_schema_is_newest_first() {
        let json = sample_state().to_json().unwrap();
        assert_eq!(
            json,
            r#"{"elapsed":4200,"laps":[{"num":3,"totalMs":2500,"deltaMs":0},{"num":2,"totalMs":2500,"deltaMs":1500},{"num":1,"totalMs":1000,"deltaMs":1000}]}"#
        );
    }

    #[test]
    fn test_missing_key_loads_none() {
        let persistence = Persistence::new(MemStore::new());
        assert_eq!(persistence.load(), None);
    }

    #[test]
    fn test_malformed_data_loads_none() {
        let store = MemStore::new();
        for raw in [
            "not json",
            r#"{"elapsed":"soon"}"#,
            r#"{"elapsed":10,"laps":[{"num":2,"totalMs":5,"deltaMs":5}]}"#,
            r#"{"elapsed":10,"laps":"nope"}"#,
        ] {
            store.insert(STORAGE_KEY, raw);
            assert_eq!(Persistence::new(&store).load(), None, "{}", raw);
        }
    }

    #[test]
    fn test_lenient_fields() {
        let store = MemStore::new();
        store.insert(
            STORAGE_KEY,
            r#"{"elapsed":1500.6,"laps":[{"num":1,"total":900,"deltaMs":900}]}"#,
        );
        let state = Persistence::new(&store).load().unwrap();
        assert_eq!(state.accumulated_ms, 1501);
        assert_eq!(state.laps.latest().map(|l| l.total_ms), Some(900));

        store.insert(STORAGE_KEY, "{}");
        assert_eq!(
            Persistence::new(&store).load(),
            Some(PersistedState::default())
        );
    }

    #[test]
    fn test_large_elapsed_is_exact() {
        let persistence = Persistence::new(MemStore::new());
        let state = PersistedState {
            accumulated_ms: (1u64 << 53) + 1,
            laps: LapRecorder::new(),
        };
        persistence.save(&state);
        assert_eq!(persistence.load(), Some(state));

        assert_eq!(
            PersistedState::from_json(r#"{"elapsed":-3,"laps":[]}"#).map(|s| s.accumulated_ms),
            Some(0)
        );
    }

    #[test]
    fn test_failed_write_is_swallowed() {
        let store = MemStore::new();
        let persistence = Persistence::new(&store);
        persistence.save(&sample_state());

        store.reject_writes(true);
        persistence.save(&PersistedState::default());
        // The earlier snapshot is still there.
        assert_eq!(persistence.load(), Some(sample_state()));
    }
}
