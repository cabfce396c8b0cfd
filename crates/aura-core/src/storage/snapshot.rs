//! Snapshot persistence for [`AppState`].
//!
//! The whole state is one JSON blob in one named slot. Loading merges the
//! blob over the defaults so snapshots written by older builds pick up new
//! fields. Entries that no longer fit the state shape are dropped one by
//! one, and a field that still does not fit falls back to its default; the
//! rest of the blob is kept. Only a blob that is not JSON at all yields the
//! plain defaults. The undo slot is never written and always comes back
//! empty.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

use super::database::Database;
use crate::chat::{ChatMessage, ChatSession};
use crate::error::StoreError;
use crate::routine::RoutineBlueprint;
use crate::state::AppState;
use crate::task::Task;

/// A single persistent slot holding the serialized state.
pub trait SnapshotStore {
    fn read(&self) -> Result<Option<String>, StoreError>;
    fn write(&self, blob: &str) -> Result<(), StoreError>;
    /// Keep a copy of a blob that could not be loaded in full.
    fn backup(&self, blob: &str) -> Result<(), StoreError>;
}

/// How a snapshot came back from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// No blob yet.
    Empty,
    Clean,
    /// Some entries or fields were dropped.
    Repaired,
    /// The blob was not JSON; defaults were used.
    Corrupt,
    /// The store could not be read; defaults were used.
    Unreadable,
}

impl LoadStatus {
    /// Whether writing the loaded state back would lose stored data.
    pub fn is_lossy(&self) -> bool {
        matches!(self, LoadStatus::Repaired | LoadStatus::Corrupt | LoadStatus::Unreadable)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub state: AppState,
    pub status: LoadStatus,
    /// The blob as stored, when there was one.
    pub raw: Option<String>,
}

/// Read and decode the state, reporting how faithful the result is.
pub fn load_with_status(store: &dyn SnapshotStore) -> Loaded {
    match store.read() {
        Ok(Some(blob)) => {
            let (state, status) = decode_with_status(&blob);
            Loaded {
                state,
                status,
                raw: Some(blob),
            }
        }
        Ok(None) => Loaded {
            state: AppState::default(),
            status: LoadStatus::Empty,
            raw: None,
        },
        Err(e) => {
            warn!(error = %e, "snapshot read failed, starting from defaults");
            Loaded {
                state: AppState::default(),
                status: LoadStatus::Unreadable,
                raw: None,
            }
        }
    }
}

/// Read and decode the state. Never fails; problems are logged.
pub fn load(store: &dyn SnapshotStore) -> AppState {
    load_with_status(store).state
}

/// Serialize the state (minus the undo slot) and write it.
pub fn save(store: &dyn SnapshotStore, state: &AppState) -> Result<(), StoreError> {
    let blob = encode(state).map_err(|e| StoreError::QueryFailed(e.to_string()))?;
    store.write(&blob)
}

pub fn encode(state: &AppState) -> Result<String, serde_json::Error> {
    serde_json::to_string(state)
}

/// Parse `blob` and merge it over the defaults.
pub fn decode(blob: &str) -> AppState {
    decode_with_status(blob).0
}

fn decode_with_status(blob: &str) -> (AppState, LoadStatus) {
    let parsed: Value = match serde_json::from_str(blob) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "corrupt snapshot, using defaults");
            return (AppState::default(), LoadStatus::Corrupt);
        }
    };
    let Ok(Value::Object(defaults)) = serde_json::to_value(AppState::default()) else {
        return (AppState::default(), LoadStatus::Corrupt);
    };
    let Value::Object(overlay) = parsed else {
        warn!("snapshot is not an object, using defaults");
        return (AppState::default(), LoadStatus::Corrupt);
    };

    let mut merged = Value::Object(defaults.clone());
    merge(&mut merged, Value::Object(overlay));
    let Value::Object(mut fields) = merged else {
        return (AppState::default(), LoadStatus::Corrupt);
    };

    let dropped = retain_valid::<Task>(&mut fields, "tasks")
        + retain_valid::<RoutineBlueprint>(&mut fields, "routines")
        + retain_valid::<ChatMessage>(&mut fields, "chats")
        + retain_valid::<ChatSession>(&mut fields, "archived_chats");

    if let Ok(state) = serde_json::from_value::<AppState>(Value::Object(fields.clone())) {
        let status = if dropped > 0 {
            LoadStatus::Repaired
        } else {
            LoadStatus::Clean
        };
        return (state, status);
    }

    // Take the stored fields one at a time; any that break the shape keep
    // their default.
    let mut accepted = defaults;
    for (key, value) in fields {
        let mut trial = accepted.clone();
        trial.insert(key.clone(), value);
        if serde_json::from_value::<AppState>(Value::Object(trial.clone())).is_ok() {
            accepted = trial;
        } else {
            warn!(field = %key, "snapshot field does not fit, using its default");
        }
    }
    let state = serde_json::from_value(Value::Object(accepted)).unwrap_or_default();
    (state, LoadStatus::Repaired)
}

/// Drop the entries of the `key` array that do not decode as `T`.
/// Returns how many were dropped.
fn retain_valid<T: DeserializeOwned>(fields: &mut Map<String, Value>, key: &str) -> usize {
    let Some(Value::Array(items)) = fields.get_mut(key) else {
        return 0;
    };
    let before = items.len();
    items.retain(|item| match serde_json::from_value::<T>(item.clone()) {
        Ok(_) => true,
        Err(e) => {
            warn!(collection = key, error = %e, "dropping snapshot entry");
            false
        }
    });
    before - items.len()
}

/// Deep-merge `overlay` into `base`. Objects merge per key; nulls keep the
/// base value; everything else replaces it.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

// ── SQLite ──

/// Snapshot slot in the `kv` table.
pub struct SqliteSnapshotStore {
    db: Database,
    slot: String,
}

impl SqliteSnapshotStore {
    pub fn new(db: Database, slot: impl Into<String>) -> Self {
        Self {
            db,
            slot: slot.into(),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn read(&self) -> Result<Option<String>, StoreError> {
        self.db.kv_get(&self.slot)
    }

    fn write(&self, blob: &str) -> Result<(), StoreError> {
        self.db.kv_set(&self.slot, blob)
    }

    /// Stored beside the slot as `<slot>.backup`; a newer backup replaces it.
    fn backup(&self, blob: &str) -> Result<(), StoreError> {
        self.db.kv_set(&format!("{}.backup", self.slot), blob)
    }
}

// ── In-memory ──

#[derive(Debug, Default)]
struct MemorySlot {
    blob: Option<String>,
    backup: Option<String>,
    fail_writes: bool,
    writes: usize,
}

/// Process-local slot. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    inner: Arc<Mutex<MemorySlot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        let store = Self::default();
        store.set_blob(blob);
        store
    }

    fn lock(&self) -> MutexGuard<'_, MemorySlot> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn blob(&self) -> Option<String> {
        self.lock().blob.clone()
    }

    pub fn set_blob(&self, blob: impl Into<String>) {
        self.lock().blob = Some(blob.into());
    }

    pub fn backup_blob(&self) -> Option<String> {
        self.lock().backup.clone()
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Number of successful writes.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self.blob())
    }

    fn write(&self, blob: &str) -> Result<(), StoreError> {
        let mut slot = self.lock();
        if slot.fail_writes {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        slot.blob = Some(blob.to_string());
        slot.writes += 1;
        Ok(())
    }

    fn backup(&self, blob: &str) -> Result<(), StoreError> {
        let mut slot = self.lock();
        if slot.fail_writes {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        slot.backup = Some(blob.to_string());
        Ok(())
    }
}
