//! Key/value slots backing the snapshot cache, run lock and sync cursor.
//!
//! Each slot holds one opaque string that is only ever replaced whole.

mod cursor;
mod file;
mod lock;
mod memory;

pub use cursor::SyncCursor;
pub use file::FileStore;
pub use lock::{RunLock, RunLockGuard};
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};

use crate::error::CalNoteResult;

/// Single-slot, whole-replace storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, slot: &str) -> CalNoteResult<Option<String>>;
    fn put(&self, slot: &str, value: &str) -> CalNoteResult<()>;
    fn remove(&self, slot: &str) -> CalNoteResult<()>;

    /// Set the slot to `value` unless it already holds it, as one step no
    /// other writer can interleave with. Returns whether the write happened.
    fn claim(&self, slot: &str, value: &str) -> CalNoteResult<bool>;
}

/// Slot names for the three pieces of persistent state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Slots {
    pub snapshot: String,
    pub lock: String,
    pub cursor: String,
}

impl Default for Slots {
    fn default() -> Self {
        Slots {
            snapshot: "snapshot".to_string(),
            lock: "lock".to_string(),
            cursor: "sync_token".to_string(),
        }
    }
}
