//! Snapshot of the last converged event set.
//!
//! The snapshot is stored as one JSON blob in a single slot and is only ever
//! replaced whole. A blob that can't be read is treated as absent, which puts
//! the next pass on the bootstrap path (no provider writes).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CalNoteError, CalNoteResult};
use crate::event::Event;
use crate::store::KeyValueStore;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub committed_at: DateTime<Utc>,
    pub events: Vec<Event>,
}

impl Snapshot {
    pub fn new(events: Vec<Event>) -> Self {
        Snapshot {
            version: SNAPSHOT_VERSION,
            committed_at: Utc::now(),
            events,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Event> {
        if id.is_empty() {
            return None;
        }
        self.events.iter().find(|e| e.id == id)
    }

    pub fn to_json(&self) -> CalNoteResult<String> {
        serde_json::to_string(self).map_err(|e| CalNoteError::Serialization(e.to_string()))
    }

    pub fn from_json(blob: &str) -> CalNoteResult<Self> {
        let snapshot: Snapshot =
            serde_json::from_str(blob).map_err(|e| CalNoteError::Snapshot(e.to_string()))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CalNoteError::Snapshot(format!(
                "Unsupported snapshot version {}",
                snapshot.version
            )));
        }

        Ok(snapshot)
    }
}

/// Reads and commits snapshots through a key/value slot.
#[derive(Clone)]
pub struct SnapshotCache {
    store: Arc<dyn KeyValueStore>,
    slot: String,
}

impl SnapshotCache {
    pub fn new(store: Arc<dyn KeyValueStore>, slot: impl Into<String>) -> Self {
        SnapshotCache {
            store,
            slot: slot.into(),
        }
    }

    /// Load the last snapshot; unreadable contents read as absent.
    pub fn get(&self) -> CalNoteResult<Option<Snapshot>> {
        let Some(blob) = self.store.get(&self.slot)? else {
            return Ok(None);
        };

        match Snapshot::from_json(&blob) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                tracing::warn!(slot = %self.slot, error = %e, "Discarding unreadable snapshot");
                Ok(None)
            }
        }
    }

    pub fn put(&self, snapshot: &Snapshot) -> CalNoteResult<()> {
        self.store.put(&self.slot, &snapshot.to_json()?)
    }

    pub fn clear(&self) -> CalNoteResult<()> {
        self.store.remove(&self.slot)
    }
}
