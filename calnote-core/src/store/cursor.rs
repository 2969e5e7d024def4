//! Resumable calendar sync token.

use std::sync::Arc;

use crate::error::CalNoteResult;
use crate::store::KeyValueStore;

#[derive(Clone)]
pub struct SyncCursor {
    store: Arc<dyn KeyValueStore>,
    slot: String,
}

impl SyncCursor {
    pub fn new(store: Arc<dyn KeyValueStore>, slot: impl Into<String>) -> Self {
        SyncCursor {
            store,
            slot: slot.into(),
        }
    }

    pub fn load(&self) -> CalNoteResult<Option<String>> {
        Ok(self
            .store
            .get(&self.slot)?
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty()))
    }

    pub fn save(&self, token: &str) -> CalNoteResult<()> {
        self.store.put(&self.slot, token)
    }

    pub fn clear(&self) -> CalNoteResult<()> {
        self.store.remove(&self.slot)
    }
}
