use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{CalNoteError, CalNoteResult};
use crate::store::KeyValueStore;

/// In-process store, used by tests and embedders that bring their own
/// persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> CalNoteResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.slots
            .lock()
            .map_err(|_| CalNoteError::Store("memory store poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, slot: &str) -> CalNoteResult<Option<String>> {
        Ok(self.slots()?.get(slot).cloned())
    }

    fn put(&self, slot: &str, value: &str) -> CalNoteResult<()> {
        self.slots()?.insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, slot: &str) -> CalNoteResult<()> {
        self.slots()?.remove(slot);
        Ok(())
    }

    fn claim(&self, slot: &str, value: &str) -> CalNoteResult<bool> {
        let mut slots = self.slots()?;
        if slots.get(slot).is_some_and(|v| v.trim() == value) {
            return Ok(false);
        }
        slots.insert(slot.to_string(), value.to_string());
        Ok(true)
    }
}
