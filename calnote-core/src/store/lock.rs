//! Run lock serializing sync passes.
//!
//! The lock is a slot holding `"true"` or `"false"`, taken with a single
//! atomic claim on the store. Acquiring returns a guard; dropping the guard releases the lock on every exit path, including
//! early returns through `?` and panics unwinding through the pass.

use std::sync::Arc;

use crate::error::{CalNoteError, CalNoteResult};
use crate::store::KeyValueStore;

const HELD: &str = "true";
const FREE: &str = "false";

#[derive(Clone)]
pub struct RunLock {
    store: Arc<dyn KeyValueStore>,
    slot: String,
}

impl RunLock {
    pub fn new(store: Arc<dyn KeyValueStore>, slot: impl Into<String>) -> Self {
        RunLock {
            store,
            slot: slot.into(),
        }
    }

    pub fn is_held(&self) -> CalNoteResult<bool> {
        Ok(self.store.get(&self.slot)?.is_some_and(|v| v.trim() == HELD))
    }

    /// Take the lock, or fail with `Locked` if another pass holds it.
    pub fn acquire(&self) -> CalNoteResult<RunLockGuard> {
        if !self.store.claim(&self.slot, HELD)? {
            return Err(CalNoteError::Locked);
        }
        tracing::debug!(slot = %self.slot, "Run lock acquired");

        Ok(RunLockGuard {
            lock: self.clone(),
            released: false,
        })
    }

    /// Clear a lock left behind by a killed process.
    pub fn force_release(&self) -> CalNoteResult<()> {
        self.store.put(&self.slot, FREE)
    }
}

/// Holds the run lock until released or dropped.
pub struct RunLockGuard {
    lock: RunLock,
    released: bool,
}

impl RunLockGuard {
    /// Release now and report whether the store accepted the write.
    pub fn release(mut self) -> CalNoteResult<()> {
        self.released = true;
        self.lock.store.put(&self.lock.slot, FREE)?;
        tracing::debug!(slot = %self.lock.slot, "Run lock released");
        Ok(())
    }
}

impl Drop for RunLockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.lock.store.put(&self.lock.slot, FREE) {
            tracing::error!(slot = %self.lock.slot, error = %e, "Failed to release run lock");
        }
    }
}
