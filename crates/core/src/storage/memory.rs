use super::tables::Tables;
use super::Backend;
use crate::ports::{StoreError, StoreResult};
use std::sync::Mutex;

/// Tables held in process memory.
///
/// Writes run against a draft copy that replaces the live tables only when the
/// closure succeeds, so a failed batch leaves nothing behind.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: Mutex<Tables>,
}

impl Backend for MemoryBackend {
    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> StoreResult<T> {
        let guard = self.tables.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(f(&guard))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self.tables.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut draft = guard.clone();
        let out = f(&mut draft)?;
        *guard = draft;
        Ok(out)
    }
}
