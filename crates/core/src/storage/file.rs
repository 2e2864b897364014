//! JSON file backend.
//!
//! All tables are kept in a single `registry.json` document. Every call reloads the
//! document; every successful write serialises the whole document to a sibling temp file
//! and renames it over the original, so readers never observe a half-written registry.

use super::tables::Tables;
use super::Backend;
use crate::ports::{StoreError, StoreResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileBackend {
    /// Opens (or prepares) the registry document at `path`.
    ///
    /// The parent directory is created if needed. An existing document is parsed once so
    /// that a corrupt file is reported at startup rather than on first use.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::FileWrite` if the directory cannot be created and
    /// `StoreError::FileRead`/`StoreError::Deserialization` if an existing document cannot
    /// be loaded.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(StoreError::FileWrite)?;
        }

        let backend = Self {
            path,
            lock: Mutex::new(()),
        };
        backend.load()?;
        tracing::debug!("opened registry file {}", backend.path.display());
        Ok(backend)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StoreResult<Tables> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(StoreError::Deserialization),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Tables::default()),
            Err(e) => Err(StoreError::FileRead(e)),
        }
    }

    fn persist(&self, tables: &Tables) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(tables).map_err(StoreError::Serialization)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(StoreError::FileWrite)?;
        fs::rename(&tmp, &self.path).map_err(StoreError::FileWrite)?;
        tracing::debug!("wrote registry file {}", self.path.display());
        Ok(())
    }
}

impl Backend for JsonFileBackend {
    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> StoreResult<T> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let tables = self.load()?;
        Ok(f(&tables))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> StoreResult<T>) -> StoreResult<T> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut tables = self.load()?;
        let out = f(&mut tables)?;
        self.persist(&tables)?;
        Ok(out)
    }
}
