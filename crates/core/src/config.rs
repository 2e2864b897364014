//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Environment variables are read by the binaries only; the core
//! never consults the process environment while handling a request.

use crate::constants::{DEFAULT_REGISTRY_DATA_DIR, REGISTRY_FILE_NAME};
use crate::{RegistryError, RegistryResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which storage adapter backs the services.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StorageBackend {
    /// Tables live in process memory and vanish on exit.
    Memory,
    /// Tables are persisted to `registry.json` under the data directory.
    #[default]
    File,
}

impl FromStr for StorageBackend {
    type Err = RegistryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "file" | "json" => Ok(Self::File),
            other => Err(RegistryError::InvalidInput(format!(
                "unknown storage backend '{other}' (expected 'file' or 'memory')"
            ))),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::File => write!(f, "file"),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    storage: StorageBackend,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidInput` if the file backend is selected with an empty
    /// data directory path.
    pub fn new(data_dir: PathBuf, storage: StorageBackend) -> RegistryResult<Self> {
        if storage == StorageBackend::File && data_dir.as_os_str().is_empty() {
            return Err(RegistryError::InvalidInput(
                "data directory cannot be empty for the file backend".into(),
            ));
        }

        Ok(Self { data_dir, storage })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn registry_file(&self) -> PathBuf {
        self.data_dir.join(REGISTRY_FILE_NAME)
    }

    pub fn storage(&self) -> StorageBackend {
        self.storage
    }
}

/// Resolve the data directory from an optional value, falling back to the default.
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REGISTRY_DATA_DIR))
}

/// Parse the storage backend from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the file backend.
pub fn storage_backend_from_env_value(value: Option<String>) -> RegistryResult<StorageBackend> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value.map(|v| v.parse::<StorageBackend>()).transpose()?;

    Ok(parsed.unwrap_or_default())
}
