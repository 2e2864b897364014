//! Constants used throughout the registry core crate.
//!
//! This module contains path, filename and environment variable names to ensure
//! consistency across the codebase and the binaries.

/// Default directory for registry data when no explicit directory is configured.
pub const DEFAULT_REGISTRY_DATA_DIR: &str = "registry_data";

/// Filename of the JSON document holding all registry tables.
pub const REGISTRY_FILE_NAME: &str = "registry.json";

/// Environment variable naming the registry data directory.
pub const DATA_DIR_ENV: &str = "REGISTRY_DATA_DIR";

/// Environment variable selecting the storage backend (`file` or `memory`).
pub const STORAGE_ENV: &str = "REGISTRY_STORAGE";

/// Environment variable pointing at an optional YAML seed manifest.
pub const SEED_FILE_ENV: &str = "REGISTRY_SEED_FILE";
