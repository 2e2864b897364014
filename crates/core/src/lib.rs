//! # Registry Core
//!
//! Core business logic for the hospital/patient registry.
//!
//! This crate contains pure data operations:
//! - Hospital and patient records with storage-assigned identifiers
//! - The many-to-many association between them, kept symmetric by a single module
//! - CRUD services with association-aware deletes
//! - A storage port plus in-memory and JSON-file adapters
//!
//! **No transport concerns**: command-line handling and process bootstrap belong in the
//! `registry-cli` crate and the `registry-run` binary.

pub mod association;
pub mod config;
pub mod constants;
pub mod entities;
pub mod error;
pub mod ports;
pub mod seed;
pub mod services;
pub mod storage;

pub use association::Associations;
pub use config::{CoreConfig, StorageBackend};
pub use entities::{EntityKind, Hospital, HospitalId, NewPatient, Patient, PatientId, Sex};
pub use error::{RegistryError, RegistryResult};
pub use ports::{Link, LinkRepository, Record, Repository, StoreError, StoreResult};
pub use registry_types::{EmailAddress, NonEmptyText, TextError};
pub use services::{HospitalService, PatientService, Registration};
pub use storage::{open_stores, Stores};

/// Builds both services over the stores selected by `cfg`.
///
/// # Errors
///
/// Returns `RegistryError::Persistence` if the configured store cannot be opened.
pub fn open_registry(cfg: &CoreConfig) -> RegistryResult<(HospitalService, PatientService)> {
    let stores = open_stores(cfg)?;
    Ok((
        HospitalService::new(stores.clone()),
        PatientService::new(stores),
    ))
}
