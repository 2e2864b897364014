//! Storage adapters.
//!
//! [`TableStore`] implements every port in [`ports`](crate::ports) on top of a [`Backend`]
//! that owns the [`Tables`](tables::Tables). Two backends ship with the crate:
//!
//! - [`MemoryBackend`]: tables in process memory ([`MemoryStore`])
//! - [`JsonFileBackend`]: tables in `<data_dir>/registry.json` ([`FileStore`])
//!
//! Each backend call is all-or-nothing: a closure that returns `Err` leaves the stored
//! tables exactly as they were.

mod file;
mod memory;
pub mod tables;

pub use file::JsonFileBackend;
pub use memory::MemoryBackend;

use crate::config::{CoreConfig, StorageBackend};
use crate::entities::{Hospital, HospitalId, Patient, PatientId};
use crate::ports::{Link, LinkRepository, Record, Repository, StoreResult};
use crate::RegistryResult;
use std::path::PathBuf;
use std::sync::Arc;
use tables::{TableOf, Tables};

/// Owner of the registry tables between calls.
pub trait Backend: Send + Sync {
    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> StoreResult<T>;

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> StoreResult<T>) -> StoreResult<T>;
}

/// Relational-style store over a [`Backend`].
#[derive(Debug, Default)]
pub struct TableStore<B> {
    backend: B,
}

pub type MemoryStore = TableStore<MemoryBackend>;
pub type FileStore = TableStore<JsonFileBackend>;

impl TableStore<MemoryBackend> {
    pub fn in_memory() -> Self {
        Self::default()
    }
}

impl TableStore<JsonFileBackend> {
    /// Opens the JSON registry document at `path`.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        Ok(Self {
            backend: JsonFileBackend::open(path)?,
        })
    }
}

impl<B, R> Repository<R> for TableStore<B>
where
    B: Backend,
    R: Record,
    Tables: TableOf<R>,
{
    fn save(&self, record: R) -> StoreResult<R> {
        self.backend
            .write(|tables| TableOf::<R>::table_mut(tables).save(record))
    }

    fn find_by_id(&self, id: R::Id) -> StoreResult<Option<R>> {
        self.backend
            .read(|tables| TableOf::<R>::table(tables).find(id))
    }

    fn find_all(&self) -> StoreResult<Vec<R>> {
        self.backend.read(|tables| TableOf::<R>::table(tables).all())
    }

    fn delete(&self, id: R::Id) -> StoreResult<()> {
        self.backend.write(|tables| tables.delete::<R>(id))
    }
}

impl<B: Backend> LinkRepository for TableStore<B> {
    fn find_all(&self) -> StoreResult<Vec<Link>> {
        self.backend
            .read(|tables| tables.links().copied().collect())
    }

    fn find_by_hospital(&self, hospital: HospitalId) -> StoreResult<Vec<Link>> {
        self.backend.read(|tables| {
            tables
                .links()
                .filter(|link| link.hospital == hospital)
                .copied()
                .collect()
        })
    }

    fn find_by_patient(&self, patient: PatientId) -> StoreResult<Vec<Link>> {
        self.backend.read(|tables| {
            tables
                .links()
                .filter(|link| link.patient == patient)
                .copied()
                .collect()
        })
    }

    fn insert(&self, links: &[Link]) -> StoreResult<()> {
        self.backend.write(|tables| tables.insert_links(links))
    }

    fn remove(&self, links: &[Link]) -> StoreResult<()> {
        self.backend.write(|tables| {
            tables.remove_links(links);
            Ok(())
        })
    }
}

/// The three storage ports the services depend on.
#[derive(Clone)]
pub struct Stores {
    pub hospitals: Arc<dyn Repository<Hospital>>,
    pub patients: Arc<dyn Repository<Patient>>,
    pub links: Arc<dyn LinkRepository>,
}

impl Stores {
    /// Uses one store for all three ports.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: Repository<Hospital> + Repository<Patient> + LinkRepository + 'static,
    {
        Self {
            hospitals: store.clone(),
            patients: store.clone(),
            links: store,
        }
    }

    pub fn in_memory() -> Self {
        Self::shared(Arc::new(MemoryStore::in_memory()))
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

/// Opens the stores selected by the configuration.
///
/// # Errors
///
/// Returns `RegistryError::Persistence` if the registry file cannot be opened.
pub fn open_stores(cfg: &CoreConfig) -> RegistryResult<Stores> {
    match cfg.storage() {
        StorageBackend::Memory => {
            tracing::info!("using in-memory registry storage");
            Ok(Stores::in_memory())
        }
        StorageBackend::File => {
            let path = cfg.registry_file();
            tracing::info!("using registry file {}", path.display());
            Ok(Stores::shared(Arc::new(FileStore::open(path)?)))
        }
    }
}
