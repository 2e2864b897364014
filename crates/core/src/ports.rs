//! Storage port.
//!
//! The services depend on these traits only. A store persists two record kinds
//! ([`Hospital`](crate::Hospital) and [`Patient`](crate::Patient)) by identifier, plus the
//! join table of [`Link`] rows that relates them. Concrete adapters live in
//! [`storage`](crate::storage).
//!
//! ## Contract
//!
//! - `save` inserts when the record has no id (assigning one) and otherwise updates the row
//!   with that id, inserting it if it has gone missing. Assignment never reuses an id held
//!   by another row: it fails with [`StoreError::IdTaken`] or [`StoreError::IdsExhausted`].
//! - `find_by_id` returns `Ok(None)` for an unknown id; `Err` is reserved for storage faults.
//! - `delete` fails with [`StoreError::Missing`] when the row does not exist and with
//!   [`StoreError::StillLinked`] while link rows still reference it.
//! - Link batches passed to `insert`/`remove` are applied all-or-nothing. Inserting an
//!   existing link or removing an absent one is a no-op.

use crate::entities::{EntityKind, HospitalId, PatientId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors raised by storage adapters.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {id} does not exist in storage")]
    Missing { kind: EntityKind, id: u64 },
    #[error("{kind} {id} is still linked and cannot be deleted")]
    StillLinked { kind: EntityKind, id: u64 },
    #[error("cannot assign {kind} id {id}: a row with that id already exists")]
    IdTaken { kind: EntityKind, id: u64 },
    #[error("no {kind} ids left to assign")]
    IdsExhausted { kind: EntityKind },
    #[error("failed to read registry file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write registry file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize registry: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize registry: {0}")]
    Deserialization(serde_json::Error),
    #[error("storage lock poisoned")]
    LockPoisoned,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A record kind the storage port can persist.
pub trait Record: Clone + Send + Sync + 'static {
    type Id: Copy + Ord + fmt::Display + fmt::Debug + Send + Sync + From<u64> + Into<u64>;

    const KIND: EntityKind;

    fn id(&self) -> Option<Self::Id>;

    /// Called by storage when the record is first saved.
    fn assign_id(&mut self, id: Self::Id);
}

/// Persistence by identifier for one record kind.
pub trait Repository<R: Record>: Send + Sync {
    fn save(&self, record: R) -> StoreResult<R>;

    fn find_by_id(&self, id: R::Id) -> StoreResult<Option<R>>;

    fn find_all(&self) -> StoreResult<Vec<R>>;

    fn delete(&self, id: R::Id) -> StoreResult<()>;
}

/// One row of the hospital/patient join table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Link {
    pub hospital: HospitalId,
    pub patient: PatientId,
}

impl Link {
    pub fn new(hospital: HospitalId, patient: PatientId) -> Self {
        Self { hospital, patient }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hospital {} <-> patient {}", self.hospital, self.patient)
    }
}

/// Persistence of the join table.
pub trait LinkRepository: Send + Sync {
    fn find_all(&self) -> StoreResult<Vec<Link>>;

    fn find_by_hospital(&self, hospital: HospitalId) -> StoreResult<Vec<Link>> {
        Ok(self
            .find_all()?
            .into_iter()
            .filter(|link| link.hospital == hospital)
            .collect())
    }

    fn find_by_patient(&self, patient: PatientId) -> StoreResult<Vec<Link>> {
        Ok(self
            .find_all()?
            .into_iter()
            .filter(|link| link.patient == patient)
            .collect())
    }

    fn insert(&self, links: &[Link]) -> StoreResult<()>;

    fn remove(&self, links: &[Link]) -> StoreResult<()>;
}
