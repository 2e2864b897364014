use super::{EntityKind, HospitalId};
use crate::ports::Record;
use crate::{NonEmptyText, RegistryError, RegistryResult};
use serde::{Deserialize, Serialize};

/// A hospital held in the registry.
///
/// The identifier is `None` until the record has been saved; storage assigns it on the
/// first save and it never changes afterwards. All other fields are plain data and may be
/// mutated in place before an explicit save.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hospital {
    id: Option<HospitalId>,
    pub name: NonEmptyText,
    pub address: String,
    pub phone: String,
}

impl Hospital {
    /// Builds an unsaved hospital.
    pub fn new(name: NonEmptyText, address: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: None,
            name,
            address: address.into(),
            phone: phone.into(),
        }
    }

    pub fn id(&self) -> Option<HospitalId> {
        self.id
    }

    /// Returns the identifier, or `RegistryError::Unsaved` for a record never saved.
    pub fn require_id(&self) -> RegistryResult<HospitalId> {
        self.id.ok_or(RegistryError::Unsaved(EntityKind::Hospital))
    }
}

impl Record for Hospital {
    type Id = HospitalId;
    const KIND: EntityKind = EntityKind::Hospital;

    fn id(&self) -> Option<HospitalId> {
        self.id
    }

    fn assign_id(&mut self, id: HospitalId) {
        self.id = Some(id);
    }
}
