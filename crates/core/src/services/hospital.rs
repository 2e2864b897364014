//! Hospital operations.

use crate::association::Associations;
use crate::entities::{EntityKind, Hospital, HospitalId, Patient, PatientId};
use crate::storage::Stores;
use crate::{NonEmptyText, RegistryError, RegistryResult};
use std::collections::BTreeSet;

/// CRUD and association-aware deletion for hospitals.
#[derive(Clone, Debug)]
pub struct HospitalService {
    stores: Stores,
}

impl HospitalService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Creates a new hospital with no patients and saves it.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the hospital; must not be blank
    /// * `address` - Postal address
    /// * `phone` - Phone number
    ///
    /// # Returns
    ///
    /// The saved `Hospital`, now carrying its storage-assigned id.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Text` for a blank name and `RegistryError::Persistence` if the
    /// store rejects the insert.
    pub fn create_hospital(
        &self,
        name: &str,
        address: &str,
        phone: &str,
    ) -> RegistryResult<Hospital> {
        let hospital = Hospital::new(NonEmptyText::new(name)?, address, phone);
        let saved = self.stores.hospitals.save(hospital)?;
        tracing::info!("created hospital {} ({})", saved.require_id()?, saved.name);
        Ok(saved)
    }

    /// Finds a hospital by id. An unknown id is `Ok(None)`, not an error.
    pub fn find_hospital_by_id(&self, id: HospitalId) -> RegistryResult<Option<Hospital>> {
        Ok(self.stores.hospitals.find_by_id(id)?)
    }

    fn require_hospital(&self, id: HospitalId) -> RegistryResult<Hospital> {
        self.find_hospital_by_id(id)?
            .ok_or_else(|| RegistryError::not_found(EntityKind::Hospital, id))
    }

    /// Overwrites name, address and phone of an existing hospital.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if no hospital has this id, checked before any
    /// field is touched.
    pub fn update_hospital_by_id(
        &self,
        id: HospitalId,
        name: &str,
        address: &str,
        phone: &str,
    ) -> RegistryResult<Hospital> {
        let mut hospital = self.require_hospital(id)?;
        hospital.name = NonEmptyText::new(name)?;
        hospital.address = address.to_string();
        hospital.phone = phone.to_string();

        let saved = self.save_hospital(hospital)?;
        tracing::info!("updated hospital {}", id);
        Ok(saved)
    }

    /// Deletes a hospital after detaching it from every patient.
    ///
    /// Patients are not deleted; they simply no longer list this hospital. The operation is
    /// all-or-nothing: the link rows are removed in one batch, and if the hospital row then
    /// cannot be deleted the links are put back before the error is returned.
    ///
    /// # Returns
    ///
    /// The ids of the patients that were detached.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` for an unknown id, `RegistryError::Persistence` if
    /// storage fails, or `RegistryError::RollbackFailed` if restoring links after a failed
    /// delete also fails.
    pub fn delete_hospital_by_id(&self, id: HospitalId) -> RegistryResult<BTreeSet<PatientId>> {
        self.require_hospital(id)?;

        let mut graph = Associations::from_links(self.stores.links.find_by_hospital(id)?);
        let severed = graph.sever_hospital(id);
        self.stores.links.remove(&severed)?;

        if let Err(e) = self.stores.hospitals.delete(id) {
            return Err(super::restore_links(
                self.stores.links.as_ref(),
                "delete hospital",
                &severed,
                e.into(),
            ));
        }

        tracing::info!(
            "deleted hospital {} and detached {} patient(s)",
            id,
            severed.len()
        );
        Ok(severed.into_iter().map(|link| link.patient).collect())
    }

    /// Lists the patients registered at `hospital`, ordered by id.
    ///
    /// Link rows pointing at a patient that no longer exists are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Unsaved` if the hospital has never been saved.
    pub fn list_patients_by_hospital(&self, hospital: &Hospital) -> RegistryResult<Vec<Patient>> {
        let id = hospital.require_id()?;
        let graph = Associations::from_links(self.stores.links.find_by_hospital(id)?);

        let mut patients = Vec::new();
        for patient_id in graph.patients_of(id) {
            match self.stores.patients.find_by_id(patient_id)? {
                Some(patient) => patients.push(patient),
                None => tracing::warn!("hospital {} links to missing patient {}", id, patient_id),
            }
        }
        Ok(patients)
    }

    /// Saves the hospital as-is (insert or update).
    pub fn save_hospital(&self, hospital: Hospital) -> RegistryResult<Hospital> {
        Ok(self.stores.hospitals.save(hospital)?)
    }

    pub fn find_all_hospitals(&self) -> RegistryResult<Vec<Hospital>> {
        Ok(self.stores.hospitals.find_all()?)
    }
}
