//! Patient operations, including registration at hospitals.

use crate::association::Associations;
use crate::entities::{EntityKind, Hospital, HospitalId, NewPatient, Patient, PatientId};
use crate::ports::Link;
use crate::storage::Stores;
use crate::{EmailAddress, NonEmptyText, RegistryError, RegistryResult};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Outcome of [`PatientService::register_patient`].
///
/// Registration is written eagerly: when either variant is returned the link is durable in
/// storage and visible from both the patient and the hospital. No follow-up save of either
/// entity is needed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    /// A new link row was written.
    Linked(Link),
    /// The link already existed; nothing was written.
    AlreadyLinked(Link),
}

impl Registration {
    pub fn link(&self) -> Link {
        match self {
            Self::Linked(link) | Self::AlreadyLinked(link) => *link,
        }
    }

    /// True when this call wrote to storage.
    pub fn wrote_link(&self) -> bool {
        matches!(self, Self::Linked(_))
    }
}

/// CRUD, registration and association-aware deletion for patients.
#[derive(Clone, Debug)]
pub struct PatientService {
    stores: Stores,
}

impl PatientService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Creates a new patient with no hospitals and saves it.
    ///
    /// # Arguments
    ///
    /// * `first_name` - Given name; must not be blank
    /// * `last_name` - Family name; must not be blank
    /// * `date_of_birth` - Date of birth
    /// * `email` - Contact email; must be a well-formed address
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Text` on invalid input and `RegistryError::Persistence` if the
    /// store rejects the insert.
    pub fn create_patient(
        &self,
        first_name: &str,
        last_name: &str,
        date_of_birth: NaiveDate,
        email: &str,
    ) -> RegistryResult<Patient> {
        let patient = Patient::new(
            NonEmptyText::new(first_name)?,
            NonEmptyText::new(last_name)?,
            date_of_birth,
            EmailAddress::parse(email)?,
        );
        self.insert(patient)
    }

    /// Creates a patient with every field, including address, phone, sex and diagnosis.
    pub fn create_patient_with_details(&self, details: NewPatient) -> RegistryResult<Patient> {
        self.insert(details.into_patient()?)
    }

    fn insert(&self, patient: Patient) -> RegistryResult<Patient> {
        let saved = self.stores.patients.save(patient)?;
        tracing::info!("created patient {} ({})", saved.require_id()?, saved.full_name());
        Ok(saved)
    }

    /// Finds a patient by id. An unknown id is `Ok(None)`, not an error.
    pub fn find_patient_by_id(&self, id: PatientId) -> RegistryResult<Option<Patient>> {
        Ok(self.stores.patients.find_by_id(id)?)
    }

    fn require_patient(&self, id: PatientId) -> RegistryResult<Patient> {
        self.find_patient_by_id(id)?
            .ok_or_else(|| RegistryError::not_found(EntityKind::Patient, id))
    }

    /// Overwrites first name, last name and email of an existing patient.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if no patient has this id, checked before any
    /// field is touched.
    pub fn update_patient_by_id(
        &self,
        id: PatientId,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> RegistryResult<Patient> {
        let mut patient = self.require_patient(id)?;
        patient.first_name = NonEmptyText::new(first_name)?;
        patient.last_name = NonEmptyText::new(last_name)?;
        patient.email = EmailAddress::parse(email)?;

        let saved = self.save_patient(patient)?;
        tracing::info!("updated patient {}", id);
        Ok(saved)
    }

    /// Deletes a patient after detaching it from every hospital.
    ///
    /// Mirror image of [`HospitalService::delete_hospital_by_id`](super::HospitalService::delete_hospital_by_id),
    /// with the same all-or-nothing guarantee.
    ///
    /// # Returns
    ///
    /// The ids of the hospitals the patient was detached from.
    pub fn delete_patient_by_id(&self, id: PatientId) -> RegistryResult<BTreeSet<HospitalId>> {
        self.require_patient(id)?;

        let mut graph = Associations::from_links(self.stores.links.find_by_patient(id)?);
        let severed = graph.sever_patient(id);
        self.stores.links.remove(&severed)?;

        if let Err(e) = self.stores.patients.delete(id) {
            return Err(super::restore_links(
                self.stores.links.as_ref(),
                "delete patient",
                &severed,
                e.into(),
            ));
        }

        tracing::info!(
            "deleted patient {} and detached {} hospital(s)",
            id,
            severed.len()
        );
        Ok(severed.into_iter().map(|link| link.hospital).collect())
    }

    /// Registers `patient` at `hospital`.
    ///
    /// Adds the hospital to the patient's hospitals and the patient to the hospital's
    /// patients in one step by writing a single link row. Registering the same pair again
    /// changes nothing and reports [`Registration::AlreadyLinked`].
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Unsaved` if either record has never been saved,
    /// `RegistryError::NotFound` if either no longer exists in storage, and
    /// `RegistryError::Persistence` if the link cannot be written.
    pub fn register_patient(
        &self,
        patient: &Patient,
        hospital: &Hospital,
    ) -> RegistryResult<Registration> {
        let (patient_id, hospital_id) = self.require_pair(patient, hospital)?;
        let link = Link::new(hospital_id, patient_id);

        let mut graph = Associations::from_links(self.stores.links.find_by_patient(patient_id)?);
        if !graph.link(hospital_id, patient_id) {
            tracing::debug!("patient {} already registered at hospital {}", patient_id, hospital_id);
            return Ok(Registration::AlreadyLinked(link));
        }

        self.stores.links.insert(&[link])?;
        tracing::info!("registered patient {} at hospital {}", patient_id, hospital_id);
        Ok(Registration::Linked(link))
    }

    /// Removes the registration of `patient` at `hospital` from both sides.
    ///
    /// # Returns
    ///
    /// `true` if a link was removed, `false` if the pair was not registered.
    pub fn unregister_patient(&self, patient: &Patient, hospital: &Hospital) -> RegistryResult<bool> {
        let (patient_id, hospital_id) = self.require_pair(patient, hospital)?;

        let mut graph = Associations::from_links(self.stores.links.find_by_patient(patient_id)?);
        if !graph.unlink(hospital_id, patient_id) {
            return Ok(false);
        }

        self.stores
            .links
            .remove(&[Link::new(hospital_id, patient_id)])?;
        tracing::info!("unregistered patient {} from hospital {}", patient_id, hospital_id);
        Ok(true)
    }

    fn require_pair(
        &self,
        patient: &Patient,
        hospital: &Hospital,
    ) -> RegistryResult<(PatientId, HospitalId)> {
        let patient_id = patient.require_id()?;
        let hospital_id = hospital.require_id()?;

        self.require_patient(patient_id)?;
        if self.stores.hospitals.find_by_id(hospital_id)?.is_none() {
            return Err(RegistryError::not_found(EntityKind::Hospital, hospital_id));
        }

        Ok((patient_id, hospital_id))
    }

    /// Sets (or replaces) the diagnosis of an existing patient. Blank text clears it.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` for an unknown id.
    pub fn add_diagnosis_by_id(&self, id: PatientId, diagnosis: &str) -> RegistryResult<Patient> {
        let mut patient = self.require_patient(id)?;
        patient.diagnosis = NonEmptyText::new(diagnosis)
            .ok()
            .map(|text| text.as_str().to_string());

        let saved = self.save_patient(patient)?;
        tracing::info!("recorded diagnosis for patient {}", id);
        Ok(saved)
    }

    /// Lists the hospitals `patient` is registered at, ordered by id.
    pub fn list_hospital_by_patient(&self, patient: &Patient) -> RegistryResult<Vec<Hospital>> {
        let id = patient.require_id()?;
        let graph = Associations::from_links(self.stores.links.find_by_patient(id)?);

        let mut hospitals = Vec::new();
        for hospital_id in graph.hospitals_of(id) {
            match self.stores.hospitals.find_by_id(hospital_id)? {
                Some(hospital) => hospitals.push(hospital),
                None => tracing::warn!("patient {} links to missing hospital {}", id, hospital_id),
            }
        }
        Ok(hospitals)
    }

    /// Saves the patient as-is (insert or update).
    pub fn save_patient(&self, patient: Patient) -> RegistryResult<Patient> {
        Ok(self.stores.patients.save(patient)?)
    }

    pub fn find_all_patients(&self) -> RegistryResult<Vec<Patient>> {
        Ok(self.stores.patients.find_all()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Sex;
    use crate::ports::StoreError;
    use crate::services::testing::{date_of_birth, flaky_services, services, FlakyStore};
    use crate::services::HospitalService;

    fn tum_and_lmu(hospitals: &HospitalService) -> (Hospital, Hospital) {
        let tum = hospitals
            .create_hospital("TUM Klinikum", "Ismaninger Straße 22", "123-456-789")
            .unwrap();
        let lmu = hospitals
            .create_hospital("LMU Klinikum", "Garchinger Straße 33", "789-456-123")
            .unwrap();
        (tum, lmu)
    }

    #[test]
    fn test_create_patient() {
        let (_, patients) = services();

        let patient = patients
            .create_patient("Max", "Tum", date_of_birth(), "max.tum@tum.de")
            .expect("create should succeed");

        assert!(patient.id().is_some());
        assert_eq!(patient.first_name.as_str(), "Max");
        assert_eq!(patient.last_name.as_str(), "Tum");
        assert_eq!(patient.email.as_str(), "max.tum@tum.de");
        assert_eq!(patient.diagnosis, None);
    }

    #[test]
    fn test_create_patient_with_details() {
        let (_, patients) = services();

        let patient = patients
            .create_patient_with_details(NewPatient {
                first_name: "Felix".into(),
                last_name: "Mann".into(),
                address: Some("Arcisstraße 21".into()),
                email: "felix.mann@tum.de".into(),
                phone: Some("089 1234".into()),
                date_of_birth: date_of_birth(),
                sex: Some(Sex::Male),
                diagnosis: None,
            })
            .expect("create should succeed");

        let stored = patients
            .find_patient_by_id(patient.require_id().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(stored.address.as_deref(), Some("Arcisstraße 21"));
        assert_eq!(stored.sex, Some(Sex::Male));
    }

    #[test]
    fn test_update_patient() {
        let (_, patients) = services();
        let patient = patients
            .create_patient("Max", "Tum", date_of_birth(), "max.tum@tum.de")
            .unwrap();
        let id = patient.require_id().unwrap();

        patients
            .update_patient_by_id(id, "Max", "Tum", "max.tum@gmail.com")
            .expect("update should succeed");
        let updated = patients
            .find_patient_by_id(id)
            .unwrap()
            .expect("patient should still exist");

        assert_ne!(updated.email.as_str(), "max.tum@tum.de");
        assert_eq!(updated.email.as_str(), "max.tum@gmail.com");
    }

    #[test]
    fn test_update_unknown_patient_is_not_found() {
        let (_, patients) = services();

        let err = patients
            .update_patient_by_id(PatientId::new(7), "Max", "Tum", "max.tum@gmail.com")
            .expect_err("update of unknown id should fail");

        assert!(matches!(
            err,
            RegistryError::NotFound {
                kind: EntityKind::Patient,
                id: 7
            }
        ));
    }

    #[test]
    fn test_delete_patient() {
        let (_, patients) = services();
        let patient = patients
            .create_patient("Max", "Tum", date_of_birth(), "max.tum@tum.de")
            .unwrap();
        let id = patient.require_id().unwrap();

        patients.delete_patient_by_id(id).expect("delete should succeed");

        assert_eq!(patients.find_patient_by_id(id).unwrap(), None);
    }

    #[test]
    fn test_delete_unknown_patient_is_not_found() {
        let (_, patients) = services();
        let err = patients
            .delete_patient_by_id(PatientId::new(3))
            .expect_err("delete of unknown id should fail");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_patient_detaches_hospitals_but_keeps_them() {
        let (hospitals, patients) = services();
        let (tum, lmu) = tum_and_lmu(&hospitals);
        let max = patients
            .create_patient("Max", "Tum", date_of_birth(), "max.tum@tum.de")
            .unwrap();
        let felix = patients
            .create_patient("Felix", "Mann", date_of_birth(), "felix.mann@tum.de")
            .unwrap();
        patients.register_patient(&max, &tum).unwrap();
        patients.register_patient(&max, &lmu).unwrap();
        patients.register_patient(&felix, &lmu).unwrap();

        let id = max.require_id().unwrap();
        let detached = patients.delete_patient_by_id(id).unwrap();

        assert_eq!(
            detached,
            BTreeSet::from([tum.require_id().unwrap(), lmu.require_id().unwrap()])
        );
        assert!(!patients
            .find_all_patients()
            .unwrap()
            .iter()
            .any(|p| p.id() == Some(id)));
        assert!(hospitals.list_patients_by_hospital(&tum).unwrap().is_empty());
        assert_eq!(hospitals.list_patients_by_hospital(&lmu).unwrap(), vec![felix]);
        assert!(hospitals
            .find_hospital_by_id(tum.require_id().unwrap())
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_failed_patient_delete_leaves_links_intact() {
        let (store, hospitals, patients) = flaky_services();
        let (tum, lmu) = tum_and_lmu(&hospitals);
        let max = patients
            .create_patient("Max", "Tum", date_of_birth(), "max.tum@tum.de")
            .unwrap();
        patients.register_patient(&max, &tum).unwrap();
        patients.register_patient(&max, &lmu).unwrap();

        FlakyStore::fail(&store.fail_patient_delete);
        let err = patients
            .delete_patient_by_id(max.require_id().unwrap())
            .expect_err("injected failure should surface");

        assert!(matches!(
            err,
            RegistryError::Persistence(StoreError::Unavailable(_))
        ));
        assert_eq!(
            patients.list_hospital_by_patient(&max).unwrap(),
            vec![tum.clone(), lmu]
        );
        assert_eq!(hospitals.list_patients_by_hospital(&tum).unwrap(), vec![max]);
    }

    #[test]
    fn test_register_patient_is_symmetric() {
        let (hospitals, patients) = services();
        let (tum, _) = tum_and_lmu(&hospitals);
        let max = patients
            .create_patient("Max", "Tum", date_of_birth(), "max.tum@tum.de")
            .unwrap();

        let registration = patients.register_patient(&max, &tum).unwrap();

        assert!(registration.wrote_link());
        assert_eq!(
            registration.link(),
            Link::new(tum.require_id().unwrap(), max.require_id().unwrap())
        );
        assert_eq!(hospitals.list_patients_by_hospital(&tum).unwrap(), vec![max.clone()]);
        assert_eq!(patients.list_hospital_by_patient(&max).unwrap(), vec![tum]);
    }

    #[test]
    fn test_register_patient_is_idempotent() {
        let (hospitals, patients) = services();
        let (tum, _) = tum_and_lmu(&hospitals);
        let max = patients
            .create_patient("Max", "Tum", date_of_birth(), "max.tum@tum.de")
            .unwrap();

        let first = patients.register_patient(&max, &tum).unwrap();
        let second = patients.register_patient(&max, &tum).unwrap();

        assert!(matches!(first, Registration::Linked(_)));
        assert!(matches!(second, Registration::AlreadyLinked(_)));
        assert_eq!(first.link(), second.link());
        assert_eq!(hospitals.list_patients_by_hospital(&tum).unwrap().len(), 1);
        assert_eq!(patients.list_hospital_by_patient(&max).unwrap().len(), 1);
    }

    #[test]
    fn test_registration_is_visible_without_saving_either_side() {
        let (hospitals, patients) = services();
        let (tum, _) = tum_and_lmu(&hospitals);
        let max = patients
            .create_patient("Max", "Tum", date_of_birth(), "max.tum@tum.de")
            .unwrap();

        patients.register_patient(&max, &tum).unwrap();

        // Reload both sides from storage; no save_patient/save_hospital was called.
        let tum = hospitals
            .find_hospital_by_id(tum.require_id().unwrap())
            .unwrap()
            .unwrap();
        let max = patients
            .find_patient_by_id(max.require_id().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(hospitals.list_patients_by_hospital(&tum).unwrap(), vec![max.clone()]);
        assert_eq!(patients.list_hospital_by_patient(&max).unwrap(), vec![tum]);
    }

    #[test]
    fn test_patients_of_hospital() {
        let (hospitals, patients) = services();
        let (tum, _) = tum_and_lmu(&hospitals);
        let max = patients
            .create_patient("Max", "Tum", date_of_birth(), "max.tum@tum.de")
            .unwrap();
        let felix = patients
            .create_patient("Felix", "Mann", date_of_birth(), "felix.mann@tum.de")
            .unwrap();

        patients.register_patient(&max, &tum).unwrap();
        patients.register_patient(&felix, &tum).unwrap();

        assert_eq!(hospitals.list_patients_by_hospital(&tum).unwrap().len(), 2);
    }

    #[test]
    fn test_hospitals_of_patient() {
        let (hospitals, patients) = services();
        let (tum, lmu) = tum_and_lmu(&hospitals);
        let max = patients
            .create_patient("Max", "Tum", date_of_birth(), "max.tum@tum.de")
            .unwrap();

        patients.register_patient(&max, &tum).unwrap();
        patients.register_patient(&max, &lmu).unwrap();

        let registered = patients.list_hospital_by_patient(&max).unwrap();
        assert_eq!(registered.len(), 2);
        assert!(hospitals.list_patients_by_hospital(&tum).unwrap().contains(&max));
        assert!(hospitals.list_patients_by_hospital(&lmu).unwrap().contains(&max));
    }

    #[test]
    fn test_patients_in_multiple_hospitals() {
        let (hospitals, patients) = services();
        let (tum, lmu) = tum_and_lmu(&hospitals);
        let max = patients
            .create_patient("Max", "Tum", date_of_birth(), "max.tum@tum.de")
            .unwrap();
        let felix = patients
            .create_patient("Felix", "Mann", date_of_birth(), "felix.mann@tum.de")
            .unwrap();

        patients.register_patient(&max, &tum).unwrap();
        patients.register_patient(&max, &lmu).unwrap();
        patients.register_patient(&felix, &lmu).unwrap();

        let at_tum = hospitals.list_patients_by_hospital(&tum).unwrap();
        let at_lmu = hospitals.list_patients_by_hospital(&lmu).unwrap();
        assert!(at_tum.contains(&max));
        assert!(at_lmu.contains(&max));
        assert!(at_lmu.contains(&felix));
        assert!(!at_tum.contains(&felix));
    }

    #[test]
    fn test_register_unsaved_patient_fails() {
        let (hospitals, patients) = services();
        let (tum, _) = tum_and_lmu(&hospitals);
        let unsaved = Patient::new(
            NonEmptyText::new("Max").unwrap(),
            NonEmptyText::new("Tum").unwrap(),
            date_of_birth(),
            EmailAddress::parse("max.tum@tum.de").unwrap(),
        );

        let err = patients
            .register_patient(&unsaved, &tum)
            .expect_err("unsaved patient has no identity");
        assert!(matches!(err, RegistryError::Unsaved(EntityKind::Patient)));
    }

    #[test]
    fn test_register_at_deleted_hospital_is_not_found() {
        let (hospitals, patients) = services();
        let (tum, _) = tum_and_lmu(&hospitals);
        let max = patients
            .create_patient("Max", "Tum", date_of_birth(), "max.tum@tum.de")
            .unwrap();
        hospitals
            .delete_hospital_by_id(tum.require_id().unwrap())
            .unwrap();

        let err = patients
            .register_patient(&max, &tum)
            .expect_err("deleted hospital cannot take registrations");
        assert!(matches!(
            err,
            RegistryError::NotFound {
                kind: EntityKind::Hospital,
                ..
            }
        ));
    }

    #[test]
    fn test_unregister_patient() {
        let (hospitals, patients) = services();
        let (tum, lmu) = tum_and_lmu(&hospitals);
        let max = patients
            .create_patient("Max", "Tum", date_of_birth(), "max.tum@tum.de")
            .unwrap();
        patients.register_patient(&max, &tum).unwrap();
        patients.register_patient(&max, &lmu).unwrap();

        assert!(patients.unregister_patient(&max, &tum).unwrap());
        assert!(!patients.unregister_patient(&max, &tum).unwrap());

        assert_eq!(patients.list_hospital_by_patient(&max).unwrap(), vec![lmu]);
        assert!(hospitals.list_patients_by_hospital(&tum).unwrap().is_empty());
    }

    #[test]
    fn test_add_diagnosis() {
        let (_, patients) = services();
        let patient = patients
            .create_patient("Max", "Tum", date_of_birth(), "max.tum@tum.de")
            .unwrap();
        let id = patient.require_id().unwrap();

        patients
            .add_diagnosis_by_id(id, "Influenza")
            .expect("diagnosis should be recorded");

        let stored = patients.find_patient_by_id(id).unwrap().unwrap();
        assert_eq!(stored.diagnosis.as_deref(), Some("Influenza"));
    }

    #[test]
    fn test_add_diagnosis_unknown_patient_is_not_found() {
        let (_, patients) = services();
        let err = patients
            .add_diagnosis_by_id(PatientId::new(11), "Influenza")
            .expect_err("unknown id should fail");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_add_blank_diagnosis_clears_it() {
        let (_, patients) = services();
        let patient = patients
            .create_patient("Max", "Tum", date_of_birth(), "max.tum@tum.de")
            .unwrap();
        let id = patient.require_id().unwrap();
        patients.add_diagnosis_by_id(id, "Influenza").unwrap();

        let cleared = patients
            .add_diagnosis_by_id(id, "   ")
            .expect("blank diagnosis should be accepted");

        assert_eq!(cleared.diagnosis, None);
        assert_eq!(patients.find_patient_by_id(id).unwrap().unwrap().diagnosis, None);
    }
}
