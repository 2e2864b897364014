//! Fixtures shared by the service tests.

use super::{HospitalService, PatientService};
use crate::entities::{Hospital, HospitalId, Patient, PatientId};
use crate::ports::{Link, LinkRepository, Repository, StoreError, StoreResult};
use crate::storage::{MemoryStore, Stores};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub(crate) fn date_of_birth() -> NaiveDate {
    NaiveDate::from_ymd_opt(1990, 1, 15).unwrap()
}

pub(crate) fn services() -> (HospitalService, PatientService) {
    let stores = Stores::in_memory();
    (
        HospitalService::new(stores.clone()),
        PatientService::new(stores),
    )
}

pub(crate) fn flaky_services() -> (Arc<FlakyStore>, HospitalService, PatientService) {
    let store = Arc::new(FlakyStore::default());
    let stores = Stores::shared(store.clone());
    (
        store,
        HospitalService::new(stores.clone()),
        PatientService::new(stores),
    )
}

/// Memory store whose deletes and link inserts can be made to fail on demand.
#[derive(Debug, Default)]
pub(crate) struct FlakyStore {
    inner: MemoryStore,
    pub fail_hospital_delete: AtomicBool,
    pub fail_patient_delete: AtomicBool,
    pub fail_link_insert: AtomicBool,
}

impl FlakyStore {
    pub(crate) fn fail(flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, what: &str) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("injected {what} failure")));
        }
        Ok(())
    }
}

impl Repository<Hospital> for FlakyStore {
    fn save(&self, record: Hospital) -> StoreResult<Hospital> {
        Repository::<Hospital>::save(&self.inner, record)
    }

    fn find_by_id(&self, id: HospitalId) -> StoreResult<Option<Hospital>> {
        Repository::<Hospital>::find_by_id(&self.inner, id)
    }

    fn find_all(&self) -> StoreResult<Vec<Hospital>> {
        Repository::<Hospital>::find_all(&self.inner)
    }

    fn delete(&self, id: HospitalId) -> StoreResult<()> {
        Self::check(&self.fail_hospital_delete, "hospital delete")?;
        Repository::<Hospital>::delete(&self.inner, id)
    }
}

impl Repository<Patient> for FlakyStore {
    fn save(&self, record: Patient) -> StoreResult<Patient> {
        Repository::<Patient>::save(&self.inner, record)
    }

    fn find_by_id(&self, id: PatientId) -> StoreResult<Option<Patient>> {
        Repository::<Patient>::find_by_id(&self.inner, id)
    }

    fn find_all(&self) -> StoreResult<Vec<Patient>> {
        Repository::<Patient>::find_all(&self.inner)
    }

    fn delete(&self, id: PatientId) -> StoreResult<()> {
        Self::check(&self.fail_patient_delete, "patient delete")?;
        Repository::<Patient>::delete(&self.inner, id)
    }
}

impl LinkRepository for FlakyStore {
    fn find_all(&self) -> StoreResult<Vec<Link>> {
        LinkRepository::find_all(&self.inner)
    }

    fn insert(&self, links: &[Link]) -> StoreResult<()> {
        Self::check(&self.fail_link_insert, "link insert")?;
        LinkRepository::insert(&self.inner, links)
    }

    fn remove(&self, links: &[Link]) -> StoreResult<()> {
        LinkRepository::remove(&self.inner, links)
    }
}
