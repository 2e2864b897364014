//! Hospital/patient association graph.
//!
//! The many-to-many relationship is held as two mapping tables, hospital id to patient ids
//! and patient id to hospital ids. [`Associations`] is the only code that mutates them and
//! every mutation touches both tables, so a patient is in a hospital's set exactly when the
//! hospital is in the patient's set.
//!
//! The graph is an in-memory working copy. Services load the relevant link rows, apply the
//! change here, and only then write the resulting rows back through
//! [`LinkRepository`](crate::ports::LinkRepository).

use crate::entities::{HospitalId, PatientId};
use crate::ports::Link;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Associations {
    patients_by_hospital: BTreeMap<HospitalId, BTreeSet<PatientId>>,
    hospitals_by_patient: BTreeMap<PatientId, BTreeSet<HospitalId>>,
}

impl Associations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph from stored link rows. Duplicate rows collapse.
    pub fn from_links(links: impl IntoIterator<Item = Link>) -> Self {
        let mut graph = Self::new();
        for link in links {
            graph.link(link.hospital, link.patient);
        }
        graph
    }

    /// Adds the edge to both sides. Returns `false` if it already existed.
    pub fn link(&mut self, hospital: HospitalId, patient: PatientId) -> bool {
        let added = self
            .patients_by_hospital
            .entry(hospital)
            .or_default()
            .insert(patient);
        self.hospitals_by_patient
            .entry(patient)
            .or_default()
            .insert(hospital);
        added
    }

    /// Removes the edge from both sides. Returns `false` if there was no edge.
    pub fn unlink(&mut self, hospital: HospitalId, patient: PatientId) -> bool {
        let removed = remove_edge(&mut self.patients_by_hospital, hospital, patient);
        remove_edge(&mut self.hospitals_by_patient, patient, hospital);
        removed
    }

    /// Removes every edge of `hospital` and returns the severed links.
    pub fn sever_hospital(&mut self, hospital: HospitalId) -> Vec<Link> {
        let patients = self.patients_by_hospital.remove(&hospital).unwrap_or_default();
        patients
            .into_iter()
            .map(|patient| {
                remove_edge(&mut self.hospitals_by_patient, patient, hospital);
                Link::new(hospital, patient)
            })
            .collect()
    }

    /// Removes every edge of `patient` and returns the severed links.
    pub fn sever_patient(&mut self, patient: PatientId) -> Vec<Link> {
        let hospitals = self.hospitals_by_patient.remove(&patient).unwrap_or_default();
        hospitals
            .into_iter()
            .map(|hospital| {
                remove_edge(&mut self.patients_by_hospital, hospital, patient);
                Link::new(hospital, patient)
            })
            .collect()
    }

    pub fn patients_of(&self, hospital: HospitalId) -> BTreeSet<PatientId> {
        self.patients_by_hospital
            .get(&hospital)
            .cloned()
            .unwrap_or_default()
    }

    pub fn hospitals_of(&self, patient: PatientId) -> BTreeSet<HospitalId> {
        self.hospitals_by_patient
            .get(&patient)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
impl Associations {
    fn links(&self) -> impl Iterator<Item = Link> + '_ {
        self.patients_by_hospital.iter().flat_map(|(hospital, patients)| {
            patients
                .iter()
                .map(move |patient| Link::new(*hospital, *patient))
        })
    }

    fn len(&self) -> usize {
        self.patients_by_hospital.values().map(BTreeSet::len).sum()
    }

    fn is_empty(&self) -> bool {
        self.patients_by_hospital.is_empty()
    }

    /// Checks that both mapping tables describe the same edge set.
    fn is_symmetric(&self) -> bool {
        let forward = self.links().collect::<BTreeSet<_>>();
        let backward = self
            .hospitals_by_patient
            .iter()
            .flat_map(|(patient, hospitals)| {
                hospitals
                    .iter()
                    .map(move |hospital| Link::new(*hospital, *patient))
            })
            .collect::<BTreeSet<_>>();
        forward == backward
    }
}

// Empty sets are dropped so an entity with no edges has no entry at all.
fn remove_edge<K: Ord + Copy, V: Ord>(map: &mut BTreeMap<K, BTreeSet<V>>, key: K, value: V) -> bool {
    let Some(set) = map.get_mut(&key) else {
        return false;
    };
    let removed = set.remove(&value);
    if set.is_empty() {
        map.remove(&key);
    }
    removed
}
