//! Registry entities.
//!
//! Hospitals and patients are plain records. Neither embeds the other: which patients
//! belong to which hospital lives in the link table, read through
//! [`Associations`](crate::association::Associations).

pub mod hospital;
pub mod patient;

pub use hospital::Hospital;
pub use patient::{NewPatient, Patient, Sex};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two record kinds held by the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Hospital,
    Patient,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hospital => write!(f, "hospital"),
            Self::Patient => write!(f, "patient"),
        }
    }
}

/// Storage-assigned identifier of a hospital.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HospitalId(u64);

/// Storage-assigned identifier of a patient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(u64);

impl HospitalId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl PatientId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for HospitalId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<HospitalId> for u64 {
    fn from(id: HospitalId) -> Self {
        id.0
    }
}

impl From<u64> for PatientId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<PatientId> for u64 {
    fn from(id: PatientId) -> Self {
        id.0
    }
}

impl fmt::Display for HospitalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
