//! Seeding the registry with demo or fixture data.
//!
//! A [`SeedManifest`] lists hospitals and patients under local keys and the registrations
//! between them. Manifests are usually written in YAML:
//!
//! ```yaml
//! hospitals:
//!   - key: klinikum
//!     name: Klinikum
//!     phone: "1523"
//! patients:
//!   - key: max
//!     first_name: Max
//!     last_name: Tum
//!     email: max.tum@tum.de
//!     date_of_birth: 1990-01-15
//! registrations:
//!   - patient: max
//!     hospital: klinikum
//! ```
//!
//! Keys only exist inside the manifest; stored records get storage-assigned ids.

use crate::entities::{Hospital, NewPatient, Patient, Sex};
use crate::services::{HospitalService, PatientService};
use crate::{NonEmptyText, RegistryError, RegistryResult};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug, Deserialize)]
pub struct SeedHospital {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SeedPatient {
    pub key: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub address: Option<String>,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub diagnosis: Option<String>,
}

impl SeedPatient {
    pub fn details(&self) -> NewPatient {
        NewPatient {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            address: self.address.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            date_of_birth: self.date_of_birth,
            sex: self.sex,
            diagnosis: self.diagnosis.clone(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct SeedRegistration {
    pub patient: String,
    pub hospital: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SeedManifest {
    #[serde(default)]
    pub hospitals: Vec<SeedHospital>,
    #[serde(default)]
    pub patients: Vec<SeedPatient>,
    #[serde(default)]
    pub registrations: Vec<SeedRegistration>,
}

/// What a seed run stored.
#[derive(Debug, Default)]
pub struct SeedReport {
    pub hospitals: Vec<Hospital>,
    pub patients: Vec<Patient>,
    /// Registrations that wrote a new link.
    pub registrations: usize,
}

impl SeedManifest {
    /// Parses a YAML manifest.
    pub fn from_yaml(raw: &str) -> RegistryResult<Self> {
        serde_yaml::from_str(raw).map_err(RegistryError::SeedParse)
    }

    /// The demo data set: two hospitals, two patients, three registrations.
    pub fn demo(date_of_birth: NaiveDate) -> Self {
        let hospital = |key: &str, name: &str, phone: &str| SeedHospital {
            key: key.into(),
            name: name.into(),
            address: " ".into(),
            phone: phone.into(),
        };
        let patient = |key: &str, first: &str, email: &str| SeedPatient {
            key: key.into(),
            first_name: first.into(),
            last_name: "Tum".into(),
            address: None,
            email: email.into(),
            phone: None,
            date_of_birth,
            sex: None,
            diagnosis: None,
        };
        let registration = |patient: &str, hospital: &str| SeedRegistration {
            patient: patient.into(),
            hospital: hospital.into(),
        };

        Self {
            hospitals: vec![
                hospital("klinikum", "Klinikum", "1523"),
                hospital("center", "Center", "1253"),
            ],
            patients: vec![
                patient("max", "Max", "max.tum@tum.de"),
                patient("felix", "Felix", "felix.tum@tum.de"),
            ],
            registrations: vec![
                registration("max", "klinikum"),
                registration("max", "center"),
                registration("felix", "klinikum"),
            ],
        }
    }
}

/// Stores every record of `manifest` and registers the listed pairs.
///
/// Keys and records are checked before anything is written, so a manifest with an unknown
/// key, a blank name or a malformed email stores nothing.
///
/// # Errors
///
/// Returns `RegistryError::InvalidInput` for duplicate or unknown keys, `RegistryError::Text`
/// for an invalid record, and any error the services raise while storing records.
pub fn seed(
    hospitals: &HospitalService,
    patients: &PatientService,
    manifest: &SeedManifest,
) -> RegistryResult<SeedReport> {
    validate_manifest(manifest)?;

    let mut report = SeedReport::default();
    let mut hospital_by_key = HashMap::new();
    let mut patient_by_key = HashMap::new();

    for entry in &manifest.hospitals {
        let hospital = hospitals.create_hospital(&entry.name, &entry.address, &entry.phone)?;
        hospital_by_key.insert(entry.key.as_str(), hospital.clone());
        report.hospitals.push(hospital);
    }

    for entry in &manifest.patients {
        let patient = patients.create_patient_with_details(entry.details())?;
        patient_by_key.insert(entry.key.as_str(), patient.clone());
        report.patients.push(patient);
    }

    for entry in &manifest.registrations {
        let patient = lookup(&patient_by_key, "patient", &entry.patient)?;
        let hospital = lookup(&hospital_by_key, "hospital", &entry.hospital)?;
        if patients.register_patient(patient, hospital)?.wrote_link() {
            report.registrations += 1;
        }
    }

    tracing::info!(
        "seeded {} hospital(s), {} patient(s), {} registration(s)",
        report.hospitals.len(),
        report.patients.len(),
        report.registrations
    );
    Ok(report)
}

fn lookup<'a, T>(by_key: &'a HashMap<&str, T>, kind: &str, key: &str) -> RegistryResult<&'a T> {
    by_key.get(key).ok_or_else(|| {
        RegistryError::InvalidInput(format!("registration references unknown {kind} '{key}'"))
    })
}

fn validate_manifest(manifest: &SeedManifest) -> RegistryResult<()> {
    let mut hospital_keys = HashSet::new();
    for entry in &manifest.hospitals {
        NonEmptyText::new(&entry.name)?;
        if !hospital_keys.insert(entry.key.as_str()) {
            return Err(RegistryError::InvalidInput(format!(
                "duplicate hospital key '{}'",
                entry.key
            )));
        }
    }

    let mut patient_keys = HashSet::new();
    for entry in &manifest.patients {
        entry.details().into_patient()?;
        if !patient_keys.insert(entry.key.as_str()) {
            return Err(RegistryError::InvalidInput(format!(
                "duplicate patient key '{}'",
                entry.key
            )));
        }
    }

    for entry in &manifest.registrations {
        if !patient_keys.contains(entry.patient.as_str()) {
            return Err(RegistryError::InvalidInput(format!(
                "registration references unknown patient '{}'",
                entry.patient
            )));
        }
        if !hospital_keys.contains(entry.hospital.as_str()) {
            return Err(RegistryError::InvalidInput(format!(
                "registration references unknown hospital '{}'",
                entry.hospital
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{date_of_birth, services};

    #[test]
    fn test_demo_seed_matches_registrations() {
        let (hospitals, patients) = services();

        let report = seed(&hospitals, &patients, &SeedManifest::demo(date_of_birth()))
            .expect("demo seed should succeed");

        assert_eq!(report.hospitals.len(), 2);
        assert_eq!(report.patients.len(), 2);
        assert_eq!(report.registrations, 3);

        let klinikum = &report.hospitals[0];
        let max = &report.patients[0];
        assert_eq!(hospitals.list_patients_by_hospital(klinikum).unwrap().len(), 2);
        assert_eq!(patients.list_hospital_by_patient(max).unwrap().len(), 2);
    }

    #[test]
    fn test_yaml_manifest_is_seeded() {
        let (hospitals, patients) = services();
        let manifest = SeedManifest::from_yaml(
            r#"
hospitals:
  - key: tum
    name: TUM Klinikum
    address: Ismaninger Straße 22
    phone: 123-456-789
patients:
  - key: max
    first_name: Max
    last_name: Tum
    email: max.tum@tum.de
    date_of_birth: 1990-01-15
    sex: male
    diagnosis: Influenza
registrations:
  - patient: max
    hospital: tum
  - patient: max
    hospital: tum
"#,
        )
        .expect("manifest should parse");

        let report = seed(&hospitals, &patients, &manifest).expect("seed should succeed");

        assert_eq!(report.registrations, 1, "duplicate registration writes once");
        let max = &report.patients[0];
        assert_eq!(max.diagnosis.as_deref(), Some("Influenza"));
        assert_eq!(
            patients.list_hospital_by_patient(max).unwrap(),
            vec![report.hospitals[0].clone()]
        );
    }

    #[test]
    fn test_unknown_key_stores_nothing() {
        let (hospitals, patients) = services();
        let mut manifest = SeedManifest::demo(date_of_birth());
        manifest.registrations.push(SeedRegistration {
            patient: "nobody".into(),
            hospital: "klinikum".into(),
        });

        let err = seed(&hospitals, &patients, &manifest).expect_err("unknown key should fail");

        assert!(matches!(err, RegistryError::InvalidInput(_)));
        assert!(hospitals.find_all_hospitals().unwrap().is_empty());
        assert!(patients.find_all_patients().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_patient_stores_nothing() {
        let (hospitals, patients) = services();
        let mut manifest = SeedManifest::demo(date_of_birth());
        manifest.patients[1].email = "felix".into();

        let err = seed(&hospitals, &patients, &manifest).expect_err("bad email should fail");

        assert!(matches!(err, RegistryError::Text(_)));
        assert!(hospitals.find_all_hospitals().unwrap().is_empty());
        assert!(patients.find_all_patients().unwrap().is_empty());
    }

    #[test]
    fn test_blank_hospital_name_stores_nothing() {
        let (hospitals, patients) = services();
        let mut manifest = SeedManifest::demo(date_of_birth());
        manifest.hospitals[1].name = "  ".into();

        seed(&hospitals, &patients, &manifest).expect_err("blank name should fail");

        assert!(hospitals.find_all_hospitals().unwrap().is_empty());
        assert!(patients.find_all_patients().unwrap().is_empty());
    }

    #[test]
    fn test_unquoted_numbers_parse_as_text() {
        let manifest = SeedManifest::from_yaml(
            r#"
hospitals:
  - key: klinikum
    name: Klinikum
    phone: 1523
patients:
  - key: max
    first_name: Max
    last_name: Tum
    email: max.tum@tum.de
    phone: 1523
    date_of_birth: 1990-01-15
"#,
        )
        .expect("manifest should parse");

        assert_eq!(manifest.hospitals[0].phone, "1523");
        assert_eq!(manifest.patients[0].phone.as_deref(), Some("1523"));
    }

    #[test]
    fn test_malformed_yaml_is_reported() {
        let err = SeedManifest::from_yaml("hospitals: [[[").expect_err("bad yaml");
        assert!(matches!(err, RegistryError::SeedParse(_)));
    }
}
