use super::{EntityKind, PatientId};
use crate::ports::Record;
use crate::{EmailAddress, NonEmptyText, RegistryError, RegistryResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Administrative sex as recorded at registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
    Other,
    Unknown,
}

impl FromStr for Sex {
    type Err = RegistryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "female" | "f" => Ok(Self::Female),
            "male" | "m" => Ok(Self::Male),
            "other" | "o" => Ok(Self::Other),
            "unknown" | "u" => Ok(Self::Unknown),
            other => Err(RegistryError::InvalidInput(format!("unknown sex '{other}'"))),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Female => "female",
            Self::Male => "male",
            Self::Other => "other",
            Self::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}

/// A patient held in the registry.
///
/// As with [`Hospital`](super::Hospital), the identifier is assigned by storage on first save.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    id: Option<PatientId>,
    pub first_name: NonEmptyText,
    pub last_name: NonEmptyText,
    #[serde(default)]
    pub address: Option<String>,
    pub email: EmailAddress,
    #[serde(default)]
    pub phone: Option<String>,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub diagnosis: Option<String>,
}

impl Patient {
    /// Builds an unsaved patient with only the required fields set.
    pub fn new(
        first_name: NonEmptyText,
        last_name: NonEmptyText,
        date_of_birth: NaiveDate,
        email: EmailAddress,
    ) -> Self {
        Self {
            id: None,
            first_name,
            last_name,
            address: None,
            email,
            phone: None,
            date_of_birth,
            sex: None,
            diagnosis: None,
        }
    }

    pub fn id(&self) -> Option<PatientId> {
        self.id
    }

    /// Returns the identifier, or `RegistryError::Unsaved` for a record never saved.
    pub fn require_id(&self) -> RegistryResult<PatientId> {
        self.id.ok_or(RegistryError::Unsaved(EntityKind::Patient))
    }

    /// "First Last" for display.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Record for Patient {
    type Id = PatientId;
    const KIND: EntityKind = EntityKind::Patient;

    fn id(&self) -> Option<PatientId> {
        self.id
    }

    fn assign_id(&mut self, id: PatientId) {
        self.id = Some(id);
    }
}

/// Unvalidated input for creating a patient with every field populated.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewPatient {
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

impl NewPatient {
    /// Validates the input into an unsaved [`Patient`].
    ///
    /// Blank optional text fields are stored as `None`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Text` if a name is blank or the email is malformed.
    pub fn into_patient(self) -> RegistryResult<Patient> {
        fn non_blank(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        let mut patient = Patient::new(
            NonEmptyText::new(&self.first_name)?,
            NonEmptyText::new(&self.last_name)?,
            self.date_of_birth,
            EmailAddress::parse(&self.email)?,
        );
        patient.address = non_blank(self.address);
        patient.phone = non_blank(self.phone);
        patient.sex = self.sex;
        patient.diagnosis = non_blank(self.diagnosis);

        Ok(patient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_types::TextError;

    fn birth_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(1990, 1, 15).unwrap()
    }

    #[test]
    fn new_patient_has_no_optional_fields() {
        let patient = Patient::new(
            NonEmptyText::new("Max").unwrap(),
            NonEmptyText::new("Tum").unwrap(),
            birth_date(),
            EmailAddress::parse("max.tum@tum.de").unwrap(),
        );

        assert_eq!(patient.id(), None);
        assert_eq!(patient.diagnosis, None);
        assert_eq!(patient.full_name(), "Max Tum");
    }

    #[test]
    fn new_patient_input_blanks_become_none() {
        let patient = NewPatient {
            first_name: "Felix".into(),
            last_name: "Mann".into(),
            address: Some("  ".into()),
            email: "felix.mann@tum.de".into(),
            phone: Some("0151 123".into()),
            date_of_birth: birth_date(),
            sex: Some(Sex::Male),
            diagnosis: Some(String::new()),
        }
        .into_patient()
        .expect("valid input");

        assert_eq!(patient.address, None);
        assert_eq!(patient.phone.as_deref(), Some("0151 123"));
        assert_eq!(patient.sex, Some(Sex::Male));
        assert_eq!(patient.diagnosis, None);
    }

    #[test]
    fn new_patient_input_rejects_bad_email() {
        let err = NewPatient {
            first_name: "Felix".into(),
            last_name: "Mann".into(),
            email: "felix".into(),
            date_of_birth: birth_date(),
            ..NewPatient::default()
        }
        .into_patient()
        .expect_err("email should be rejected");

        assert!(matches!(err, RegistryError::Text(TextError::InvalidEmail(_))));
    }

    #[test]
    fn sex_parses_short_and_long_forms() {
        assert_eq!("F".parse::<Sex>().unwrap(), Sex::Female);
        assert_eq!("male".parse::<Sex>().unwrap(), Sex::Male);
        assert!("x".parse::<Sex>().is_err());
    }
}
