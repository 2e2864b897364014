//! In-memory table model shared by every storage adapter.
//!
//! Adapters differ only in where [`Tables`] lives between calls (a mutex-guarded value or a
//! JSON file on disk). Row logic, identifier assignment and referential checks live here.

use crate::entities::{EntityKind, Hospital, Patient};
use crate::ports::{Link, Record, StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Rows of one record kind keyed by raw identifier, with an auto-increment counter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Table<R> {
    next_id: u64,
    rows: BTreeMap<u64, R>,
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<R: Record> Table<R> {
    /// Insert-or-update. Records without an id receive the next counter value.
    ///
    /// An explicit id moves the counter past it. Assignment fails rather than overwrite a
    /// row already holding the counter value.
    pub fn save(&mut self, mut record: R) -> StoreResult<R> {
        let raw = match record.id() {
            Some(id) => {
                let raw: u64 = id.into();
                if let Some(next) = raw.checked_add(1) {
                    self.next_id = self.next_id.max(next);
                }
                raw
            }
            None => {
                let raw = self.next_id;
                if self.rows.contains_key(&raw) {
                    return Err(StoreError::IdTaken { kind: R::KIND, id: raw });
                }
                self.next_id = raw
                    .checked_add(1)
                    .ok_or(StoreError::IdsExhausted { kind: R::KIND })?;
                record.assign_id(R::Id::from(raw));
                raw
            }
        };
        self.rows.insert(raw, record.clone());
        Ok(record)
    }

    pub fn find(&self, id: R::Id) -> Option<R> {
        let raw: u64 = id.into();
        self.rows.get(&raw).cloned()
    }

    pub fn all(&self) -> Vec<R> {
        self.rows.values().cloned().collect()
    }

    pub fn contains(&self, raw: u64) -> bool {
        self.rows.contains_key(&raw)
    }

    fn remove(&mut self, raw: u64) -> StoreResult<()> {
        self.rows
            .remove(&raw)
            .map(|_| ())
            .ok_or(StoreError::Missing { kind: R::KIND, id: raw })
    }
}

/// Access to the table holding records of kind `R`.
pub trait TableOf<R: Record> {
    fn table(&self) -> &Table<R>;
    fn table_mut(&mut self) -> &mut Table<R>;
}

/// Every table of the registry.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Tables {
    #[serde(default)]
    hospitals: Table<Hospital>,
    #[serde(default)]
    patients: Table<Patient>,
    #[serde(default)]
    links: BTreeSet<Link>,
}

impl TableOf<Hospital> for Tables {
    fn table(&self) -> &Table<Hospital> {
        &self.hospitals
    }

    fn table_mut(&mut self) -> &mut Table<Hospital> {
        &mut self.hospitals
    }
}

impl TableOf<Patient> for Tables {
    fn table(&self) -> &Table<Patient> {
        &self.patients
    }

    fn table_mut(&mut self) -> &mut Table<Patient> {
        &mut self.patients
    }
}

impl Tables {
    /// Deletes a row, refusing while link rows still reference it.
    pub fn delete<R: Record>(&mut self, id: R::Id) -> StoreResult<()>
    where
        Self: TableOf<R>,
    {
        let raw: u64 = id.into();
        if !TableOf::<R>::table(self).contains(raw) {
            return Err(StoreError::Missing { kind: R::KIND, id: raw });
        }

        let linked = self.links.iter().any(|link| match R::KIND {
            EntityKind::Hospital => link.hospital.get() == raw,
            EntityKind::Patient => link.patient.get() == raw,
        });
        if linked {
            return Err(StoreError::StillLinked { kind: R::KIND, id: raw });
        }

        TableOf::<R>::table_mut(self).remove(raw)
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> + '_ {
        self.links.iter()
    }

    /// Inserts link rows; every referenced hospital and patient must exist.
    pub fn insert_links(&mut self, links: &[Link]) -> StoreResult<()> {
        for link in links {
            if !self.hospitals.contains(link.hospital.get()) {
                return Err(StoreError::Missing {
                    kind: EntityKind::Hospital,
                    id: link.hospital.get(),
                });
            }
            if !self.patients.contains(link.patient.get()) {
                return Err(StoreError::Missing {
                    kind: EntityKind::Patient,
                    id: link.patient.get(),
                });
            }
        }
        self.links.extend(links.iter().copied());
        Ok(())
    }

    pub fn remove_links(&mut self, links: &[Link]) {
        for link in links {
            self.links.remove(link);
        }
    }
}
