//! Registry services.
//!
//! [`HospitalService`] and [`PatientService`] share the same [`Stores`](crate::storage::Stores)
//! but never call each other. Each keeps the hospital/patient relationship consistent by
//! working through [`Associations`](crate::association::Associations) and writing the
//! resulting link rows itself.

pub mod hospital;
pub mod patient;

#[cfg(test)]
pub(crate) mod testing;

pub use hospital::HospitalService;
pub use patient::{PatientService, Registration};

use crate::ports::{Link, LinkRepository};
use crate::RegistryError;

/// Re-inserts link rows removed by a delete whose final step failed.
///
/// Returns the error to hand back to the caller: the original failure when the links were
/// restored, or `RollbackFailed` carrying both errors when they could not be.
pub(crate) fn restore_links(
    links: &dyn LinkRepository,
    operation: &'static str,
    severed: &[Link],
    failure: RegistryError,
) -> RegistryError {
    if severed.is_empty() {
        return failure;
    }

    tracing::warn!(
        "{} failed, restoring {} link(s): {}",
        operation,
        severed.len(),
        failure
    );

    match links.insert(severed) {
        Ok(()) => failure,
        Err(rollback_error) => {
            tracing::error!("{} rollback failed: {}", operation, rollback_error);
            RegistryError::RollbackFailed {
                operation,
                failure: Box::new(failure),
                rollback_error,
            }
        }
    }
}
