use crate::entities::EntityKind;
use crate::ports::StoreError;
use registry_types::TextError;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid text: {0}")]
    Text(#[from] TextError),

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: u64 },
    #[error("{0} has not been saved and has no identifier")]
    Unsaved(EntityKind),

    #[error(transparent)]
    Persistence(#[from] StoreError),
    #[error(
        "{operation} failed and restoring links also failed: failure={failure}; rollback={rollback_error}"
    )]
    RollbackFailed {
        operation: &'static str,
        #[source]
        failure: Box<RegistryError>,
        rollback_error: StoreError,
    },

    #[error("failed to parse seed manifest: {0}")]
    SeedParse(serde_yaml::Error),
}

impl RegistryError {
    pub fn not_found(kind: EntityKind, id: impl Into<u64>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// True for `NotFound` of any entity kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
