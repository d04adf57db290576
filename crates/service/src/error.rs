use std::fmt;
use thiserror::Error;

use kanban_core::CoreError;
use kanban_storage::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Task,
    Project,
    User,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Task => "task",
            Self::Project => "project",
            Self::User => "user",
        };
        write!(f, "{name}")
    }
}

/// Terminal outcomes of an update request. Conflict and NotFound stay
/// distinguishable so callers can implement refresh-and-retry versus
/// the-resource-is-gone behavior; nothing is retried here.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: i64 },

    #[error("missing version token")]
    MissingVersion,

    #[error("update conflict: record was modified concurrently")]
    Conflict,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("malformed patch: {0}")]
    MalformedPatch(String),

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("core error: {0}")]
    Core(CoreError),
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        match e {
            // The atomic persist and the pre-flight guard surface the
            // same outcome.
            StorageError::VersionMismatch { .. } => Self::Conflict,
            other => Self::Storage(other),
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::MissingVersion => Self::MissingVersion,
            CoreError::VersionConflict { .. } => Self::Conflict,
            CoreError::Validation(message) => Self::Validation(message),
            CoreError::MalformedPatch(message) => Self::MalformedPatch(message),
            other => Self::Core(other),
        }
    }
}
