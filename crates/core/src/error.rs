use thiserror::Error;

use crate::version::Version;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("missing version token")]
    MissingVersion,

    #[error("version conflict: record is at {expected}, update carried {supplied}")]
    VersionConflict { expected: Version, supplied: Version },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("malformed patch: {0}")]
    MalformedPatch(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("system clock is before the unix epoch")]
    Clock,
}
