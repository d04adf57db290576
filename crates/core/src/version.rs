use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::CoreError;

/// Monotonically increasing version token proving a client's view of a
/// record's last-known state. Starts at 1 on create and is bumped exactly
/// once per successful persisted update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    pub const INITIAL: Version = Version(1);

    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Optimistic concurrency guard. A missing token is rejected outright; a
/// token that does not equal the stored version is a conflict. Conflict is
/// an expected outcome under concurrent editing, distinct from not-found
/// and from bad input.
pub fn check_version(existing: Version, supplied: Option<Version>) -> Result<(), CoreError> {
    match supplied {
        None => Err(CoreError::MissingVersion),
        Some(supplied) if supplied != existing => Err(CoreError::VersionConflict {
            expected: existing,
            supplied,
        }),
        Some(_) => Ok(()),
    }
}

/// Extract the version token embedded in a patch or replacement document.
/// There is no separate header channel: an absent or null `version` field
/// means the caller supplied no token at all.
pub fn version_from_patch(patch: &Value) -> Result<Option<Version>, CoreError> {
    match patch.get("version") {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Version::new)
            .map(Some)
            .ok_or_else(|| CoreError::MalformedPatch("version must be an integer".into())),
    }
}
