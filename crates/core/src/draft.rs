use serde::Deserialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::ids::{TaskId, UserId};
use crate::version::Version;

/// Candidate task state decoded from a merged document or a full
/// replacement payload. Every field is optional here so that a missing
/// required field surfaces as a validation failure rather than a decode
/// failure; identity and timestamps are deliberately not part of the
/// draft and can never be smuggled in through a patch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskDraft {
    #[serde(default)]
    pub version: Option<Version>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_at: Option<i64>,
    #[serde(default)]
    pub assignee_ids: Option<Vec<UserId>>,
}

impl TaskDraft {
    pub fn from_value(value: &Value) -> Result<Self, CoreError> {
        serde_json::from_value(value.clone()).map_err(|e| CoreError::MalformedPatch(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectDraft {
    #[serde(default)]
    pub version: Option<Version>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub participant_ids: Option<Vec<UserId>>,
    #[serde(default)]
    pub task_ids: Option<Vec<TaskId>>,
}

impl ProjectDraft {
    pub fn from_value(value: &Value) -> Result<Self, CoreError> {
        serde_json::from_value(value.clone()).map_err(|e| CoreError::MalformedPatch(e.to_string()))
    }
}
