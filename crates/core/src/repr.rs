use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::ids::{ProjectId, TaskId, UserId};
use crate::record::{ProjectRecord, TaskRecord};
use crate::version::Version;

/// External representation of a task. This is both the payload returned to
/// callers (and published to subscribers) and the base document a merge
/// patch is applied against, so it carries the version token and the
/// relationship ids explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRepr {
    pub id: TaskId,
    pub version: Version,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub due_at: Option<i64>,
    pub assignee_ids: Vec<UserId>,
}

impl TaskRepr {
    pub fn from_record(record: &TaskRecord) -> Self {
        Self {
            id: record.id,
            version: record.version,
            title: record.title.clone(),
            description: record.description.clone(),
            status: record.status.as_str().to_string(),
            priority: record.priority.as_str().to_string(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            due_at: record.due_at,
            assignee_ids: record.assignees.iter().copied().collect(),
        }
    }

    pub fn to_value(&self) -> Result<Value, CoreError> {
        serde_json::to_value(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRepr {
    pub id: ProjectId,
    pub version: Version,
    pub name: String,
    pub participant_ids: Vec<UserId>,
    pub task_ids: Vec<TaskId>,
}

impl ProjectRepr {
    pub fn from_record(record: &ProjectRecord) -> Self {
        Self {
            id: record.id,
            version: record.version,
            name: record.name.clone(),
            participant_ids: record.participants.iter().copied().collect(),
            task_ids: record.tasks.iter().copied().collect(),
        }
    }

    pub fn to_value(&self) -> Result<Value, CoreError> {
        serde_json::to_value(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}
