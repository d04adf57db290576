use crate::draft::{ProjectDraft, TaskDraft};
use crate::error::CoreError;
use crate::record::{TaskPriority, TaskStatus};

pub const TITLE_MAX: usize = 255;
pub const DESCRIPTION_MAX: usize = 2000;
pub const NAME_MAX: usize = 255;

/// The scalar fields of a task candidate after constraint checks, with
/// enumerations resolved to their typed form.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFields {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_at: Option<i64>,
}

/// Check a post-merge task candidate against field-level constraints.
/// Violations are validation failures, distinct from merge or
/// concurrency failures.
pub fn validate_task(draft: &TaskDraft) -> Result<TaskFields, CoreError> {
    let title = required_text(draft.title.as_deref(), "title", TITLE_MAX)?;

    if let Some(description) = &draft.description
        && description.chars().count() > DESCRIPTION_MAX
    {
        return Err(CoreError::Validation(format!(
            "description exceeds {DESCRIPTION_MAX} characters"
        )));
    }

    let status = match draft.status.as_deref() {
        None => return Err(CoreError::Validation("status is required".into())),
        Some(s) => TaskStatus::parse(s)?,
    };
    let priority = match draft.priority.as_deref() {
        None => return Err(CoreError::Validation("priority is required".into())),
        Some(p) => TaskPriority::parse(p)?,
    };

    Ok(TaskFields {
        title,
        description: draft.description.clone(),
        status,
        priority,
        due_at: draft.due_at,
    })
}

/// Check a post-merge project candidate; returns the validated name.
pub fn validate_project(draft: &ProjectDraft) -> Result<String, CoreError> {
    required_text(draft.name.as_deref(), "name", NAME_MAX)
}

fn required_text(value: Option<&str>, field: &str, max: usize) -> Result<String, CoreError> {
    let Some(value) = value else {
        return Err(CoreError::Validation(format!("{field} is required")));
    };
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be blank")));
    }
    if value.chars().count() > max {
        return Err(CoreError::Validation(format!(
            "{field} exceeds {max} characters"
        )));
    }
    Ok(value.to_string())
}
