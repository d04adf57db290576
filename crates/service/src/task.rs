use serde_json::Value;
use tracing::{debug, warn};

use kanban_core::draft::TaskDraft;
use kanban_core::merge::merge;
use kanban_core::record::{TaskRecord, TaskStatus};
use kanban_core::repr::TaskRepr;
use kanban_core::time::now_millis;
use kanban_core::validate::validate_task;
use kanban_core::version::{check_version, version_from_patch};
use kanban_core::TaskId;

use kanban_storage::{NewTask, Page, PageRequest, Storage};

use crate::error::{EntityKind, ServiceError};
use crate::notify::{Notifier, TASK_CHANNEL};
use crate::reconcile::{apply_relationship_patch, reconcile_references, relationship_patch};
use crate::KanbanService;

impl<S: Storage, N: Notifier> KanbanService<S, N> {
    pub fn create_task(&mut self, draft: &TaskDraft) -> Result<TaskRepr, ServiceError> {
        let fields = validate_task(draft)?;
        let assignees = reconcile_references(
            draft.assignee_ids.as_deref().unwrap_or_default(),
            EntityKind::User,
            |id| self.storage().user_exists(id),
        )?;

        let record = self.storage_mut().insert_task(&NewTask {
            title: fields.title,
            description: fields.description,
            status: fields.status,
            priority: fields.priority,
            due_at: fields.due_at,
            assignees,
        })?;
        debug!(task = record.id.get(), "task created");

        let repr = TaskRepr::from_record(&record);
        self.publish_task(&repr);
        Ok(repr)
    }

    pub fn get_task(&self, id: TaskId) -> Result<TaskRepr, ServiceError> {
        Ok(TaskRepr::from_record(&self.require_task(id)?))
    }

    /// Tasks in a page window, newest first, optionally narrowed to one
    /// status.
    pub fn list_tasks(
        &self,
        status: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<TaskRepr>, ServiceError> {
        let page = match status {
            None => self.storage().list_tasks(page)?,
            Some(s) => {
                let status = TaskStatus::parse(s)?;
                self.storage().list_tasks_by_status(status, page)?
            }
        };
        Ok(page.map(|record| TaskRepr::from_record(&record)))
    }

    /// Full replacement of a task's mutable state. The draft must carry
    /// the version token of the copy it was derived from; relationship ids
    /// it omits are treated as an empty set, not as untouched.
    pub fn replace_task(&mut self, id: TaskId, draft: &TaskDraft) -> Result<TaskRepr, ServiceError> {
        let existing = self.require_task(id)?;
        if let Err(e) = check_version(existing.version, draft.version) {
            warn!(
                task = id.get(),
                current = existing.version.get(),
                "replace rejected: {e}"
            );
            return Err(e.into());
        }

        let fields = validate_task(draft)?;
        let assignees = reconcile_references(
            draft.assignee_ids.as_deref().unwrap_or_default(),
            EntityKind::User,
            |id| self.storage().user_exists(id),
        )?;

        let candidate = TaskRecord {
            id: existing.id,
            version: existing.version,
            title: fields.title,
            description: fields.description,
            status: fields.status,
            priority: fields.priority,
            created_at: existing.created_at,
            updated_at: now_millis()?,
            due_at: fields.due_at,
            assignees,
        };
        let saved = self.storage_mut().save_task(&candidate, existing.version)?;
        debug!(
            task = id.get(),
            version = saved.version.get(),
            "task replaced"
        );

        let repr = TaskRepr::from_record(&saved);
        self.publish_task(&repr);
        Ok(repr)
    }

    /// Apply a merge-patch document to a task. The patch must be a JSON
    /// object carrying the version token of the copy it was derived from;
    /// a field set to null is deleted, a nested object merges, anything
    /// else replaces. Assignees are reconciled from the raw patch key, so
    /// an absent `assignee_ids` leaves the set untouched.
    pub fn patch_task(&mut self, id: TaskId, patch: &Value) -> Result<TaskRepr, ServiceError> {
        if !patch.is_object() {
            return Err(ServiceError::MalformedPatch(
                "patch document must be a JSON object".into(),
            ));
        }

        let existing = self.require_task(id)?;
        let supplied = version_from_patch(patch)?;
        if let Err(e) = check_version(existing.version, supplied) {
            warn!(
                task = id.get(),
                current = existing.version.get(),
                "patch rejected: {e}"
            );
            return Err(e.into());
        }

        let base = TaskRepr::from_record(&existing).to_value()?;
        let merged = merge(&base, patch);
        let draft = TaskDraft::from_value(&merged)?;
        let fields = validate_task(&draft)?;

        let proposed = relationship_patch(patch, "assignee_ids")?;
        let assignees =
            apply_relationship_patch(&existing.assignees, &proposed, EntityKind::User, |id| {
                self.storage().user_exists(id)
            })?;

        let candidate = TaskRecord {
            id: existing.id,
            version: existing.version,
            title: fields.title,
            description: fields.description,
            status: fields.status,
            priority: fields.priority,
            created_at: existing.created_at,
            updated_at: now_millis()?,
            due_at: fields.due_at,
            assignees,
        };
        let saved = self.storage_mut().save_task(&candidate, existing.version)?;
        debug!(
            task = id.get(),
            version = saved.version.get(),
            "task patched"
        );

        let repr = TaskRepr::from_record(&saved);
        self.publish_task(&repr);
        Ok(repr)
    }

    /// Delete a task, first detaching it from every project task set that
    /// holds it. Each affected project takes a version bump from the
    /// detach, so concurrent project updates built on the old membership
    /// conflict instead of resurrecting the reference.
    pub fn delete_task(&mut self, id: TaskId) -> Result<(), ServiceError> {
        if !self.storage().task_exists(id)? {
            return Err(ServiceError::NotFound {
                kind: EntityKind::Task,
                id: id.get(),
            });
        }

        let holders = self.storage().projects_containing_task(id)?;
        if !holders.is_empty() {
            debug!(
                task = id.get(),
                projects = holders.len(),
                "detaching task from project task sets"
            );
        }
        self.storage_mut().detach_task_from_projects(id)?;
        self.storage_mut().delete_task(id)?;
        debug!(task = id.get(), "task deleted");

        self.notifier().publish(TASK_CHANNEL, &Value::from(id.get()));
        Ok(())
    }

    pub(crate) fn require_task(&self, id: TaskId) -> Result<TaskRecord, ServiceError> {
        self.storage()
            .get_task(id)?
            .ok_or(ServiceError::NotFound {
                kind: EntityKind::Task,
                id: id.get(),
            })
    }

    fn publish_task(&self, repr: &TaskRepr) {
        match repr.to_value() {
            Ok(payload) => self.notifier().publish(TASK_CHANNEL, &payload),
            Err(e) => warn!(task = repr.id.get(), "task notification skipped: {e}"),
        }
    }
}
