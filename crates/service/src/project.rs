use serde_json::Value;
use tracing::{debug, warn};

use kanban_core::draft::ProjectDraft;
use kanban_core::merge::merge;
use kanban_core::record::ProjectRecord;
use kanban_core::repr::ProjectRepr;
use kanban_core::validate::validate_project;
use kanban_core::version::{check_version, version_from_patch};
use kanban_core::ProjectId;

use kanban_storage::{NewProject, Page, PageRequest, Storage};

use crate::error::{EntityKind, ServiceError};
use crate::notify::{Notifier, PROJECT_CHANNEL};
use crate::reconcile::{apply_relationship_patch, reconcile_references, relationship_patch};
use crate::KanbanService;

impl<S: Storage, N: Notifier> KanbanService<S, N> {
    pub fn create_project(&mut self, draft: &ProjectDraft) -> Result<ProjectRepr, ServiceError> {
        let name = validate_project(draft)?;
        let participants = reconcile_references(
            draft.participant_ids.as_deref().unwrap_or_default(),
            EntityKind::User,
            |id| self.storage().user_exists(id),
        )?;
        let tasks = reconcile_references(
            draft.task_ids.as_deref().unwrap_or_default(),
            EntityKind::Task,
            |id| self.storage().task_exists(id),
        )?;

        let record = self.storage_mut().insert_project(&NewProject {
            name,
            participants,
            tasks,
        })?;
        debug!(project = record.id.get(), "project created");

        let repr = ProjectRepr::from_record(&record);
        self.publish_project(&repr);
        Ok(repr)
    }

    pub fn get_project(&self, id: ProjectId) -> Result<ProjectRepr, ServiceError> {
        Ok(ProjectRepr::from_record(&self.require_project(id)?))
    }

    pub fn list_projects(&self, page: PageRequest) -> Result<Page<ProjectRepr>, ServiceError> {
        let page = self.storage().list_projects(page)?;
        Ok(page.map(|record| ProjectRepr::from_record(&record)))
    }

    /// Full replacement of a project's mutable state. Relationship ids the
    /// draft omits are treated as empty sets.
    pub fn replace_project(
        &mut self,
        id: ProjectId,
        draft: &ProjectDraft,
    ) -> Result<ProjectRepr, ServiceError> {
        let existing = self.require_project(id)?;
        if let Err(e) = check_version(existing.version, draft.version) {
            warn!(
                project = id.get(),
                current = existing.version.get(),
                "replace rejected: {e}"
            );
            return Err(e.into());
        }

        let name = validate_project(draft)?;
        let participants = reconcile_references(
            draft.participant_ids.as_deref().unwrap_or_default(),
            EntityKind::User,
            |id| self.storage().user_exists(id),
        )?;
        let tasks = reconcile_references(
            draft.task_ids.as_deref().unwrap_or_default(),
            EntityKind::Task,
            |id| self.storage().task_exists(id),
        )?;

        let candidate = ProjectRecord {
            id: existing.id,
            version: existing.version,
            name,
            participants,
            tasks,
        };
        let saved = self
            .storage_mut()
            .save_project(&candidate, existing.version)?;
        debug!(
            project = id.get(),
            version = saved.version.get(),
            "project replaced"
        );

        let repr = ProjectRepr::from_record(&saved);
        self.publish_project(&repr);
        Ok(repr)
    }

    /// Apply a merge-patch document to a project. Both relationship sets
    /// are reconciled from the raw patch keys, participants before tasks,
    /// so the first dangling reference reported is deterministic.
    pub fn patch_project(
        &mut self,
        id: ProjectId,
        patch: &Value,
    ) -> Result<ProjectRepr, ServiceError> {
        if !patch.is_object() {
            return Err(ServiceError::MalformedPatch(
                "patch document must be a JSON object".into(),
            ));
        }

        let existing = self.require_project(id)?;
        let supplied = version_from_patch(patch)?;
        if let Err(e) = check_version(existing.version, supplied) {
            warn!(
                project = id.get(),
                current = existing.version.get(),
                "patch rejected: {e}"
            );
            return Err(e.into());
        }

        let base = ProjectRepr::from_record(&existing).to_value()?;
        let merged = merge(&base, patch);
        let draft = ProjectDraft::from_value(&merged)?;
        let name = validate_project(&draft)?;

        let proposed_participants = relationship_patch(patch, "participant_ids")?;
        let participants = apply_relationship_patch(
            &existing.participants,
            &proposed_participants,
            EntityKind::User,
            |id| self.storage().user_exists(id),
        )?;
        let proposed_tasks = relationship_patch(patch, "task_ids")?;
        let tasks = apply_relationship_patch(
            &existing.tasks,
            &proposed_tasks,
            EntityKind::Task,
            |id| self.storage().task_exists(id),
        )?;

        let candidate = ProjectRecord {
            id: existing.id,
            version: existing.version,
            name,
            participants,
            tasks,
        };
        let saved = self
            .storage_mut()
            .save_project(&candidate, existing.version)?;
        debug!(
            project = id.get(),
            version = saved.version.get(),
            "project patched"
        );

        let repr = ProjectRepr::from_record(&saved);
        self.publish_project(&repr);
        Ok(repr)
    }

    pub fn delete_project(&mut self, id: ProjectId) -> Result<(), ServiceError> {
        if !self.storage().project_exists(id)? {
            return Err(ServiceError::NotFound {
                kind: EntityKind::Project,
                id: id.get(),
            });
        }
        self.storage_mut().delete_project(id)?;
        debug!(project = id.get(), "project deleted");

        self.notifier()
            .publish(PROJECT_CHANNEL, &Value::from(id.get()));
        Ok(())
    }

    pub(crate) fn require_project(&self, id: ProjectId) -> Result<ProjectRecord, ServiceError> {
        self.storage()
            .get_project(id)?
            .ok_or(ServiceError::NotFound {
                kind: EntityKind::Project,
                id: id.get(),
            })
    }

    fn publish_project(&self, repr: &ProjectRepr) {
        match repr.to_value() {
            Ok(payload) => self.notifier().publish(PROJECT_CHANNEL, &payload),
            Err(e) => warn!(project = repr.id.get(), "project notification skipped: {e}"),
        }
    }
}
