use std::collections::BTreeSet;

use kanban_core::record::{ProjectRecord, TaskPriority, TaskRecord, TaskStatus, UserRecord};
use kanban_core::{ProjectId, TaskId, UserId, Version};

use crate::error::StorageError;
use crate::page::{Page, PageRequest};

/// Fields of a task to be created. Identity, version, and timestamps are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_at: Option<i64>,
    pub assignees: BTreeSet<UserId>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub participants: BTreeSet<UserId>,
    pub tasks: BTreeSet<TaskId>,
}

/// Authoritative storage for the two aggregates and the user lookups they
/// reference. `save_*` is the atomic version-conditioned write: it persists
/// the candidate with `version = expected + 1` only if the stored row is
/// still at `expected`, rewriting the aggregate's relationship rows in the
/// same transaction, and reports `VersionMismatch` otherwise.
pub trait Storage {
    // Tasks
    fn insert_task(&mut self, new: &NewTask) -> Result<TaskRecord, StorageError>;
    fn get_task(&self, id: TaskId) -> Result<Option<TaskRecord>, StorageError>;
    fn task_exists(&self, id: TaskId) -> Result<bool, StorageError>;
    fn save_task(
        &mut self,
        candidate: &TaskRecord,
        expected: Version,
    ) -> Result<TaskRecord, StorageError>;
    fn delete_task(&mut self, id: TaskId) -> Result<(), StorageError>;
    fn list_tasks(&self, page: PageRequest) -> Result<Page<TaskRecord>, StorageError>;
    fn list_tasks_by_status(
        &self,
        status: TaskStatus,
        page: PageRequest,
    ) -> Result<Page<TaskRecord>, StorageError>;

    // Projects
    fn insert_project(&mut self, new: &NewProject) -> Result<ProjectRecord, StorageError>;
    fn get_project(&self, id: ProjectId) -> Result<Option<ProjectRecord>, StorageError>;
    fn project_exists(&self, id: ProjectId) -> Result<bool, StorageError>;
    fn save_project(
        &mut self,
        candidate: &ProjectRecord,
        expected: Version,
    ) -> Result<ProjectRecord, StorageError>;
    fn delete_project(&mut self, id: ProjectId) -> Result<(), StorageError>;
    fn list_projects(&self, page: PageRequest) -> Result<Page<ProjectRecord>, StorageError>;

    /// Projects whose task set still holds the given task. Used by the
    /// explicit cascade step of the task delete path.
    fn projects_containing_task(&self, id: TaskId) -> Result<Vec<ProjectId>, StorageError>;

    /// Remove the task from every project task set that holds it, bumping
    /// the version of each affected project.
    fn detach_task_from_projects(&mut self, id: TaskId) -> Result<(), StorageError>;

    // Users (referenced, never owned)
    fn insert_user(&mut self, username: &str) -> Result<UserRecord, StorageError>;
    fn get_user(&self, id: UserId) -> Result<Option<UserRecord>, StorageError>;
    fn user_exists(&self, id: UserId) -> Result<bool, StorageError>;
}
