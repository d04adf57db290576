use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use kanban_core::draft::{ProjectDraft, TaskDraft};
use kanban_core::repr::{ProjectRepr, TaskRepr};
use kanban_core::{ProjectId, TaskId, UserId};
use kanban_service::{KanbanService, ServiceError};
use kanban_storage::{SqliteStorage, Storage, StorageError};

use crate::notify::RecordingNotifier;

/// A minimal valid task draft. Tests mutate the fields they care about.
pub fn task_draft(title: &str) -> TaskDraft {
    TaskDraft {
        title: Some(title.to_string()),
        status: Some("TO_DO".to_string()),
        priority: Some("MEDIUM".to_string()),
        ..TaskDraft::default()
    }
}

pub fn project_draft(name: &str) -> ProjectDraft {
    ProjectDraft {
        name: Some(name.to_string()),
        ..ProjectDraft::default()
    }
}

/// One service over an in-memory store with a recording notifier.
pub struct TestApp {
    pub service: KanbanService<SqliteStorage, RecordingNotifier>,
    events: Rc<RefCell<Vec<(String, Value)>>>,
}

impl TestApp {
    pub fn new() -> Result<Self, StorageError> {
        let storage = SqliteStorage::open_in_memory()?;
        let notifier = RecordingNotifier::new();
        let events = notifier.events();
        Ok(Self {
            service: KanbanService::new(storage, notifier),
            events,
        })
    }

    pub fn seed_user(&mut self, username: &str) -> Result<UserId, StorageError> {
        Ok(self.service.storage_mut().insert_user(username)?.id)
    }

    pub fn create_task(&mut self, title: &str) -> Result<TaskRepr, ServiceError> {
        self.service.create_task(&task_draft(title))
    }

    pub fn create_project(&mut self, name: &str) -> Result<ProjectRepr, ServiceError> {
        self.service.create_project(&project_draft(name))
    }

    pub fn patch_task(&mut self, id: TaskId, patch: Value) -> Result<TaskRepr, ServiceError> {
        self.service.patch_task(id, &patch)
    }

    pub fn patch_project(
        &mut self,
        id: ProjectId,
        patch: Value,
    ) -> Result<ProjectRepr, ServiceError> {
        self.service.patch_project(id, &patch)
    }

    /// Events published on the given channel, in order.
    pub fn events_on(&self, channel: &str) -> Vec<Value> {
        self.events
            .borrow()
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }
}
