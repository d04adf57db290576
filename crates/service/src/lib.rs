pub mod error;
pub mod notify;
pub mod project;
pub mod reconcile;
pub mod task;

pub use error::{EntityKind, ServiceError};
pub use notify::{Notifier, NullNotifier, PROJECT_CHANNEL, TASK_CHANNEL};
pub use reconcile::RelationshipPatch;

use kanban_storage::Storage;

/// Orchestrator for aggregate updates. Owns the storage collaborator and
/// the notification channel; every mutation runs the same sequence:
/// load, guard, merge (patch path only), validate, reconcile, persist
/// with a version-conditioned write, notify.
pub struct KanbanService<S, N> {
    storage: S,
    notifier: N,
}

impl<S: Storage, N: Notifier> KanbanService<S, N> {
    pub fn new(storage: S, notifier: N) -> Self {
        Self { storage, notifier }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }
}
