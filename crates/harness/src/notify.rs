use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use kanban_service::Notifier;

/// Notifier that records every published event so tests can assert on
/// channel traffic after the fact.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    events: Rc<RefCell<Vec<(String, Value)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle onto the shared event log; stays valid after the notifier
    /// is moved into a service.
    pub fn events(&self) -> Rc<RefCell<Vec<(String, Value)>>> {
        Rc::clone(&self.events)
    }
}

impl Notifier for RecordingNotifier {
    fn publish(&self, channel: &str, payload: &Value) {
        self.events
            .borrow_mut()
            .push((channel.to_string(), payload.clone()));
    }
}
