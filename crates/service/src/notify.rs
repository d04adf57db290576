use serde_json::Value;

pub const TASK_CHANNEL: &str = "tasks";
pub const PROJECT_CHANNEL: &str = "projects";

/// Push channel for committed changes. After a successful create, update,
/// or delete the resulting representation (or the deleted id) is published
/// to the channel for its resource type. Delivery and ordering guarantees
/// belong to the implementation; a failing implementation must swallow
/// its own errors, since a committed update never fails because of its
/// notification.
pub trait Notifier {
    fn publish(&self, channel: &str, payload: &Value);
}

/// Notifier that drops everything. For embedders that poll instead.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn publish(&self, _channel: &str, _payload: &Value) {}
}
