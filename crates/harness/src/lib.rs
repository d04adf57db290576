pub mod app;
pub mod notify;

pub use app::{project_draft, task_draft, TestApp};
pub use notify::RecordingNotifier;
