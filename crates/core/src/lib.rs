pub mod draft;
pub mod error;
pub mod ids;
pub mod merge;
pub mod record;
pub mod repr;
pub mod time;
pub mod validate;
pub mod version;

pub use error::CoreError;
pub use ids::{ProjectId, TaskId, UserId};
pub use version::Version;
