pub mod error;
pub mod page;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use error::StorageError;
pub use page::{Page, PageRequest};
pub use sqlite::SqliteStorage;
pub use traits::{NewProject, NewTask, Storage};
