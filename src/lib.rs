//! Backlog and sprint tracking over a two-worksheet sheet.

pub mod config;
pub mod error;
pub mod legacy;
pub mod model;
pub mod report;
pub mod storage;
pub mod tracker;

pub use error::{EntityKind, StorageError, TrackerError, TrackerResult};
pub use model::{Assignment, BacklogItem, Priority, Sprint, TaskStatus};
pub use report::SprintStatus;
pub use storage::{SheetStore, StorageClient};
pub use tracker::Tracker;
