//! Generation jobs and their persistence.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteJobStore;
pub use store::{CreateJobGroupRequest, JobError, JobStore, NewJob, StatusUpdate};
pub use types::{Job, JobGroup, JobState, VARIATIONS_PER_GROUP};
