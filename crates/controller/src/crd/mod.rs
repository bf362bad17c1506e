pub mod command;
pub mod job;

pub use command::{Command, JobAction};
pub use job::{Job, JobSpec, JobState, JobStatus, TaskSpec};
