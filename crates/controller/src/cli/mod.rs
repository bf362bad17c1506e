//! Command line surface for job lifecycle actions.

pub mod job;

pub use job::{ActionClient, ActionFlags, CommonFlags, JobCommand, KubeActionClient};
