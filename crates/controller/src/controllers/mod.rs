pub mod job;
pub mod pod;

pub use job::JobController;
pub use pod::PodController;
