//! Asynchronous crawl jobs with pollable progress.

mod model;
mod orchestrator;
mod table;

pub use model::{JobId, JobParams, JobSnapshot, JobStatus};
pub use orchestrator::{DEFAULT_JOB_TIMEOUT, JobOrchestrator};
