//! In-memory job table.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::github::error::IntakeError;

use super::model::{Job, JobId, JobSnapshot};

/// Jobs keyed by id, readable while their pipelines run.
#[derive(Debug, Default)]
pub(crate) struct JobTable {
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl JobTable {
    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a new job, refusing to overwrite an existing id.
    pub(crate) fn create(&self, job: Job) -> Result<(), IntakeError> {
        let mut jobs = self.lock();
        if jobs.contains_key(job.id()) {
            return Err(IntakeError::JobAllocation {
                message: format!("job id {} already exists", job.id()),
            });
        }
        jobs.insert(job.id().clone(), job);
        Ok(())
    }

    pub(crate) fn get(&self, id: &JobId) -> Option<JobSnapshot> {
        self.lock().get(id).map(Job::snapshot)
    }

    /// Applies `change` to the job and returns its new snapshot.
    pub(crate) fn update<F>(&self, id: &JobId, change: F) -> Option<JobSnapshot>
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = self.lock();
        let job = jobs.get_mut(id)?;
        change(job);
        Some(job.snapshot())
    }
}
