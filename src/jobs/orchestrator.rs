//! Background crawl jobs.
//!
//! Each submitted job runs the fixed pipeline repository, issues, pull
//! requests, owner profile on its own tracked task. Callers poll
//! [`JobOrchestrator::get_status`] for progress. Jobs live in memory for the
//! lifetime of the process.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};

use crate::github::error::IntakeError;
use crate::github::locator::RepositoryLocator;
use crate::ingest::IngestionService;
use crate::telemetry::{TelemetryEvent, TelemetrySink};

use super::model::{Job, JobId, JobParams, JobSnapshot, JobStatus};
use super::table::JobTable;

/// Default time a job may run before it is failed.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(600);

const REPOSITORY_DONE: u8 = 20;
const ISSUES_DONE: u8 = 50;
const PULL_REQUESTS_DONE: u8 = 80;

/// Runs crawl jobs in the background and reports their status.
pub struct JobOrchestrator {
    ingestion: IngestionService,
    telemetry: Arc<dyn TelemetrySink>,
    table: Arc<JobTable>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    job_timeout: Duration,
}

impl JobOrchestrator {
    /// Creates an orchestrator whose jobs are bounded by `job_timeout`.
    #[must_use]
    pub fn new(
        ingestion: IngestionService,
        telemetry: Arc<dyn TelemetrySink>,
        job_timeout: Duration,
    ) -> Self {
        Self {
            ingestion,
            telemetry,
            table: Arc::new(JobTable::default()),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            job_timeout,
        }
    }

    /// Validates `params`, records a pending job and starts it in the
    /// background. Returns without waiting for any step.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingField`] for a blank owner or repository,
    /// or [`IntakeError::JobAllocation`] if the id cannot be stored.
    pub fn submit(&self, params: JobParams) -> Result<JobId, IntakeError> {
        RepositoryLocator::new(&params.owner, &params.repository)?;

        let job_id = JobId::generate();
        self.table
            .create(Job::pending(job_id.clone(), params.clone(), Utc::now()))?;
        self.telemetry.record(TelemetryEvent::JobSubmitted {
            job_id: job_id.as_str().to_owned(),
        });
        info!(
            job_id = job_id.as_str(),
            owner = params.owner.as_str(),
            repository = params.repository.as_str(),
            "crawl job submitted"
        );

        let runner = JobRunner {
            job_id: job_id.clone(),
            params,
            ingestion: self.ingestion.clone(),
            telemetry: Arc::clone(&self.telemetry),
            table: Arc::clone(&self.table),
            cancel: self.shutdown.child_token(),
            job_timeout: self.job_timeout,
            step: Mutex::new(PipelineStep::Repository),
        };
        self.tracker.spawn(runner.run());

        Ok(job_id)
    }

    /// Returns the current state of a job.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingField`] for a blank id or
    /// [`IntakeError::JobNotFound`] for an unknown one.
    pub fn get_status(&self, job_id: &str) -> Result<JobSnapshot, IntakeError> {
        let id = JobId::parse(job_id)?;
        self.table
            .get(&id)
            .ok_or_else(|| IntakeError::JobNotFound {
                job_id: id.as_str().to_owned(),
            })
    }

    /// Number of jobs whose tasks are still running.
    #[must_use]
    pub fn running_jobs(&self) -> usize {
        self.tracker.len()
    }

    /// Cancels every running job and waits up to `grace` for their tasks to
    /// record the outcome. Returns `true` when all tasks finished in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.shutdown.cancel();
        self.tracker.close();
        timeout(grace, self.tracker.wait()).await.is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineStep {
    Repository,
    Issues,
    PullRequests,
    Owner,
}

impl PipelineStep {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Repository => "repository",
            Self::Issues => "issues",
            Self::PullRequests => "pull_requests",
            Self::Owner => "owner",
        }
    }
}

struct JobRunner {
    job_id: JobId,
    params: JobParams,
    ingestion: IngestionService,
    telemetry: Arc<dyn TelemetrySink>,
    table: Arc<JobTable>,
    cancel: CancellationToken,
    job_timeout: Duration,
    step: Mutex<PipelineStep>,
}

impl JobRunner {
    async fn run(self) {
        self.table.update(&self.job_id, |job| job.start(Utc::now()));
        info!(job_id = self.job_id.as_str(), "crawl job started");

        let outcome = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err("job cancelled by shutdown".to_owned()),
            finished = timeout(self.job_timeout, self.pipeline()) => finished.unwrap_or_else(|_| {
                Err(format!(
                    "job exceeded deadline of {}s",
                    self.job_timeout.as_secs()
                ))
            }),
        };

        let (snapshot, failed_step) = match outcome {
            Ok(()) => (
                self.table
                    .update(&self.job_id, |job| job.complete(Utc::now())),
                None,
            ),
            Err(message) => {
                let step = self.current_step();
                error!(
                    job_id = self.job_id.as_str(),
                    step = step.as_str(),
                    "crawl job failed: {message}"
                );
                (
                    self.table
                        .update(&self.job_id, |job| job.fail(message, Utc::now())),
                    Some(step),
                )
            }
        };

        if let Some(finished) = snapshot {
            if finished.status == JobStatus::Completed {
                info!(job_id = self.job_id.as_str(), "crawl job completed");
            }
            self.telemetry.record(TelemetryEvent::JobFinished {
                job_id: finished.job_id,
                status: finished.status.as_str().to_owned(),
                progress: finished.progress,
                failed_step: failed_step.map(|step| step.as_str().to_owned()),
            });
        }
    }

    async fn pipeline(&self) -> Result<(), String> {
        let owner = self.params.owner.as_str();
        let repository = self.params.repository.as_str();

        self.enter(PipelineStep::Repository);
        let fetched = self
            .ingestion
            .parse_repository(owner, repository, &self.cancel)
            .await
            .map_err(|error| format!("failed to parse repository: {error}"))?;
        self.advance(REPOSITORY_DONE);

        if self.params.issues {
            self.enter(PipelineStep::Issues);
            self.ingestion
                .parse_issues(owner, repository, &self.cancel)
                .await
                .map_err(|error| format!("failed to parse issues: {error}"))?;
            self.advance(ISSUES_DONE);
        }

        if self.params.pull_requests {
            self.enter(PipelineStep::PullRequests);
            self.ingestion
                .parse_pull_requests(owner, repository, &self.cancel)
                .await
                .map_err(|error| format!("failed to parse pull requests: {error}"))?;
            self.advance(PULL_REQUESTS_DONE);
        }

        if self.params.users {
            self.enter(PipelineStep::Owner);
            self.ingestion
                .parse_user(&fetched.owner_login, &self.cancel)
                .await
                .map_err(|error| format!("failed to parse owner: {error}"))?;
        }

        Ok(())
    }

    fn enter(&self, step: PipelineStep) {
        *self.step.lock().unwrap_or_else(PoisonError::into_inner) = step;
    }

    fn current_step(&self) -> PipelineStep {
        *self.step.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn advance(&self, progress: u8) {
        self.table
            .update(&self.job_id, |job| job.advance(progress, Utc::now()));
    }
}
