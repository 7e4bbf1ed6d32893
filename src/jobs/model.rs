//! Job records and their state machine.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::github::error::IntakeError;

/// Lifecycle state of a crawl job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted but not yet started.
    Pending,
    /// The pipeline is running.
    InProgress,
    /// Every requested step finished.
    Completed,
    /// A step failed, the deadline passed, or the job was abandoned.
    Failed,
}

impl JobStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether the job can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque, collision-resistant job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    /// Allocates a fresh id from a time-ordered UUID.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("job-{}", Uuid::now_v7()))
    }

    /// Wraps a caller-supplied id.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingField`] when `value` is blank.
    pub fn parse(value: &str) -> Result<Self, IntakeError> {
        IntakeError::require("job_id", value).map(|trimmed| Self(trimmed.to_owned()))
    }

    /// Returns the id as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a crawl job should ingest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobParams {
    /// Repository owner login.
    pub owner: String,
    /// Repository name.
    pub repository: String,
    /// Ingest the repository's issues.
    pub issues: bool,
    /// Ingest the repository's pull requests.
    pub pull_requests: bool,
    /// Ingest the owner's user profile.
    pub users: bool,
}

/// Mutable job record held in the job table.
#[derive(Debug, Clone)]
pub(crate) struct Job {
    id: JobId,
    params: JobParams,
    status: JobStatus,
    progress: u8,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Job {
    pub(crate) const fn pending(id: JobId, params: JobParams, now: DateTime<Utc>) -> Self {
        Self {
            id,
            params,
            status: JobStatus::Pending,
            progress: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) const fn id(&self) -> &JobId {
        &self.id
    }

    pub(crate) fn start(&mut self, now: DateTime<Utc>) {
        if self.status == JobStatus::Pending {
            self.status = JobStatus::InProgress;
            self.updated_at = now;
        }
    }

    /// Raises progress; lower values are ignored.
    pub(crate) fn advance(&mut self, progress: u8, now: DateTime<Utc>) {
        if self.status == JobStatus::InProgress {
            self.progress = self.progress.max(progress.min(100));
            self.updated_at = now;
        }
    }

    pub(crate) fn complete(&mut self, now: DateTime<Utc>) {
        if !self.status.is_terminal() {
            self.status = JobStatus::Completed;
            self.progress = 100;
            self.updated_at = now;
        }
    }

    pub(crate) fn fail(&mut self, message: String, now: DateTime<Utc>) {
        if !self.status.is_terminal() {
            self.status = JobStatus::Failed;
            self.error_message = Some(message);
            self.updated_at = now;
        }
    }

    pub(crate) fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.id.as_str().to_owned(),
            repository: format!("{}/{}", self.params.owner, self.params.repository),
            status: self.status,
            progress: self.progress,
            error_message: self.error_message.clone().unwrap_or_default(),
            created_at: format_time(&self.created_at),
            updated_at: format_time(&self.updated_at),
        }
    }
}

fn format_time(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Point-in-time view of a job returned to polling callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSnapshot {
    /// Job identifier.
    pub job_id: String,
    /// Repository being crawled, as `owner/name`.
    pub repository: String,
    /// Current status.
    pub status: JobStatus,
    /// Completion percentage, 0 to 100.
    pub progress: u8,
    /// Failure reason; empty unless the job failed.
    pub error_message: String,
    /// Creation time, `YYYY-MM-DDTHH:MM:SSZ`.
    pub created_at: String,
    /// Time of the last transition, `YYYY-MM-DDTHH:MM:SSZ`.
    pub updated_at: String,
}
