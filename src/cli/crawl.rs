//! Background crawl with status polling.

use std::io::{self, Write};
use std::time::Duration;

use hubcrawl::{HubcrawlConfig, IntakeError, JobOrchestrator, JobParams, JobSnapshot, JobStatus};
use tokio::time::sleep;
use tracing::warn;

use super::output::{io_error, write_job_progress};
use super::services::{ingestion_service, telemetry_sink};

/// Time running jobs get to record their outcome after an interrupt.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Submits a crawl job for the configured repository and follows it until
/// it finishes or the process is interrupted.
///
/// # Errors
///
/// Returns [`IntakeError::Configuration`] if required configuration is
/// missing, [`IntakeError::JobFailed`] when the job fails, and
/// [`IntakeError::Cancelled`] after Ctrl-C.
pub async fn run(config: &HubcrawlConfig) -> Result<(), IntakeError> {
    let params = config.job_params()?;
    let telemetry = telemetry_sink(config);
    let service = ingestion_service(config, &telemetry)?;
    let orchestrator = JobOrchestrator::new(service, telemetry, config.job_timeout());

    let mut stdout = io::stdout().lock();
    let outcome = tokio::select! {
        result = follow_job(&orchestrator, params, config.poll_interval(), &mut stdout) => {
            result.map(drop)
        }
        signal = tokio::signal::ctrl_c() => {
            warn!("interrupt received; cancelling crawl");
            Err(signal.map_or_else(|error| io_error(&error), |()| IntakeError::Cancelled))
        }
    };

    if !orchestrator.shutdown(SHUTDOWN_GRACE).await {
        warn!(
            running = orchestrator.running_jobs(),
            "crawl jobs still running after shutdown grace period"
        );
    }
    outcome
}

/// Submits a job and polls it every `poll_interval`, writing a line each
/// time its status or progress changes.
///
/// Returns the final snapshot of a completed job.
///
/// # Errors
///
/// Returns submission errors and [`IntakeError::JobFailed`] when the job
/// ends in the failed state.
pub async fn follow_job<W: Write>(
    orchestrator: &JobOrchestrator,
    params: JobParams,
    poll_interval: Duration,
    writer: &mut W,
) -> Result<JobSnapshot, IntakeError> {
    let job_id = orchestrator.submit(params)?;
    let mut last_seen: Option<(JobStatus, u8)> = None;

    loop {
        let snapshot = orchestrator.get_status(job_id.as_str())?;
        let current = (snapshot.status, snapshot.progress);
        if last_seen != Some(current) {
            write_job_progress(writer, &snapshot)?;
            last_seen = Some(current);
        }

        match snapshot.status {
            JobStatus::Completed => return Ok(snapshot),
            JobStatus::Failed => {
                return Err(IntakeError::JobFailed {
                    job_id: snapshot.job_id,
                    message: snapshot.error_message,
                });
            }
            JobStatus::Pending | JobStatus::InProgress => sleep(poll_interval).await,
        }
    }
}
