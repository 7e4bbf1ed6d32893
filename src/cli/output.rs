//! Output formatting utilities for CLI operations.

use std::io::{self, Write};

use hubcrawl::github::{Issue, PullRequest, Repository, User};
use hubcrawl::{IntakeError, JobSnapshot};

/// Writes a one-line summary of a parsed repository.
pub fn write_repository_summary<W: Write>(
    writer: &mut W,
    repository: &Repository,
) -> Result<(), IntakeError> {
    let language = repository.language.as_deref().unwrap_or("unknown language");
    writeln!(
        writer,
        "Parsed repository {} (id {}): {language}, {} stars, {} forks, {} open issues",
        repository.full_name,
        repository.id,
        repository.stargazers_count,
        repository.forks_count,
        repository.open_issues_count
    )
    .map_err(|e| io_error(&e))
}

/// Writes how many records of a collection were parsed.
pub fn write_collection_count<W: Write>(
    writer: &mut W,
    kind: &str,
    count: usize,
) -> Result<(), IntakeError> {
    writeln!(writer, "Parsed {count} {kind}").map_err(|e| io_error(&e))
}

/// Writes a one-line summary of a parsed user.
pub fn write_user_summary<W: Write>(writer: &mut W, user: &User) -> Result<(), IntakeError> {
    let name = user.name.as_deref().unwrap_or("no display name");
    writeln!(writer, "Parsed user @{} (id {}): {name}", user.login, user.id)
        .map_err(|e| io_error(&e))
}

/// Writes the state of a crawl job.
pub fn write_job_progress<W: Write>(
    writer: &mut W,
    snapshot: &JobSnapshot,
) -> Result<(), IntakeError> {
    if snapshot.error_message.is_empty() {
        writeln!(
            writer,
            "Job {} [{}] {}%",
            snapshot.job_id, snapshot.status, snapshot.progress
        )
    } else {
        writeln!(
            writer,
            "Job {} [{}] {}%: {}",
            snapshot.job_id, snapshot.status, snapshot.progress, snapshot.error_message
        )
    }
    .map_err(|e| io_error(&e))
}

/// Writes a table of stored repositories.
pub fn write_repositories<W: Write>(
    writer: &mut W,
    repositories: &[Repository],
) -> Result<(), IntakeError> {
    for repository in repositories {
        let language = repository.language.as_deref().unwrap_or("-");
        writeln!(
            writer,
            "  {} [{language}] {} stars (id {})",
            repository.full_name, repository.stargazers_count, repository.id
        )
        .map_err(|e| io_error(&e))?;
    }
    write_total(writer, repositories.len(), "repositories")
}

/// Writes a table of stored issues.
pub fn write_issues<W: Write>(writer: &mut W, issues: &[Issue]) -> Result<(), IntakeError> {
    for issue in issues {
        write_numbered_line(
            writer,
            issue.number,
            &issue.state,
            &issue.title,
            issue.author_login.as_deref(),
        )?;
    }
    write_total(writer, issues.len(), "issues")
}

/// Writes a table of stored pull requests.
pub fn write_pull_requests<W: Write>(
    writer: &mut W,
    pull_requests: &[PullRequest],
) -> Result<(), IntakeError> {
    for pull_request in pull_requests {
        write_numbered_line(
            writer,
            pull_request.number,
            &pull_request.state,
            &pull_request.title,
            pull_request.author_login.as_deref(),
        )?;
    }
    write_total(writer, pull_requests.len(), "pull requests")
}

/// Writes a table of stored users.
pub fn write_users<W: Write>(writer: &mut W, users: &[User]) -> Result<(), IntakeError> {
    for user in users {
        let name = user.name.as_deref().unwrap_or("-");
        writeln!(writer, "  @{} {name} (id {})", user.login, user.id)
            .map_err(|e| io_error(&e))?;
    }
    write_total(writer, users.len(), "users")
}

fn write_numbered_line<W: Write>(
    writer: &mut W,
    number: u64,
    state: &str,
    title: &str,
    author: Option<&str>,
) -> Result<(), IntakeError> {
    let author_login = author.unwrap_or("unknown");
    writeln!(writer, "  #{number} [{state}] {title} (@{author_login})").map_err(|e| io_error(&e))
}

fn write_total<W: Write>(writer: &mut W, count: usize, kind: &str) -> Result<(), IntakeError> {
    writeln!(writer, "{count} {kind} shown").map_err(|e| io_error(&e))
}

/// Converts an I/O error to an [`IntakeError::Io`].
pub(crate) fn io_error(error: &io::Error) -> IntakeError {
    IntakeError::Io {
        message: error.to_string(),
    }
}
