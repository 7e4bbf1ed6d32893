//! Application configuration loaded from CLI, environment, and files.
//!
//! Values are merged with ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.hubcrawl.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `HUBCRAWL_*`, plus the legacy
//!    `GITHUB_TOKEN` for the token
//! 4. **Command-line arguments** – `--owner`, `--repo`, `--crawl`, and so on
//!
//! # Configuration File
//!
//! ```toml
//! token = "ghp_example"
//! database_url = "hubcrawl.sqlite"
//! owner = "octocat"
//! repo = "hello-world"
//! issues = true
//! pull_requests = true
//! rate_limit_max_requests = 5000
//! job_timeout_seconds = 600
//! ```

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::github::error::IntakeError;
use crate::github::pagination::PageRequest;
use crate::github::quota::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW, QuotaSettings};
use crate::github::retry::{DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_ATTEMPTS, RetryPolicy};
use crate::ingest::IngestionSettings;
use crate::jobs::{DEFAULT_JOB_TIMEOUT, JobParams};
use crate::persistence::{ListWindow, PersistenceError};

/// Operation mode determined by CLI arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    /// Apply database migrations and exit.
    MigrateDatabase,
    /// Print stored records.
    ListRecords,
    /// Run a background crawl job and poll it to completion.
    Crawl,
    /// Parse one repository (and optionally its issues, pull requests and
    /// owner) synchronously.
    ParseRepository,
    /// Parse one user profile.
    ParseUser,
    /// Nothing to do was requested.
    Unspecified,
}

/// Record kind selected by `--list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListTarget {
    /// Stored repositories.
    Repositories,
    /// Stored issues.
    Issues,
    /// Stored pull requests.
    PullRequests,
    /// Stored users.
    Users,
}

impl ListTarget {
    /// Name accepted on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Repositories => "repositories",
            Self::Issues => "issues",
            Self::PullRequests => "pull-requests",
            Self::Users => "users",
        }
    }
}

impl fmt::Display for ListTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListTarget {
    type Err = IntakeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "repositories" | "repos" => Ok(Self::Repositories),
            "issues" => Ok(Self::Issues),
            "pull-requests" | "pull_requests" | "pulls" => Ok(Self::PullRequests),
            "users" => Ok(Self::Users),
            other => Err(IntakeError::Configuration {
                message: format!(
                    "unknown list target {other:?} (expected repositories, issues, \
                     pull-requests or users)"
                ),
            }),
        }
    }
}

/// Application configuration supporting CLI, environment, and file sources.
///
/// # Example
///
/// ```no_run
/// use hubcrawl::HubcrawlConfig;
/// use ortho_config::OrthoConfig;
///
/// let config = HubcrawlConfig::load().expect("failed to load configuration");
/// let token = config.resolve_token().expect("token required");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "HUBCRAWL",
    discovery(
        dotfile_name = ".hubcrawl.toml",
        config_file_name = "hubcrawl.toml",
        app_name = "hubcrawl"
    )
)]
pub struct HubcrawlConfig {
    /// Personal access token for GitHub API authentication.
    ///
    /// Can be provided via:
    /// - CLI: `--token <TOKEN>` or `-t <TOKEN>`
    /// - Environment: `HUBCRAWL_TOKEN` or `GITHUB_TOKEN` (legacy)
    /// - Config file: `token = "..."`
    #[ortho_config(cli_short = 't')]
    pub token: Option<String>,

    /// GitHub API base URL, for GitHub Enterprise or test servers.
    #[ortho_config()]
    pub api_base: Option<String>,

    /// Local `SQLite` database path. Without it records are kept in memory
    /// for the duration of the run.
    ///
    /// Can be provided via:
    /// - CLI: `--database-url <PATH>`
    /// - Environment: `HUBCRAWL_DATABASE_URL`
    /// - Config file: `database_url = "..."`
    #[ortho_config()]
    pub database_url: Option<String>,

    /// Runs database migrations and exits.
    #[ortho_config()]
    pub migrate_db: bool,

    /// Repository owner (e.g., "octocat").
    #[ortho_config(cli_short = 'o')]
    pub owner: Option<String>,

    /// Repository name (e.g., "hello-world").
    #[ortho_config(cli_short = 'r')]
    pub repo: Option<String>,

    /// User login to parse.
    #[ortho_config(cli_short = 'u')]
    pub login: Option<String>,

    /// Runs the repository crawl as a background job and polls its status.
    #[ortho_config(cli_short = 'c')]
    pub crawl: bool,

    /// Also ingest the repository's issues.
    #[ortho_config()]
    pub issues: bool,

    /// Also ingest the repository's pull requests.
    #[ortho_config()]
    pub pull_requests: bool,

    /// Also ingest the repository owner's profile.
    #[ortho_config()]
    pub users: bool,

    /// Lists stored records: `repositories`, `issues`, `pull-requests` or
    /// `users`.
    #[ortho_config(cli_short = 'l')]
    pub list: Option<String>,

    /// Repository listing filter on primary language.
    #[ortho_config()]
    pub language: Option<String>,

    /// Repository listing filter on minimum star count.
    #[ortho_config()]
    pub min_stars: Option<u32>,

    /// Issue and pull request listing filter on state.
    #[ortho_config()]
    pub state: Option<String>,

    /// Issue and pull request listing filter on repository id.
    #[ortho_config()]
    pub repository_id: Option<u64>,

    /// Maximum records to list; 0 lists everything.
    #[ortho_config()]
    pub limit: u32,

    /// Records to skip before listing.
    #[ortho_config()]
    pub offset: u32,

    /// Records requested per GitHub page (1 to 100).
    #[ortho_config()]
    pub page_size: u8,

    /// Maximum GitHub pages fetched per collection.
    #[ortho_config()]
    pub max_pages: u32,

    /// Requests allowed per rate limit window.
    #[ortho_config()]
    pub rate_limit_max_requests: u32,

    /// Rate limit window length in seconds.
    #[ortho_config()]
    pub rate_limit_window_seconds: u64,

    /// Attempts made for transient failures.
    #[ortho_config()]
    pub retry_max_attempts: u32,

    /// Wait before the first retry, in milliseconds. Doubles per attempt.
    #[ortho_config()]
    pub retry_initial_backoff_ms: u64,

    /// Deadline for a crawl job, in seconds.
    #[ortho_config()]
    pub job_timeout_seconds: u64,

    /// How often `--crawl` polls the job status, in milliseconds.
    #[ortho_config()]
    pub poll_interval_ms: u64,

    /// Writes telemetry events to stderr as JSON lines.
    #[ortho_config()]
    pub telemetry: bool,
}

const DEFAULT_PAGE_SIZE: u8 = 100;
const DEFAULT_MAX_PAGES: u32 = 1;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

impl Default for HubcrawlConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: None,
            database_url: None,
            migrate_db: false,
            owner: None,
            repo: None,
            login: None,
            crawl: false,
            issues: false,
            pull_requests: false,
            users: false,
            list: None,
            language: None,
            min_stars: None,
            state: None,
            repository_id: None,
            limit: 0,
            offset: 0,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            rate_limit_max_requests: DEFAULT_MAX_REQUESTS,
            rate_limit_window_seconds: DEFAULT_WINDOW.as_secs(),
            retry_max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_initial_backoff_ms: duration_millis(DEFAULT_INITIAL_BACKOFF),
            job_timeout_seconds: DEFAULT_JOB_TIMEOUT.as_secs(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            telemetry: false,
        }
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl HubcrawlConfig {
    /// Resolves the token from configuration or the legacy `GITHUB_TOKEN`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingToken`] when no token source provides a
    /// value.
    pub fn resolve_token(&self) -> Result<String, IntakeError> {
        self.token
            .clone()
            .or_else(|| env::var("GITHUB_TOKEN").ok())
            .ok_or(IntakeError::MissingToken)
    }

    /// Determines the operation mode from the configured flags.
    ///
    /// Migration wins over listing, listing over crawling, and crawling over
    /// a synchronous repository parse. A login alone parses that user.
    #[must_use]
    pub const fn operation_mode(&self) -> OperationMode {
        if self.migrate_db {
            OperationMode::MigrateDatabase
        } else if self.list.is_some() {
            OperationMode::ListRecords
        } else if self.crawl {
            OperationMode::Crawl
        } else if self.owner.is_some() && self.repo.is_some() {
            OperationMode::ParseRepository
        } else if self.login.is_some() {
            OperationMode::ParseUser
        } else {
            OperationMode::Unspecified
        }
    }

    /// Returns owner and repo if both are configured.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] when owner or repo is missing.
    pub fn require_repository_info(&self) -> Result<(&str, &str), IntakeError> {
        match (&self.owner, &self.repo) {
            (Some(owner), Some(repo)) => Ok((owner.as_str(), repo.as_str())),
            (None, _) => Err(IntakeError::Configuration {
                message: "repository owner is required (use --owner or -o)".to_owned(),
            }),
            (_, None) => Err(IntakeError::Configuration {
                message: "repository name is required (use --repo or -r)".to_owned(),
            }),
        }
    }

    /// Returns the configured user login.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] when no login is configured.
    pub fn require_login(&self) -> Result<&str, IntakeError> {
        self.login
            .as_deref()
            .ok_or_else(|| IntakeError::Configuration {
                message: "user login is required (use --login or -u)".to_owned(),
            })
    }

    /// Returns the database URL.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] when no database URL is
    /// configured.
    pub fn require_database_url(&self) -> Result<&str, IntakeError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| IntakeError::Configuration {
                message: PersistenceError::MissingDatabaseUrl.to_string(),
            })
    }

    /// Parses the `--list` target.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] when the target is missing or
    /// unknown.
    pub fn list_target(&self) -> Result<ListTarget, IntakeError> {
        self.list
            .as_deref()
            .ok_or_else(|| IntakeError::Configuration {
                message: "list target is required (use --list)".to_owned(),
            })?
            .parse()
    }

    /// Limit and offset for listings.
    #[must_use]
    pub const fn list_window(&self) -> ListWindow {
        ListWindow::new(self.limit, self.offset)
    }

    /// Parameters for a crawl job over the configured repository.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] when owner or repo is missing.
    pub fn job_params(&self) -> Result<JobParams, IntakeError> {
        let (owner, repo) = self.require_repository_info()?;
        Ok(JobParams {
            owner: owner.to_owned(),
            repository: repo.to_owned(),
            issues: self.issues,
            pull_requests: self.pull_requests,
            users: self.users,
        })
    }

    /// Limits for the shared quota limiter.
    #[must_use]
    pub const fn quota_settings(&self) -> QuotaSettings {
        QuotaSettings {
            max_requests: self.rate_limit_max_requests,
            window: Duration::from_secs(self.rate_limit_window_seconds),
        }
    }

    /// Retry policy for remote calls and storage writes.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_initial_backoff_ms),
        )
    }

    /// Pagination limits for collection ingestion.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::InvalidPagination`] when `page_size` is outside
    /// 1 to 100.
    pub fn ingestion_settings(&self) -> Result<IngestionSettings, IntakeError> {
        PageRequest::new(1, self.page_size)?;
        Ok(IngestionSettings {
            page_size: self.page_size,
            max_pages: self.max_pages,
        })
    }

    /// Deadline applied to each crawl job.
    #[must_use]
    pub const fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_seconds)
    }

    /// Interval between status polls in crawl mode.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
