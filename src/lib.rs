//! Hubcrawl library crate providing rate-limited GitHub ingestion.
//!
//! The library fetches repositories, issues, pull requests and users through
//! Octocrab under a shared request quota, retries transient failures, and
//! stores the records in a local `SQLite` database. Whole-repository crawls
//! run as background jobs whose progress can be polled.

pub mod config;
pub mod github;
pub mod ingest;
pub mod jobs;
pub mod persistence;
pub mod telemetry;

pub use config::{HubcrawlConfig, ListTarget, OperationMode};
pub use github::{
    GitHubGateway, IntakeError, OctocrabClient, PersonalAccessToken, QuotaLimiter,
    RepositoryLocator, RetryPolicy, ThrottledGateway,
};
pub use ingest::{IngestionService, IngestionSettings};
pub use jobs::{JobId, JobOrchestrator, JobParams, JobSnapshot, JobStatus};
