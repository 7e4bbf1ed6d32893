//! Hubcrawl CLI entrypoint for rate-limited GitHub ingestion.

use std::io::{self, Write};
use std::process::ExitCode;

use hubcrawl::{HubcrawlConfig, IntakeError, OperationMode};
use ortho_config::OrthoConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), IntakeError> {
    let config = load_config()?;

    match config.operation_mode() {
        OperationMode::MigrateDatabase => cli::migrations::run(&config),
        OperationMode::ListRecords => cli::listing::run(&config),
        OperationMode::Crawl => cli::crawl::run(&config).await,
        OperationMode::ParseRepository => cli::parse::run_repository(&config).await,
        OperationMode::ParseUser => cli::parse::run_user(&config).await,
        OperationMode::Unspecified => Err(IntakeError::Configuration {
            message: concat!(
                "nothing to do: pass --owner and --repo to parse a repository, ",
                "--login to parse a user, --crawl for a background crawl, ",
                "--list to show stored records or --migrate-db"
            )
            .to_owned(),
        }),
    }
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`IntakeError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config() -> Result<HubcrawlConfig, IntakeError> {
    HubcrawlConfig::load().map_err(|error| IntakeError::Configuration {
        message: error.to_string(),
    })
}

/// Logs to stderr so stdout carries only command output. `RUST_LOG`
/// overrides the default `info` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();
}
