//! Error mapping from Octocrab, HTTP statuses and storage into
//! [`IntakeError`].

use http::StatusCode;

use crate::github::error::IntakeError;
use crate::github::rate_limit::RateLimitInfo;
use crate::persistence::PersistenceError;

/// Checks if a GitHub error status indicates an authentication failure.
const fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// Checks if an octocrab error represents a network/transport issue.
const fn is_network_error(error: &octocrab::Error) -> bool {
    matches!(
        error,
        octocrab::Error::Http { .. }
            | octocrab::Error::Hyper { .. }
            | octocrab::Error::Service { .. }
    )
}

/// Checks whether a response is a rate limit rejection based on the status,
/// the message text and the quota headers.
fn is_rate_limit_response(
    status: StatusCode,
    message: &str,
    quota: Option<&RateLimitInfo>,
) -> bool {
    let is_rate_limit_status = matches!(
        status,
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
    );

    is_rate_limit_status
        && (message.to_lowercase().contains("rate limit")
            || quota.is_some_and(RateLimitInfo::is_exhausted))
}

pub(super) fn map_octocrab_error(operation: &str, error: &octocrab::Error) -> IntakeError {
    if let octocrab::Error::GitHub { source, .. } = error {
        return map_http_error(
            operation,
            source.status_code,
            Some(source.message.clone()),
            None,
        );
    }

    if is_network_error(error) {
        return IntakeError::Network {
            message: format!("{operation} failed: {error}"),
        };
    }

    IntakeError::Api {
        status: None,
        message: format!("{operation} failed: {error}"),
    }
}

pub(super) fn map_http_error(
    operation: &str,
    status: StatusCode,
    maybe_message: Option<String>,
    quota: Option<RateLimitInfo>,
) -> IntakeError {
    let message = maybe_message.unwrap_or_else(|| "unknown error".to_owned());

    if is_rate_limit_response(status, &message, quota.as_ref()) {
        let detail = match &quota {
            Some(info) => format!(
                "{operation} failed: {message} (resets at {reset}, in {wait}s)",
                reset = info.reset_at(),
                wait = info.seconds_until_reset()
            ),
            None => format!("{operation} failed: {message}"),
        };
        return IntakeError::RateLimitExceeded {
            rate_limit: quota,
            message: detail,
        };
    }

    if is_auth_failure(status) {
        return IntakeError::Authentication {
            message: format!("{operation} failed: GitHub returned {status} {message}"),
        };
    }

    if status == StatusCode::NOT_FOUND {
        return IntakeError::NotFound {
            message: format!("{operation}: {message}"),
        };
    }

    IntakeError::Api {
        status: Some(status.as_u16()),
        message: format!("{operation} failed with status {status}: {message}"),
    }
}

/// Maps a storage failure, keeping the transient classification.
pub(crate) fn map_persistence_error(operation: &str, error: &PersistenceError) -> IntakeError {
    match error {
        PersistenceError::MissingDatabaseUrl
        | PersistenceError::BlankDatabaseUrl
        | PersistenceError::SchemaNotInitialised => IntakeError::Configuration {
            message: format!("{operation}: {error}"),
        },
        _ => IntakeError::Persistence {
            message: format!("{operation}: {error}"),
            transient: error.is_transient(),
        },
    }
}
