//! Error types exposed by the GitHub ingestion layer.

use thiserror::Error;

use super::rate_limit::RateLimitInfo;

/// Errors surfaced while validating input, talking to GitHub, persisting
/// records, or tracking crawl jobs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntakeError {
    /// A required input was missing or blank.
    #[error("{field} is required")]
    MissingField {
        /// Name of the missing field as the caller knows it.
        field: &'static str,
    },

    /// An owner, repository or login contained characters that would change
    /// the request path.
    #[error("{field} must be a single path segment: {value:?}")]
    InvalidName {
        /// Name of the offending field.
        field: &'static str,
        /// Value as supplied.
        value: String,
    },

    /// The provided URL could not be parsed.
    #[error("URL is invalid: {0}")]
    InvalidUrl(String),

    /// The authentication token was missing.
    #[error("personal access token is required")]
    MissingToken,

    /// The authentication token was rejected by GitHub.
    #[error("GitHub rejected the token: {message}")]
    Authentication {
        /// GitHub error message returned with the 401/403 response.
        message: String,
    },

    /// The requested resource does not exist on GitHub.
    #[error("GitHub resource not found: {message}")]
    NotFound {
        /// Operation and GitHub message describing the missing resource.
        message: String,
    },

    /// GitHub returned a non-authentication API error.
    #[error("GitHub API error: {message}")]
    Api {
        /// HTTP status returned by GitHub, when one was received.
        status: Option<u16>,
        /// Response body from GitHub describing the failure.
        message: String,
    },

    /// Networking failed while calling GitHub.
    #[error("network error talking to GitHub: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// Rate limit exceeded - the API returned 403/429 with rate limit message.
    #[error("GitHub API rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Rate limit info if available from response headers.
        rate_limit: Option<RateLimitInfo>,
        /// Error message from GitHub.
        message: String,
    },

    /// Invalid pagination parameters.
    #[error("invalid pagination: {message}")]
    InvalidPagination {
        /// Description of the invalid parameter.
        message: String,
    },

    /// Reading or writing the record store failed.
    #[error("storage error: {message}")]
    Persistence {
        /// Error detail from the storage layer.
        message: String,
        /// Whether the storage layer reported a transient condition.
        transient: bool,
    },

    /// A retried operation kept failing with transient errors.
    #[error("operation failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The error returned by the final attempt.
        #[source]
        last: Box<IntakeError>,
    },

    /// The caller's cancellation signal fired while waiting.
    #[error("operation cancelled")]
    Cancelled,

    /// No crawl job exists with the given identifier.
    #[error("job not found: {job_id}")]
    JobNotFound {
        /// Identifier that was looked up.
        job_id: String,
    },

    /// A crawl job could not be registered.
    #[error("failed to start crawl job: {message}")]
    JobAllocation {
        /// Reason the job could not be created.
        message: String,
    },

    /// A crawl job finished in the failed state.
    #[error("crawl job {job_id} failed: {message}")]
    JobFailed {
        /// Identifier of the failed job.
        job_id: String,
        /// Error message recorded on the job.
        message: String,
    },

    /// Local I/O operation failed.
    #[error("I/O error: {message}")]
    Io {
        /// Error detail from the underlying I/O operation.
        message: String,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },
}

impl IntakeError {
    /// Rejects blank values for a required field.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingField`] when `value` is empty or only
    /// whitespace.
    pub fn require<'a>(field: &'static str, value: &'a str) -> Result<&'a str, Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Self::MissingField { field });
        }
        Ok(trimmed)
    }

    /// Like [`IntakeError::require`], but also rejects values that would
    /// escape their path segment.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingField`] when blank, or
    /// [`IntakeError::InvalidName`] when the trimmed value contains `/`, `?`,
    /// `#`, `%` or whitespace.
    pub fn require_segment<'a>(field: &'static str, value: &'a str) -> Result<&'a str, Self> {
        let trimmed = Self::require(field, value)?;
        if trimmed
            .chars()
            .any(|ch| matches!(ch, '/' | '?' | '#' | '%') || ch.is_whitespace())
        {
            return Err(Self::InvalidName {
                field,
                value: trimmed.to_owned(),
            });
        }
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::IntakeError;

    #[rstest]
    #[case::empty("")]
    #[case::whitespace("   ")]
    fn require_rejects_blank_values(#[case] value: &str) {
        assert_eq!(
            IntakeError::require("owner", value),
            Err(IntakeError::MissingField { field: "owner" })
        );
    }

    #[test]
    fn require_trims_present_values() {
        assert_eq!(IntakeError::require("login", " octocat "), Ok("octocat"));
    }

    #[test]
    fn retries_exhausted_mentions_last_error() {
        let error = IntakeError::RetriesExhausted {
            attempts: 3,
            last: Box::new(IntakeError::Network {
                message: "connection reset".to_owned(),
            }),
        };

        let message = error.to_string();
        assert!(message.contains("after 3 attempts"), "got {message}");
        assert!(message.contains("connection reset"), "got {message}");
    }
}
