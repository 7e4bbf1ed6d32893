//! Application telemetry events and sinks.
//!
//! Telemetry is a side channel: sinks are best-effort and can never fail the
//! operation that emits an event. The binary either drops events or writes
//! them to stderr as JSON lines.

use std::io;

use serde::{Deserialize, Serialize};

/// Kind of record being ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Repository metadata.
    Repository,
    /// Issues.
    Issue,
    /// Pull requests.
    PullRequest,
    /// User profiles.
    User,
}

impl RecordKind {
    /// Snake-case label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Repository => "repository",
            Self::Issue => "issue",
            Self::PullRequest => "pull_request",
            Self::User => "user",
        }
    }
}

/// A structured telemetry event emitted by hubcrawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Records the current database schema version after migrations apply.
    SchemaVersionRecorded {
        /// Diesel migration version string (e.g. `20251214000000`).
        schema_version: String,
    },

    /// One GitHub API call completed, successfully or not.
    ApiRequest {
        /// Gateway operation name (e.g. `get_issues`).
        operation: String,
        /// Wall-clock duration of the HTTP call.
        latency_ms: u64,
    },

    /// One GitHub API call failed.
    ApiError {
        /// Gateway operation name.
        operation: String,
        /// Rendered error.
        message: String,
    },

    /// Records were fetched from GitHub.
    RecordsParsed {
        /// Kind of record.
        kind: RecordKind,
        /// Number of records fetched.
        count: u64,
    },

    /// Records were written to storage.
    RecordsSaved {
        /// Kind of record.
        kind: RecordKind,
        /// Number of records saved.
        count: u64,
    },

    /// A crawl job was accepted.
    JobSubmitted {
        /// Job identifier.
        job_id: String,
    },

    /// A crawl job reached a terminal state.
    JobFinished {
        /// Job identifier.
        job_id: String,
        /// `completed` or `failed`.
        status: String,
        /// Progress at the time the job finished.
        progress: u8,
        /// Pipeline step that was running when a failed job stopped.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        failed_step: Option<String>,
    },
}

/// A sink that can record telemetry events.
pub trait TelemetrySink: Send + Sync {
    /// Records a telemetry event.
    fn record(&self, event: TelemetryEvent);
}

/// Telemetry sink that drops all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Records telemetry events to stderr as JSON lines (JSONL).
///
/// This is intended for local debugging and is not transmitted anywhere.
#[derive(Debug, Default)]
pub struct StderrJsonlTelemetrySink;

impl TelemetrySink for StderrJsonlTelemetrySink {
    fn record(&self, event: TelemetryEvent) {
        let Ok(serialised) = serde_json::to_string(&event) else {
            return;
        };

        let _ignored = writeln_stderr(&serialised);
    }
}

fn writeln_stderr(message: &str) -> io::Result<()> {
    use io::Write;

    let mut stderr = io::stderr().lock();
    writeln!(stderr, "{message}")
}

/// In-memory sink for asserting on emitted events.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use std::sync::{Mutex, PoisonError};

    use super::{TelemetryEvent, TelemetrySink};

    /// Captures every recorded event.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        events: Mutex<Vec<TelemetryEvent>>,
    }

    impl RecordingSink {
        /// Drains the captured events in emission order.
        #[must_use]
        pub fn take(&self) -> Vec<TelemetryEvent> {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .drain(..)
                .collect()
        }
    }

    impl TelemetrySink for RecordingSink {
        fn record(&self, event: TelemetryEvent) {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::RecordingSink;
    use super::{RecordKind, TelemetryEvent, TelemetrySink};

    #[test]
    fn recording_sink_captures_events() {
        let sink = RecordingSink::default();
        sink.record(TelemetryEvent::SchemaVersionRecorded {
            schema_version: "20251214000000".to_owned(),
        });

        assert_eq!(
            sink.take(),
            vec![TelemetryEvent::SchemaVersionRecorded {
                schema_version: "20251214000000".to_owned(),
            }]
        );
        assert!(sink.take().is_empty());
    }

    #[test]
    fn events_serialise_with_snake_case_tags() {
        let event = TelemetryEvent::RecordsSaved {
            kind: RecordKind::PullRequest,
            count: 3,
        };

        let json = serde_json::to_value(&event).expect("event should serialise");

        assert_eq!(
            json,
            serde_json::json!({ "type": "records_saved", "kind": "pull_request", "count": 3 })
        );
    }
}
