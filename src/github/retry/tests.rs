//! Tests for the retry policy and error classification.

use std::sync::Mutex;
use std::time::Duration;

use rstest::rstest;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use super::{RetryPolicy, is_retryable};
use crate::github::error::IntakeError;

fn transient() -> IntakeError {
    IntakeError::Api {
        status: Some(503),
        message: "service unavailable".to_owned(),
    }
}

/// Records the instant of every invocation and replays scripted outcomes.
#[derive(Default)]
struct ScriptedOperation {
    failures_before_success: usize,
    failure: Option<IntakeError>,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedOperation {
    fn failing(times: usize, failure: IntakeError) -> Self {
        Self {
            failures_before_success: times,
            failure: Some(failure),
            calls: Mutex::default(),
        }
    }

    async fn invoke(&self) -> Result<&'static str, IntakeError> {
        let call_index = {
            let mut calls = self.calls.lock().expect("calls mutex should be available");
            calls.push(Instant::now());
            calls.len()
        };

        match &self.failure {
            Some(error) if call_index <= self.failures_before_success => Err(error.clone()),
            _ => Ok("done"),
        }
    }

    fn gaps(&self) -> Vec<Duration> {
        let calls = self.calls.lock().expect("calls mutex should be available");
        calls
            .windows(2)
            .filter_map(|pair| match pair {
                [earlier, later] => Some(later.duration_since(*earlier)),
                _ => None,
            })
            .collect()
    }

    fn call_count(&self) -> usize {
        self.calls
            .lock()
            .expect("calls mutex should be available")
            .len()
    }
}

#[rstest]
#[case::no_failures(0)]
#[case::one_failure(1)]
#[case::three_failures(3)]
#[tokio::test(start_paused = true)]
async fn transient_failures_then_success_take_n_plus_one_attempts(#[case] failures: usize) {
    let policy = RetryPolicy::new(5, Duration::from_millis(100));
    let operation = ScriptedOperation::failing(failures, transient());

    let result = policy
        .run(&CancellationToken::new(), || operation.invoke())
        .await;

    assert_eq!(result, Ok("done"));
    assert_eq!(operation.call_count(), failures + 1);
}

#[tokio::test(start_paused = true)]
async fn backoff_doubles_from_initial_value() {
    let policy = RetryPolicy::new(5, Duration::from_millis(100));
    let operation = ScriptedOperation::failing(3, transient());

    policy
        .run(&CancellationToken::new(), || operation.invoke())
        .await
        .expect("fourth attempt should succeed");

    assert_eq!(
        operation.gaps(),
        vec![
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(400),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn non_retryable_error_is_returned_after_one_attempt() {
    let policy = RetryPolicy::new(5, Duration::from_millis(100));
    let not_found = IntakeError::NotFound {
        message: "repository missing".to_owned(),
    };
    let operation = ScriptedOperation::failing(10, not_found.clone());

    let result = policy
        .run(&CancellationToken::new(), || operation.invoke())
        .await;

    assert_eq!(result, Err(not_found));
    assert_eq!(operation.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_attempts_wrap_last_error() {
    let policy = RetryPolicy::new(3, Duration::from_millis(10));
    let operation = ScriptedOperation::failing(10, transient());

    let result = policy
        .run(&CancellationToken::new(), || operation.invoke())
        .await;

    assert_eq!(
        result,
        Err(IntakeError::RetriesExhausted {
            attempts: 3,
            last: Box::new(transient()),
        })
    );
    assert_eq!(operation.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_backoff_wait() {
    let policy = RetryPolicy::new(5, Duration::from_secs(60));
    let operation = ScriptedOperation::failing(10, transient());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let result = policy.run(&cancel, || operation.invoke()).await;

    assert_eq!(result, Err(IntakeError::Cancelled));
    assert_eq!(operation.call_count(), 1);
}

#[test]
fn zero_attempts_still_runs_once() {
    assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
}

#[rstest]
#[case::network(IntakeError::Network { message: "timed out".to_owned() }, true)]
#[case::bad_gateway(IntakeError::Api { status: Some(502), message: String::new() }, true)]
#[case::server_error(IntakeError::Api { status: Some(500), message: String::new() }, true)]
#[case::transient_storage(
    IntakeError::Persistence { message: "database is locked".to_owned(), transient: true },
    true
)]
#[case::client_error(IntakeError::Api { status: Some(422), message: String::new() }, false)]
#[case::statusless_api(IntakeError::Api { status: None, message: String::new() }, false)]
#[case::permanent_storage(
    IntakeError::Persistence { message: "constraint failed".to_owned(), transient: false },
    false
)]
#[case::not_found(IntakeError::NotFound { message: String::new() }, false)]
#[case::validation(IntakeError::MissingField { field: "owner" }, false)]
#[case::authentication(IntakeError::Authentication { message: String::new() }, false)]
#[case::cancelled(IntakeError::Cancelled, false)]
fn classifies_errors(#[case] error: IntakeError, #[case] expected: bool) {
    assert_eq!(is_retryable(&error), expected);
}
