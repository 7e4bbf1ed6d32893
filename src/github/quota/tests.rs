//! Tests for the shared quota limiter.

use std::sync::Arc;
use std::time::Duration;

use rstest::{fixture, rstest};
use tokio::time::{Instant, sleep, timeout};
use tokio_util::sync::CancellationToken;

use super::{QuotaLimiter, QuotaSettings};
use crate::github::error::IntakeError;
use crate::github::rate_limit::{RateLimitInfo, unix_now};

const WINDOW: Duration = Duration::from_secs(3600);

fn limiter_with(max_requests: u32) -> QuotaLimiter {
    QuotaLimiter::new(QuotaSettings {
        max_requests,
        window: WINDOW,
    })
}

#[fixture]
fn cancel() -> CancellationToken {
    CancellationToken::new()
}

async fn exhaust(limiter: &QuotaLimiter, cancel: &CancellationToken) {
    for _ in 0..limiter.settings().max_requests {
        limiter
            .acquire(cancel)
            .await
            .expect("acquire within quota should succeed");
    }
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn acquire_grants_maximum_requests_without_waiting(cancel: CancellationToken) {
    let limiter = limiter_with(3);
    let started = Instant::now();

    exhaust(&limiter, &cancel).await;

    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(limiter.remaining(), 0);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn acquire_blocks_when_window_is_full(cancel: CancellationToken) {
    let limiter = limiter_with(2);
    exhaust(&limiter, &cancel).await;

    let outcome = timeout(WINDOW - Duration::from_secs(1), limiter.acquire(&cancel)).await;

    assert!(outcome.is_err(), "acquire should still be waiting");
    assert_eq!(limiter.remaining(), 0);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn acquire_proceeds_after_window_rolls_over(cancel: CancellationToken) {
    let limiter = limiter_with(2);
    exhaust(&limiter, &cancel).await;
    let started = Instant::now();

    limiter
        .acquire(&cancel)
        .await
        .expect("acquire should succeed once the window resets");

    assert!(started.elapsed() >= WINDOW, "waited {:?}", started.elapsed());
    assert_eq!(limiter.remaining(), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn acquire_returns_cancelled_without_claiming_a_slot(cancel: CancellationToken) {
    let limiter = limiter_with(1);
    exhaust(&limiter, &cancel).await;

    let trigger = cancel.clone();
    tokio::spawn(async move {
        sleep(Duration::from_secs(10)).await;
        trigger.cancel();
    });

    let result = limiter.acquire(&cancel).await;

    assert_eq!(result, Err(IntakeError::Cancelled));
    assert_eq!(limiter.remaining(), 0);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn acquire_fails_fast_when_already_cancelled(cancel: CancellationToken) {
    let limiter = limiter_with(10);
    cancel.cancel();

    assert_eq!(limiter.acquire(&cancel).await, Err(IntakeError::Cancelled));
    assert_eq!(limiter.remaining(), 10);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn exhausted_quota_hint_does_not_reset_window(cancel: CancellationToken) {
    let limiter = limiter_with(5);
    exhaust(&limiter, &cancel).await;

    limiter.apply_quota_hint(&RateLimitInfo::new(5000, 0, unix_now() + 3600));

    assert_eq!(limiter.remaining(), 0);
}

#[rstest]
#[case::few_left(3)]
#[case::one_left(1)]
#[case::full_window(10)]
#[tokio::test(start_paused = true)]
async fn quota_hint_sets_remaining_capacity(#[case] remaining: u32, cancel: CancellationToken) {
    let limiter = limiter_with(10);
    limiter
        .acquire(&cancel)
        .await
        .expect("first acquire should succeed");

    limiter.apply_quota_hint(&RateLimitInfo::new(10, remaining, unix_now() + 3600));

    assert_eq!(limiter.remaining(), remaining);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn quota_hint_larger_than_local_maximum_clears_counter(cancel: CancellationToken) {
    let limiter = limiter_with(10);
    exhaust(&limiter, &cancel).await;

    limiter.apply_quota_hint(&RateLimitInfo::new(5000, 4000, unix_now() + 3600));

    assert_eq!(limiter.remaining(), 10);
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_never_exceed_maximum_per_window() {
    let limiter = Arc::new(limiter_with(5));
    let cancel = CancellationToken::new();

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let task_limiter = Arc::clone(&limiter);
            let task_cancel = cancel.clone();
            tokio::spawn(async move {
                timeout(Duration::from_secs(60), task_limiter.acquire(&task_cancel)).await
            })
        })
        .collect();

    let mut granted = 0;
    for handle in handles {
        if let Ok(Ok(())) = handle.await.expect("task should not panic") {
            granted += 1;
        }
    }

    assert_eq!(granted, 5);
    assert_eq!(limiter.remaining(), 0);
}
