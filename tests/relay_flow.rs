//! End-to-end flow through the relay facade: admission, then execution.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use upstream_relay::executor::InMemoryObserver;
use upstream_relay::{
    upstream_fn, BatchMode, CallError, Error, Relay, RelayConfig, RequestSpec, RetryCondition,
};

fn counting_relay(config: RelayConfig, calls: Arc<AtomicUsize>) -> Relay<impl upstream_relay::Upstream<Output = String>> {
    Relay::builder(upstream_fn(move |spec: RequestSpec, _cancel| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            if spec.target.contains("missing") {
                Err(CallError::Status { code: 404, body: None })
            } else {
                Ok(spec.target)
            }
        }
    }))
    .with_config(config)
    .build()
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_denied_batch_makes_no_attempts_and_recovers_next_window() {
    let calls = Arc::new(AtomicUsize::new(0));
    let relay = counting_relay(
        RelayConfig::new()
            .with_max_requests_per_window(1)
            .with_window(Duration::from_secs(60)),
        calls.clone(),
    );

    let specs = || vec![RequestSpec::get("/a"), RequestSpec::get("/b")];
    assert!(relay.fetch_batch("viewer", specs(), None).await.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let err = relay.fetch_batch("viewer", specs(), None).await.unwrap_err();
    assert!(err.is_denied());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    tokio::time::advance(Duration::from_secs(60)).await;
    let result = relay.fetch_batch("viewer", specs(), None).await.unwrap();
    assert!(result.all_succeeded());
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_skip_client_errors_condition_stops_after_first_404() {
    let calls = Arc::new(AtomicUsize::new(0));
    let relay = counting_relay(
        RelayConfig::new()
            .with_max_attempts(3)
            .with_base_delay(Duration::from_millis(10))
            .with_retry_condition(RetryCondition::SkipClientErrors),
        calls.clone(),
    );

    let err = relay.fetch("viewer", &RequestSpec::get("/missing")).await.unwrap_err();
    assert_eq!(err.failure().and_then(|f| f.status_code()), Some(404));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_default_condition_retries_404_until_exhausted() {
    let calls = Arc::new(AtomicUsize::new(0));
    let relay = counting_relay(
        RelayConfig::new()
            .with_max_attempts(3)
            .with_base_delay(Duration::from_millis(10)),
        calls.clone(),
    );

    let err = relay.fetch("viewer", &RequestSpec::get("/missing")).await.unwrap_err();
    assert!(matches!(err, Error::Upstream(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_observer_sees_every_attempt_of_a_batch() {
    let observer = InMemoryObserver::new();
    let relay = Relay::builder(upstream_fn(|spec: RequestSpec, _cancel| async move {
        if spec.target == "/bad" {
            Err(CallError::Transport("reset by peer".into()))
        } else {
            Ok(())
        }
    }))
    .with_config(
        RelayConfig::new()
            .with_max_attempts(2)
            .with_base_delay(Duration::from_millis(5))
            .with_batch_mode(BatchMode::Pooled),
    )
    .with_observer(Arc::new(observer.clone()))
    .build()
    .unwrap();

    let specs = vec![RequestSpec::get("/ok"), RequestSpec::get("/bad"), RequestSpec::get("/ok2")];
    let result = relay.fetch_batch("viewer", specs, Some(2)).await.unwrap();

    assert_eq!(result.failed_indices(), &[1]);
    assert_eq!(observer.len(), 4);
    let bad = observer.records_for("/bad");
    assert_eq!(bad.len(), 2);
    assert_eq!(bad[0].next_delay, Some(Duration::from_millis(5)));
    assert!(bad[1].is_terminal());
}
