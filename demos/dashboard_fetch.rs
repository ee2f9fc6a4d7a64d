//! Dashboard fan-out: load every widget of a dashboard through the relay.
//!
//! The upstream here is an in-process mock data source with variable latency,
//! one flaky widget and one that never answers in time.
//!
//! Run with: `RUST_LOG=upstream_relay=info cargo run --example dashboard_fetch`

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use upstream_relay::executor::TracingObserver;
use upstream_relay::{upstream_fn, CallError, Relay, RelayConfig, RequestSpec};

#[tokio::main]
async fn main() -> upstream_relay::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let flaky_calls = Arc::new(AtomicU32::new(0));
    let upstream = upstream_fn(move |spec: RequestSpec, _cancel| {
        let flaky_calls = flaky_calls.clone();
        async move {
            let latency = 10 + (spec.target.len() as u64 * 7) % 40;
            tokio::time::sleep(Duration::from_millis(latency)).await;
            match spec.target.as_str() {
                "/widgets/conversion" => {
                    // Fails once, then recovers.
                    if flaky_calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        return Err(CallError::Status {
                            code: 503,
                            body: Some("warming up".into()),
                        });
                    }
                    Ok(serde_json::json!({ "rate": 0.034 }))
                }
                "/widgets/forecast" => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(serde_json::json!({}))
                }
                other => Ok(serde_json::json!({ "widget": other, "points": [3, 1, 4, 1, 5] })),
            }
        }
    });

    let relay = Relay::builder(upstream)
        .with_config(
            RelayConfig::new()
                .with_timeout(Duration::from_millis(200))
                .with_base_delay(Duration::from_millis(50))
                .with_max_attempts(3)
                .with_concurrency(3),
        )
        .with_observer(Arc::new(TracingObserver))
        .build()?;

    let widgets = [
        "/widgets/revenue",
        "/widgets/active-users",
        "/widgets/conversion",
        "/widgets/forecast",
        "/widgets/churn",
        "/widgets/latency",
        "/widgets/errors",
    ];
    let specs = widgets.iter().map(|w| RequestSpec::get(*w)).collect();

    let result = relay.fetch_batch("dashboard-session-1", specs, None).await?;

    for (widget, item) in widgets.iter().zip(result.iter()) {
        match item {
            Ok(value) => println!("{widget:<24} ok    {value}"),
            Err(failure) => println!("{widget:<24} {:<5} {failure}", failure.kind()),
        }
    }
    println!(
        "\n{}/{} widgets loaded in {:?} ({:?} rounds), failed indices: {:?}",
        result.success_count(),
        result.len(),
        result.execution_time(),
        result.rounds().unwrap_or_default(),
        result.failed_indices()
    );

    let snapshot = relay.admission_snapshot("dashboard-session-1");
    println!(
        "admission: {}/{} left, window resets in {:?}",
        snapshot.remaining, snapshot.limit, snapshot.reset_after
    );
    Ok(())
}
