//! HttpUpstream against a local mock server.

use std::time::Duration;
use upstream_relay::{
    BoundedExecutor, Failure, HttpUpstream, Relay, RelayConfig, RequestSpec, Upstream,
};

#[tokio::test]
async fn test_json_success_payload() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/revenue")
        .match_header("x-relay-request-id", mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"total": 48211, "currency": "EUR"}"#)
        .create_async()
        .await;

    let upstream = HttpUpstream::new().unwrap().with_base_url(&server.url()).unwrap();
    let exec = BoundedExecutor::new(upstream);
    let out = exec.execute(&RequestSpec::get("/api/revenue"), None).await.unwrap();

    assert_eq!(out["total"], 48211);
    assert_eq!(out["currency"], "EUR");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_non_json_body_is_returned_as_string() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/health")
        .with_status(200)
        .with_body("ok")
        .create_async()
        .await;

    let upstream = HttpUpstream::new().unwrap().with_base_url(&server.url()).unwrap();
    let out = BoundedExecutor::new(upstream)
        .execute(&RequestSpec::get("/health"), None)
        .await
        .unwrap();
    assert_eq!(out, serde_json::Value::String("ok".into()));
}

#[tokio::test]
async fn test_error_status_classified_with_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/orders")
        .with_status(503)
        .with_body("maintenance window")
        .create_async()
        .await;

    let upstream = HttpUpstream::new().unwrap().with_base_url(&server.url()).unwrap();
    let out = BoundedExecutor::new(upstream)
        .execute(&RequestSpec::get("/api/orders"), None)
        .await;
    assert_eq!(
        out,
        Err(Failure::UpstreamStatus {
            code: 503,
            body: Some("maintenance window".into())
        })
    );
}

#[tokio::test]
async fn test_post_sends_json_payload() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/reports")
        .match_body(mockito::Matcher::Json(serde_json::json!({"range": "7d"})))
        .with_status(201)
        .with_body(r#"{"id": 9}"#)
        .create_async()
        .await;

    let upstream = HttpUpstream::new().unwrap().with_base_url(&server.url()).unwrap();
    let out = upstream
        .call(
            &RequestSpec::post("/api/reports", serde_json::json!({"range": "7d"})),
            tokio_util::sync::CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(out["id"], 9);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_connection_refused_is_transport_failure() {
    // Bind then drop a listener to get a port with nothing behind it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let upstream = HttpUpstream::new().unwrap();
    let out = BoundedExecutor::new(upstream)
        .execute(&RequestSpec::get(format!("http://{addr}/api")), Some(Duration::from_secs(5)))
        .await;
    assert!(matches!(out, Err(Failure::Transport { .. })), "{out:?}");
}

#[tokio::test]
async fn test_relay_fetch_after_upstream_recovers() {
    let mut server = mockito::Server::new_async().await;
    let failing = server
        .mock("GET", "/api/kpis")
        .with_status(502)
        .expect(1)
        .create_async()
        .await;

    let upstream = HttpUpstream::new().unwrap().with_base_url(&server.url()).unwrap();
    let relay = Relay::builder(upstream)
        .with_config(
            RelayConfig::new()
                .with_max_attempts(3)
                .with_base_delay(Duration::from_millis(10))
                .with_timeout(Duration::from_secs(5)),
        )
        .build()
        .unwrap();

    // Replace the failing route once the first attempt has consumed it.
    let spec = RequestSpec::get("/api/kpis");
    let first = relay.executor().bounded().execute(&spec, None).await;
    assert_eq!(first.unwrap_err().status_code(), Some(502));
    failing.assert_async().await;
    failing.remove_async().await;

    let _ok = server
        .mock("GET", "/api/kpis")
        .with_status(200)
        .with_body(r#"{"nps": 41}"#)
        .create_async()
        .await;

    let value = relay.fetch("analyst", &spec).await.unwrap();
    assert_eq!(value["nps"], 41);
}
