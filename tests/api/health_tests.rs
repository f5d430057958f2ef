//! Health and metrics endpoints
//!
//! These probes need no database, so they run against the stateless router.

use axum_test::TestServer;
use serde_json::Value;

use crm_server::presentation::http::routes::probe_routes;

fn server() -> TestServer {
    TestServer::new(probe_routes::<()>()).unwrap()
}

#[tokio::test]
async fn health_reports_version() {
    let response = server().get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn liveness_is_always_ok() {
    let response = server().get("/health/live").await;
    response.assert_status_ok();
    response.assert_json(&serde_json::json!({ "status": "alive" }));
}

#[tokio::test]
async fn metrics_are_prometheus_text() {
    crm_server::infrastructure::metrics::set_sockets_connected(2);

    let response = server().get("/metrics").await;
    response.assert_status_ok();
    let text = response.text();
    assert!(text.contains("crm_sockets_connected"));
}
