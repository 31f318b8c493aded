//! Retry-once policy of the cloud client

use http::Method;
use serde_json::{json, Value};

use yadevices::authn::session_mngr::SessionManagerExt;

use crate::common::Harness;

#[tokio::test]
async fn test_post_retries_once_with_fresh_token_after_403() {
    let h = Harness::new().await;
    h.state.session_mngr.set_csrf_token(Some("stale".to_string())).await;
    h.csrf_page("fresh");

    let url = h.endpoints.scenario_actions("sc-1");
    h.transport.on(Method::POST, &url, 403, json!({"status": "error"}));
    h.transport.on(Method::POST, &url, 200, json!({"status": "ok"}));

    let result = h.state.client.trigger_scenario("sc-1").await;
    assert_eq!(result, Some(json!({"status": "ok"})));
    assert_eq!(h.state.session_mngr.refresh_count(), 1);

    let sent = h.transport.requests_to(&Method::POST, &url);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].header_value("x-csrf-token"), Some("stale"));
    assert_eq!(sent[1].header_value("x-csrf-token"), Some("fresh"));
    assert_eq!(sent[1].header_value("content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_second_failure_is_returned_without_third_attempt() {
    let h = Harness::new().await;
    h.state.session_mngr.set_csrf_token(Some("stale".to_string())).await;
    h.csrf_page("fresh");

    let url = h.endpoints.scenario_actions("sc-1");
    h.transport.on(Method::POST, &url, 403, json!({"status": "error", "n": 1}));
    h.transport.on(Method::POST, &url, 403, json!({"status": "error", "n": 2}));

    let result = h.state.client.trigger_scenario("sc-1").await;
    assert_eq!(result, Some(json!({"status": "error", "n": 2})));
    assert_eq!(h.transport.requests_to(&Method::POST, &url).len(), 2);
    assert_eq!(h.state.session_mngr.refresh_count(), 1);
}

#[tokio::test]
async fn test_bad_request_is_not_retried() {
    let h = Harness::new().await;
    h.state.session_mngr.set_csrf_token(Some("tok".to_string())).await;

    let url = h.endpoints.scenario_actions("sc-1");
    let body = json!({"status": "error", "code": "BAD_REQUEST"});
    h.transport.on(Method::POST, &url, 400, body.clone());

    let result = h.state.client.trigger_scenario("sc-1").await;
    assert_eq!(result, Some(body));
    assert_eq!(h.transport.requests_to(&Method::POST, &url).len(), 1);
    assert_eq!(h.state.session_mngr.refresh_count(), 0);
}

#[tokio::test]
async fn test_unauthorized_yields_none() {
    let h = Harness::new().await;
    let url = h.endpoints.devices();
    h.transport.on(Method::GET, &url, 401, json!({"status": "error"}));

    assert_eq!(h.state.client.get(&url).await, None);
    assert_eq!(h.transport.requests_to(&Method::GET, &url).len(), 1);
}

#[tokio::test]
async fn test_transport_failure_yields_none() {
    let h = Harness::new().await;
    assert_eq!(h.state.client.get(&h.endpoints.devices()).await, None);
}

#[tokio::test]
async fn test_get_with_unreadable_body_is_repeated_then_null() {
    let h = Harness::new().await;
    let url = h.endpoints.devices();
    h.transport.on_raw(
        Method::GET,
        &url,
        yadevices::http::transport::HttpResponse::new(http::StatusCode::OK, "<html>"),
    );

    assert_eq!(h.state.client.get(&url).await, Some(Value::Null));

    let sent = h.transport.requests_to(&Method::GET, &url);
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|r| r.header_value("x-csrf-token").is_none()));
    assert_eq!(sent[0].cookies.get("Session_id").map(String::as_str), Some("sess-1"));
}

#[tokio::test]
async fn test_concurrent_calls_share_one_refresh() {
    let h = Harness::new().await;
    h.csrf_page("shared");

    let first = h.endpoints.scenario_actions("a");
    let second = h.endpoints.scenario_actions("b");
    h.transport.on(Method::POST, &first, 200, json!({"status": "ok"}));
    h.transport.on(Method::POST, &second, 200, json!({"status": "ok"}));

    let (a, b) = tokio::join!(
        h.state.client.trigger_scenario("a"),
        h.state.client.trigger_scenario("b")
    );
    assert!(yadevices::http::client::is_ok(a.as_ref()));
    assert!(yadevices::http::client::is_ok(b.as_ref()));
    assert_eq!(h.state.session_mngr.refresh_count(), 1);
    assert_eq!(
        h.state.session_mngr.csrf_token().await,
        Some("shared".to_string())
    );
}

#[tokio::test]
async fn test_missing_token_sends_empty_header() {
    let h = Harness::new().await;
    h.transport.on_raw(
        Method::GET,
        &h.endpoints.csrf_page,
        yadevices::http::transport::HttpResponse::new(http::StatusCode::OK, "no token here"),
    );
    let url = h.endpoints.scenario_actions("sc-1");
    h.transport.on(Method::POST, &url, 200, json!({"status": "ok"}));

    let result = h.state.client.trigger_scenario("sc-1").await;
    assert_eq!(result, Some(json!({"status": "ok"})));
    let sent = h.transport.requests_to(&Method::POST, &url);
    assert_eq!(sent[0].header_value("x-csrf-token"), Some(""));
}
