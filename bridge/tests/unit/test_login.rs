//! QR login flow

use http::{Method, StatusCode};
use serde_json::json;

use yadevices::authn::qr_login::{QrChallenge, QrLoginOutcome};
use yadevices::authn::session_mngr::SessionManagerExt;
use yadevices::http::transport::{HttpResponse, RequestBody};
use yadevices::storage::session::{PRIMARY_SESSION, QR_SESSION};

use crate::common::{cookies, Harness};

fn script_start(h: &Harness) {
    h.transport.on_raw(
        Method::GET,
        &h.endpoints.passport_am(),
        HttpResponse::new(
            StatusCode::OK,
            r#"<form><input type="hidden" name="csrf_token" value="ptok"/></form>"#,
        )
        .with_cookie("yandexuid", "u1"),
    );
    h.transport.on(
        Method::POST,
        &h.endpoints.passport_submit(),
        200,
        json!({"status": "ok", "track_id": "t1", "csrf_token": "ct1"}),
    );
}

async fn start(h: &Harness) -> QrChallenge {
    match h.state.login.start().await {
        QrLoginOutcome::AwaitingScan(challenge) => challenge,
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_start_returns_challenge() {
    let h = Harness::logged_out().await;
    script_start(&h);

    let challenge = start(&h).await;
    assert_eq!(challenge.track_id, "t1");
    assert_eq!(challenge.csrf_token, "ct1");
    assert_eq!(challenge.qr_url, h.endpoints.qr_code_url("t1"));

    let submit = h.transport.requests_to(&Method::POST, &h.endpoints.passport_submit());
    assert_eq!(submit.len(), 1);
    assert_eq!(submit[0].cookies, cookies(&[("yandexuid", "u1")]));
    match &submit[0].body {
        RequestBody::Form(fields) => {
            assert!(fields.contains(&("csrf_token".to_string(), "ptok".to_string())));
            assert!(fields.contains(&("with_code".to_string(), "1".to_string())));
        }
        other => panic!("expected a form body, got {other:?}"),
    }

    // The login runs in its own session
    let sessions = h.state.session_mngr.store();
    assert_eq!(
        sessions.load_cookies(QR_SESSION).await.unwrap(),
        cookies(&[("yandexuid", "u1")])
    );
    assert_eq!(sessions.load(PRIMARY_SESSION).await.unwrap(), None);
}

#[tokio::test]
async fn test_start_without_passport_token_fails() {
    let h = Harness::logged_out().await;
    h.transport.on_raw(
        Method::GET,
        &h.endpoints.passport_am(),
        HttpResponse::new(StatusCode::OK, "<html></html>"),
    );

    assert!(matches!(
        h.state.login.start().await,
        QrLoginOutcome::Failed(_)
    ));
    assert!(h
        .transport
        .requests_to(&Method::POST, &h.endpoints.passport_submit())
        .is_empty());
}

#[tokio::test]
async fn test_confirm_pending_keeps_challenge() {
    let h = Harness::logged_out().await;
    script_start(&h);
    let challenge = start(&h).await;

    h.transport.on(
        Method::POST,
        &h.endpoints.passport_magic_status(),
        200,
        json!({"status": "error", "errors": ["track.not_found"]}),
    );

    match h.state.login.confirm(&challenge).await {
        QrLoginOutcome::Pending { challenge: again, .. } => assert_eq!(again, challenge),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(!h.state.session_mngr.has_cookies().await);
}

#[tokio::test]
async fn test_confirm_commits_verified_session() {
    let h = Harness::logged_out().await;
    script_start(&h);
    let challenge = start(&h).await;

    h.transport.on_raw(
        Method::POST,
        &h.endpoints.passport_magic_status(),
        HttpResponse::new(StatusCode::OK, json!({"status": "ok"}).to_string())
            .with_cookie("Session_id", "fresh"),
    );
    h.transport.on(
        Method::GET,
        &h.endpoints.scenarios(),
        200,
        json!({"status": "ok", "scenarios": []}),
    );

    assert_eq!(h.state.login.confirm(&challenge).await, QrLoginOutcome::Authorized);

    let expected = cookies(&[("Session_id", "fresh"), ("yandexuid", "u1")]);
    assert_eq!(h.state.session_mngr.cookies().await, expected);
    assert_eq!(
        h.state.session_mngr.store().load_cookies(PRIMARY_SESSION).await.unwrap(),
        expected
    );

    let status = h
        .transport
        .requests_to(&Method::POST, &h.endpoints.passport_magic_status());
    match &status[0].body {
        RequestBody::Form(fields) => {
            assert!(fields.contains(&("track_id".to_string(), "t1".to_string())));
            assert!(fields.contains(&("csrf_token".to_string(), "ct1".to_string())));
        }
        other => panic!("expected a form body, got {other:?}"),
    }
}

#[tokio::test]
async fn test_already_passed_counts_as_confirmed() {
    let h = Harness::logged_out().await;
    script_start(&h);
    let challenge = start(&h).await;

    h.transport.on(
        Method::POST,
        &h.endpoints.passport_magic_status(),
        200,
        json!({"status": "error", "errors": ["account.auth_passed"]}),
    );
    h.transport.on(
        Method::GET,
        &h.endpoints.scenarios(),
        200,
        json!({"status": "ok", "scenarios": []}),
    );

    assert_eq!(h.state.login.confirm(&challenge).await, QrLoginOutcome::Authorized);
}

#[tokio::test]
async fn test_confirm_discards_rejected_session() {
    let h = Harness::logged_out().await;
    script_start(&h);
    let challenge = start(&h).await;

    h.transport.on(
        Method::POST,
        &h.endpoints.passport_magic_status(),
        200,
        json!({"status": "ok"}),
    );
    h.transport.on(Method::GET, &h.endpoints.scenarios(), 401, json!({}));

    assert_eq!(h.state.login.confirm(&challenge).await, QrLoginOutcome::Rejected);
    assert!(!h.state.session_mngr.has_cookies().await);
    assert_eq!(
        h.state.session_mngr.store().load(PRIMARY_SESSION).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_check_authorized_and_reset() {
    let h = Harness::new().await;
    h.transport.on(
        Method::GET,
        &h.endpoints.devices(),
        200,
        json!({"status": "ok", "rooms": []}),
    );
    assert!(h.state.login.check_authorized().await);

    tokio_test::assert_ok!(h.state.login.reset().await);
    assert!(!h.state.session_mngr.has_cookies().await);

    let logged_out = Harness::logged_out().await;
    logged_out
        .transport
        .on(Method::GET, &logged_out.endpoints.devices(), 401, json!({}));
    assert!(!logged_out.state.login.check_authorized().await);
}
