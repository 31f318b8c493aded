//! Session persistence

use std::sync::Arc;

use tempfile::TempDir;

use yadevices::authn::session_mngr::{SessionManager, SessionManagerExt};
use yadevices::filesys::dir::Dir;
use yadevices::storage::session::{merge_cookies, SessionStore, PRIMARY_SESSION, QR_SESSION};

use crate::common::{cookies, Harness, MockTransport};

#[tokio::test]
async fn test_save_and_load_session() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(Dir::new(dir.path()));

    assert_eq!(store.load(PRIMARY_SESSION).await.unwrap(), None);
    assert!(store.load_cookies(QR_SESSION).await.unwrap().is_empty());

    let saved = cookies(&[("Session_id", "a"), ("yandexuid", "b")]);
    store.save(PRIMARY_SESSION, &saved).await.unwrap();

    let loaded = store.load(PRIMARY_SESSION).await.unwrap().unwrap();
    assert_eq!(loaded.cookies, saved);
    assert_eq!(loaded.csrf_token, None);

    // Sessions are independent
    assert!(store.load_cookies(QR_SESSION).await.unwrap().is_empty());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let meta = std::fs::metadata(store.file(PRIMARY_SESSION).path()).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }
}

#[tokio::test]
async fn test_delete_session() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(Dir::new(dir.path()));

    // Deleting nothing is fine
    tokio_test::assert_ok!(store.delete(PRIMARY_SESSION).await);

    store
        .save(PRIMARY_SESSION, &cookies(&[("Session_id", "a")]))
        .await
        .unwrap();
    store.delete(PRIMARY_SESSION).await.unwrap();
    assert_eq!(store.load(PRIMARY_SESSION).await.unwrap(), None);
}

#[test]
fn test_merge_cookies_later_wins() {
    let mut target = cookies(&[("a", "1"), ("b", "2")]);
    merge_cookies(&mut target, &cookies(&[("b", "3"), ("c", "4")]));
    assert_eq!(target, cookies(&[("a", "1"), ("b", "3"), ("c", "4")]));
}

#[tokio::test]
async fn test_manager_commit_and_discard() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SessionStore::new(Dir::new(dir.path())));
    let transport = Arc::new(MockTransport::default());

    let mngr = SessionManager::new(store.clone(), transport.clone(), "http://x/csrf".to_string())
        .await
        .unwrap();
    assert!(!mngr.has_cookies().await);

    mngr.set_csrf_token(Some("old".to_string())).await;
    mngr.commit(cookies(&[("Session_id", "new")])).await.unwrap();
    assert!(mngr.has_cookies().await);
    assert_eq!(mngr.cookies().await, cookies(&[("Session_id", "new")]));

    // A committed session starts without a token; the fetch fails here
    assert_eq!(mngr.csrf_token().await, None);
    assert_eq!(mngr.refresh_count(), 1);

    // A second manager sees the persisted session
    let reloaded = SessionManager::new(store.clone(), transport, "http://x/csrf".to_string())
        .await
        .unwrap();
    assert_eq!(reloaded.cookies().await, cookies(&[("Session_id", "new")]));

    mngr.discard().await.unwrap();
    assert!(!mngr.has_cookies().await);
    assert_eq!(store.load(PRIMARY_SESSION).await.unwrap(), None);
}

#[tokio::test]
async fn test_invalidate_only_drops_matching_token() {
    let h = Harness::new().await;
    let mngr = &h.state.session_mngr;

    mngr.set_csrf_token(Some("current".to_string())).await;
    mngr.invalidate_csrf_token("older").await;
    assert_eq!(mngr.csrf_token().await, Some("current".to_string()));

    mngr.invalidate_csrf_token("current").await;
    h.csrf_page("next");
    assert_eq!(mngr.csrf_token().await, Some("next".to_string()));
    assert_eq!(mngr.refresh_count(), 1);

    let sent = h.transport.requests_to(&http::Method::GET, &h.endpoints.csrf_page);
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].cookies.get("Session_id").map(String::as_str),
        Some("sess-1")
    );
    assert!(h.session_dir().file(PRIMARY_SESSION).exists().await);
}
