//! Persisted cookie sessions
//!
//! Every logical session is one flat JSON object of cookie name to value, stored in
//! the module cache directory under the session name. The store does not track
//! expiry; a stale session shows up as 403s or a missing CSRF token upstream.

use std::collections::BTreeMap;

use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::BridgeError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Session used for regular API calls
pub const PRIMARY_SESSION: &str = "cookie";

/// Scratch session used while an interactive QR login is in progress
pub const QR_SESSION: &str = "cookie_qr";

/// Cookie name to value
pub type CookieSet = BTreeMap<String, String>;

/// An authenticated identity with the cloud service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub cookies: CookieSet,

    /// Short-lived anti-forgery token, never persisted
    pub csrf_token: Option<String>,
}

impl Session {
    pub fn new(cookies: CookieSet) -> Self {
        Self {
            cookies,
            csrf_token: None,
        }
    }
}

/// File-backed session store
pub struct SessionStore {
    dir: Dir,
    write_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(dir: Dir) -> Self {
        Self {
            dir,
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the cookie file for a session name
    pub fn file(&self, name: &str) -> File {
        self.dir.file(name)
    }

    /// Load a session, `None` when nothing was stored under that name
    pub async fn load(&self, name: &str) -> Result<Option<Session>, BridgeError> {
        let cookies = self.file(name).read_json_opt::<CookieSet>().await?;
        Ok(cookies.map(Session::new))
    }

    /// Load the cookie set, empty when nothing was stored
    pub async fn load_cookies(&self, name: &str) -> Result<CookieSet, BridgeError> {
        Ok(self
            .load(name)
            .await?
            .map(|session| session.cookies)
            .unwrap_or_default())
    }

    /// Persist a cookie set under a session name
    pub async fn save(&self, name: &str, cookies: &CookieSet) -> Result<(), BridgeError> {
        let _guard = self.write_lock.lock().await;
        let file = self.file(name);
        file.write_json(cookies).await?;
        file.set_permissions_600().await?;
        debug!("Saved {} cookies to session '{}'", cookies.len(), name);
        Ok(())
    }

    /// Remove a stored session
    pub async fn delete(&self, name: &str) -> Result<(), BridgeError> {
        let _guard = self.write_lock.lock().await;
        self.file(name).delete().await?;
        debug!("Deleted session '{}'", name);
        Ok(())
    }
}

/// Merge `Set-Cookie` values into a cookie set, later values win
pub fn merge_cookies(target: &mut CookieSet, updates: &CookieSet) {
    for (name, value) in updates {
        target.insert(name.clone(), value.clone());
    }
}
