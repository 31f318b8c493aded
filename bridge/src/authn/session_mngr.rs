//! Session manager for cloud authentication

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::authn::csrf::fetch_csrf_token;
use crate::errors::BridgeError;
use crate::http::transport::HttpTransport;
use crate::storage::session::{CookieSet, Session, SessionStore, PRIMARY_SESSION};

/// Session manager trait for testability
#[async_trait]
pub trait SessionManagerExt: Send + Sync {
    /// Cookies of the primary session
    async fn cookies(&self) -> CookieSet;

    /// Cached CSRF token, fetched when absent
    async fn csrf_token(&self) -> Option<String>;

    /// Drop the cached token if it is still `stale`
    async fn invalidate_csrf_token(&self, stale: &str);
}

/// Session manager implementation
pub struct SessionManager {
    store: Arc<SessionStore>,
    transport: Arc<dyn HttpTransport>,
    csrf_page: String,
    cached: RwLock<Session>,
    refresh_lock: Mutex<()>,
    refresh_count: AtomicU64,
}

impl SessionManager {
    /// Create a new session manager, loading the primary session from storage
    pub async fn new(
        store: Arc<SessionStore>,
        transport: Arc<dyn HttpTransport>,
        csrf_page: String,
    ) -> Result<Self, BridgeError> {
        let session = store.load(PRIMARY_SESSION).await?.unwrap_or_else(|| {
            info!("No stored session, cloud calls will be unauthenticated until login");
            Session::default()
        });

        Ok(Self {
            store,
            transport,
            csrf_page,
            cached: RwLock::new(session),
            refresh_lock: Mutex::new(()),
            refresh_count: AtomicU64::new(0),
        })
    }

    /// The session store backing this manager
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Number of CSRF refreshes performed so far
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::SeqCst)
    }

    /// Whether a primary cookie set is loaded
    pub async fn has_cookies(&self) -> bool {
        !self.cached.read().await.cookies.is_empty()
    }

    /// Seed the cached CSRF token
    pub async fn set_csrf_token(&self, token: Option<String>) {
        self.cached.write().await.csrf_token = token;
    }

    /// Replace the primary session with a freshly authenticated cookie set
    pub async fn commit(&self, cookies: CookieSet) -> Result<(), BridgeError> {
        let _guard = self.refresh_lock.lock().await;
        self.store.save(PRIMARY_SESSION, &cookies).await?;
        *self.cached.write().await = Session::new(cookies);
        info!("Primary session updated");
        Ok(())
    }

    /// Remove the primary session from storage and memory
    pub async fn discard(&self) -> Result<(), BridgeError> {
        let _guard = self.refresh_lock.lock().await;
        self.store.delete(PRIMARY_SESSION).await?;
        *self.cached.write().await = Session::default();
        info!("Primary session discarded");
        Ok(())
    }

    async fn refresh_csrf_token(&self) -> Option<String> {
        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited
        let cookies = {
            let cached = self.cached.read().await;
            if let Some(token) = cached.csrf_token.as_ref() {
                return Some(token.clone());
            }
            cached.cookies.clone()
        };

        self.refresh_count.fetch_add(1, Ordering::SeqCst);
        debug!("Refreshing CSRF token...");

        let token = fetch_csrf_token(self.transport.as_ref(), &self.csrf_page, &cookies).await;
        match &token {
            Some(_) => self.cached.write().await.csrf_token = token.clone(),
            None => error!("Unable to refresh CSRF token, session may have expired"),
        }
        token
    }
}

#[async_trait]
impl SessionManagerExt for SessionManager {
    async fn cookies(&self) -> CookieSet {
        self.cached.read().await.cookies.clone()
    }

    async fn csrf_token(&self) -> Option<String> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.csrf_token.as_ref() {
                return Some(token.clone());
            }
        }
        self.refresh_csrf_token().await
    }

    async fn invalidate_csrf_token(&self, stale: &str) {
        let mut cached = self.cached.write().await;
        if cached.csrf_token.as_deref() == Some(stale) {
            debug!("Invalidating CSRF token");
            cached.csrf_token = None;
        }
    }
}
