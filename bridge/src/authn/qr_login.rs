//! Interactive QR-code login
//!
//! ```text
//! start() ──> AwaitingScan(challenge)
//!                   │ confirm(challenge)
//!     ┌─────────────┼──────────────┬──────────────┐
//!     ▼             ▼              ▼              ▼
//! Authorized    Rejected        Pending        Failed
//! (committed)  (session       (same QR,      (no session
//!               deleted)       retry later)    touched)
//! ```
//!
//! The login runs in its own cookie session; only a confirmed scan whose cookies
//! pass a verification call replaces the primary session.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::authn::csrf::{scrape_token, PASSPORT_TOKEN};
use crate::errors::BridgeError;
use crate::http::client::{is_ok, QuasarClient};
use crate::http::transport::HttpRequest;
use crate::storage::session::{merge_cookies, CookieSet, QR_SESSION};

/// Passport error meaning the scan was already accepted
const AUTH_PASSED: &str = "account.auth_passed";

/// What the user needs to scan, and what the confirmation needs back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrChallenge {
    pub track_id: String,
    pub csrf_token: String,
    pub qr_url: String,
}

/// Result of a login step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrLoginOutcome {
    /// Show the QR code and call `confirm` once scanned
    AwaitingScan(QrChallenge),

    /// Not confirmed yet; the same challenge can be confirmed again
    Pending {
        challenge: QrChallenge,
        message: String,
    },

    /// Scan confirmed and the new session verified
    Authorized,

    /// Scan confirmed but the new session failed verification and was removed
    Rejected,

    /// Nothing usable came back; no session was changed
    Failed(String),
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    status: Option<String>,

    #[serde(default)]
    track_id: Option<String>,

    #[serde(default)]
    csrf_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MagicStatusResponse {
    #[serde(default)]
    status: Option<String>,

    #[serde(default)]
    errors: Vec<String>,
}

impl MagicStatusResponse {
    fn is_confirmed(&self) -> bool {
        self.status.as_deref() == Some("ok")
            || self.errors.first().map(String::as_str) == Some(AUTH_PASSED)
    }
}

/// Drives the QR login against the passport service
pub struct QrLogin {
    client: Arc<QuasarClient>,
}

impl QrLogin {
    pub fn new(client: Arc<QuasarClient>) -> Self {
        Self { client }
    }

    /// Begin a login: fetch a passport token and request a QR track
    pub async fn start(&self) -> QrLoginOutcome {
        let csrf_token = match self.passport_csrf_token().await {
            Ok(Some(token)) => token,
            Ok(None) => return QrLoginOutcome::Failed("Failed to get CSRF token".to_string()),
            Err(e) => {
                error!("Passport token request failed: {}", e);
                return QrLoginOutcome::Failed("Failed to get CSRF token".to_string());
            }
        };

        match self.submit(&csrf_token).await {
            Ok(Some(challenge)) => {
                info!("QR login started, track {}", challenge.track_id);
                QrLoginOutcome::AwaitingScan(challenge)
            }
            Ok(None) => QrLoginOutcome::Failed("Failed to get QR code".to_string()),
            Err(e) => {
                error!("QR code request failed: {}", e);
                QrLoginOutcome::Failed("Failed to get QR code".to_string())
            }
        }
    }

    /// Poll the scan status and, once confirmed, adopt and verify the new session
    pub async fn confirm(&self, challenge: &QrChallenge) -> QrLoginOutcome {
        let (status, cookies) = match self.magic_status(challenge).await {
            Ok(result) => result,
            Err(e) => {
                error!("QR status request failed: {}", e);
                return QrLoginOutcome::Failed("Authorization status unavailable".to_string());
            }
        };

        let Some(status) = status.filter(MagicStatusResponse::is_confirmed) else {
            return QrLoginOutcome::Pending {
                challenge: challenge.clone(),
                message: "Authorization not passed. Try again.".to_string(),
            };
        };
        info!("QR login confirmed (status {:?})", status.status);

        let session_mngr = self.client.session_mngr();
        if let Err(e) = session_mngr.commit(cookies).await {
            error!("Unable to store the new session: {}", e);
            return QrLoginOutcome::Failed("Unable to store the session".to_string());
        }

        let check = self.client.get(&self.client.endpoints().scenarios()).await;
        if is_ok(check.as_ref()) {
            info!("New session verified");
            return QrLoginOutcome::Authorized;
        }

        warn!("New session failed verification, discarding it");
        if let Err(e) = session_mngr.discard().await {
            error!("Unable to discard the rejected session: {}", e);
        }
        QrLoginOutcome::Rejected
    }

    /// Whether the stored session can read the device listing
    pub async fn check_authorized(&self) -> bool {
        matches!(
            self.client.get(&self.client.endpoints().devices()).await,
            Some(payload) if !payload.is_null()
        )
    }

    /// Forget the primary session
    pub async fn reset(&self) -> Result<(), BridgeError> {
        self.client.session_mngr().discard().await
    }

    async fn qr_cookies(&self) -> Result<CookieSet, BridgeError> {
        self.client
            .session_mngr()
            .store()
            .load_cookies(QR_SESSION)
            .await
    }

    async fn save_qr_cookies(&self, cookies: &CookieSet) -> Result<(), BridgeError> {
        self.client
            .session_mngr()
            .store()
            .save(QR_SESSION, cookies)
            .await
    }

    async fn passport_csrf_token(&self) -> Result<Option<String>, BridgeError> {
        let mut cookies = self.qr_cookies().await?;
        let request = HttpRequest::get(self.client.endpoints().passport_am()).cookies(cookies.clone());
        let response = self.client.transport().send(request).await?;

        merge_cookies(&mut cookies, &response.cookies);
        self.save_qr_cookies(&cookies).await?;

        let token = scrape_token(&response.body, &PASSPORT_TOKEN);
        if token.is_none() {
            error!("Failed to get passport CSRF token (status {})", response.status);
        }
        Ok(token)
    }

    async fn submit(&self, csrf_token: &str) -> Result<Option<QrChallenge>, BridgeError> {
        let endpoints = self.client.endpoints();
        let mut cookies = self.qr_cookies().await?;
        let retpath = endpoints.passport_profile();
        let request = HttpRequest::post(endpoints.passport_submit())
            .cookies(cookies.clone())
            .form(&[
                ("csrf_token", csrf_token),
                ("retpath", retpath.as_str()),
                ("with_code", "1"),
            ]);
        let response = self.client.transport().send(request).await?;

        merge_cookies(&mut cookies, &response.cookies);
        self.save_qr_cookies(&cookies).await?;

        let data: SubmitResponse = match serde_json::from_str(&response.body) {
            Ok(data) => data,
            Err(e) => {
                error!("Unreadable QR submit response ({}): {}", response.status, e);
                return Ok(None);
            }
        };

        match (data.status.as_deref(), data.track_id, data.csrf_token) {
            (Some("ok"), Some(track_id), Some(csrf_token)) => Ok(Some(QrChallenge {
                qr_url: endpoints.qr_code_url(&track_id),
                track_id,
                csrf_token,
            })),
            (status, _, _) => {
                error!("QR submit rejected with status {:?}", status);
                Ok(None)
            }
        }
    }

    /// Returns the decoded status (when readable) and the QR session cookies
    /// including anything the status call set
    async fn magic_status(
        &self,
        challenge: &QrChallenge,
    ) -> Result<(Option<MagicStatusResponse>, CookieSet), BridgeError> {
        let mut cookies = self.qr_cookies().await?;
        let request = HttpRequest::post(self.client.endpoints().passport_magic_status())
            .cookies(cookies.clone())
            .form(&[
                ("csrf_token", challenge.csrf_token.as_str()),
                ("track_id", challenge.track_id.as_str()),
            ]);
        let response = self.client.transport().send(request).await?;
        merge_cookies(&mut cookies, &response.cookies);

        let status = match serde_json::from_str::<Value>(&response.body) {
            Ok(value) if value.is_object() => serde_json::from_value(value).ok(),
            _ => {
                warn!("Unreadable QR status response ({})", response.status);
                None
            }
        };
        Ok((status, cookies))
    }
}
