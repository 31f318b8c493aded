//! Authenticated cloud API client
//!
//! Every call carries the primary session cookies; mutating calls also carry the
//! CSRF token. Failures never surface as errors: a transport failure or a 401
//! yields `None`, an undecodable body yields `Some(Value::Null)`. A call that
//! looks like an expired token (403, `status: error`, or an unreadable body) is
//! repeated once with a freshly scraped token, unless the cloud called it a bad
//! request.

use std::sync::Arc;

use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::authn::session_mngr::{SessionManager, SessionManagerExt};
use crate::http::endpoints::CloudEndpoints;
use crate::http::transport::{HttpRequest, HttpTransport};

/// First attempt plus one retry
const MAX_ATTEMPTS: usize = 2;

/// Cloud API client
pub struct QuasarClient {
    transport: Arc<dyn HttpTransport>,
    session_mngr: Arc<SessionManager>,
    endpoints: CloudEndpoints,
}

impl QuasarClient {
    /// Create a new API client
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session_mngr: Arc<SessionManager>,
        endpoints: CloudEndpoints,
    ) -> Self {
        Self {
            transport,
            session_mngr,
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &CloudEndpoints {
        &self.endpoints
    }

    pub fn session_mngr(&self) -> &Arc<SessionManager> {
        &self.session_mngr
    }

    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    /// GET and return the raw payload
    pub async fn get(&self, url: &str) -> Option<Value> {
        self.request(Method::GET, url, None).await
    }

    /// GET and decode into `T`; `None` when absent or shaped differently
    pub async fn get_as<T: DeserializeOwned>(&self, url: &str) -> Option<T> {
        let payload = self.get(url).await?;
        decode_payload(url, payload)
    }

    /// Issue a request with the retry-once policy
    pub async fn request(&self, method: Method, url: &str, body: Option<&Value>) -> Option<Value> {
        for attempt in 0..MAX_ATTEMPTS {
            let mut request = HttpRequest::new(method.clone(), url)
                .cookies(self.session_mngr.cookies().await);

            let csrf_token = if method != Method::GET {
                let token = self.session_mngr.csrf_token().await;
                if token.is_none() {
                    warn!("Sending {} {} without a CSRF token", method, url);
                }
                request = request
                    .header("Content-Type", "application/json")
                    .header("x-csrf-token", token.as_deref().unwrap_or_default())
                    .json(body.cloned().unwrap_or_else(|| Value::Object(Default::default())));
                token
            } else {
                None
            };

            let response = match self.transport.send(request).await {
                Ok(response) => response,
                Err(e) => {
                    error!("Request error: {} {}: {}", method, url, e);
                    return None;
                }
            };

            if response.status == StatusCode::UNAUTHORIZED {
                error!("Unauthorized access: {} {}", method, url);
                return None;
            }

            let payload = serde_json::from_str::<Value>(&response.body).unwrap_or_else(|e| {
                debug!("Non-JSON response from {} ({}): {}", url, response.status, e);
                Value::Null
            });

            let is_last_attempt = attempt + 1 == MAX_ATTEMPTS;
            if is_last_attempt || !should_retry(response.status, &payload) {
                return Some(payload);
            }

            debug!("REPEATING: {} {} (status {})", method, url, response.status);
            if let Some(token) = csrf_token {
                self.session_mngr.invalidate_csrf_token(&token).await;
            }
        }

        None
    }
}

/// Whether a first-attempt response looks like an expired session
pub fn should_retry(status: StatusCode, payload: &Value) -> bool {
    if payload.get("code").and_then(Value::as_str) == Some("BAD_REQUEST") {
        return false;
    }
    payload.is_null()
        || status == StatusCode::FORBIDDEN
        || payload.get("status").and_then(Value::as_str) == Some("error")
}

/// Whether a payload reports `status: ok`
pub fn is_ok(payload: Option<&Value>) -> bool {
    payload
        .and_then(|p| p.get("status"))
        .and_then(Value::as_str)
        == Some("ok")
}

/// Decode a payload into a response struct, logging shape mismatches
pub fn decode_payload<T: DeserializeOwned>(url: &str, payload: Value) -> Option<T> {
    if !payload.is_object() {
        debug!("Response from {} is not an object", url);
        return None;
    }
    match serde_json::from_value(payload) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Unexpected response shape from {}: {}", url, e);
            None
        }
    }
}
