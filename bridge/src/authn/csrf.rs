//! CSRF token scraping

use std::sync::LazyLock;

use regex::Regex;
use tracing::{error, warn};

use crate::http::transport::{HttpRequest, HttpTransport};
use crate::storage::session::CookieSet;

/// API token on the IoT landing page
pub static IOT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""csrfToken2":"(.+?)""#).expect("valid token pattern"));

/// Token on the passport login form
pub static PASSPORT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""csrf_token" value="(.+?)""#).expect("valid token pattern"));

/// First capture of `pattern` in `body`
pub fn scrape_token(body: &str, pattern: &Regex) -> Option<String> {
    pattern
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Fetch a fresh API CSRF token using the given session cookies.
///
/// `None` is the normal outcome for an expired session and is not an error.
pub async fn fetch_csrf_token(
    transport: &dyn HttpTransport,
    page_url: &str,
    cookies: &CookieSet,
) -> Option<String> {
    let request = HttpRequest::get(page_url).cookies(cookies.clone());

    let response = match transport.send(request).await {
        Ok(response) => response,
        Err(e) => {
            error!("Request error while fetching CSRF token: {}", e);
            return None;
        }
    };

    let token = scrape_token(&response.body, &IOT_TOKEN);
    if token.is_none() {
        warn!("Failed to retrieve csrfToken2 (status {})", response.status);
    }
    token
}
