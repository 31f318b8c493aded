//! Raw HTTP transport
//!
//! The cloud client never touches reqwest directly; it goes through
//! [`HttpTransport`] so the cloud can be scripted in tests. The production
//! transport follows redirects by hand so that cookies set on intermediate hops
//! (the passport login bounces through several) end up in the response.

use std::time::Duration;

use async_trait::async_trait;
use http::{header, Method, StatusCode};
use reqwest::{redirect, Client};
use tracing::debug;
use url::Url;

use crate::errors::BridgeError;
use crate::storage::session::CookieSet;

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// A single outgoing request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub cookies: CookieSet,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            cookies: CookieSet::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn cookies(mut self, cookies: CookieSet) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        self.body = RequestBody::Form(
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    /// Look up a header value (case-insensitive)
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response with its body already read
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,

    /// Cookies set by the server along the way (redirect hops included)
    pub cookies: CookieSet,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            cookies: CookieSet::new(),
        }
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }
}

/// Transport seam for testability
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a request; `Err` only for transport-level failures (DNS, TLS, timeout)
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BridgeError>;
}

/// reqwest-backed transport
pub struct ReqwestTransport {
    client: Client,
    max_redirects: usize,
}

impl ReqwestTransport {
    const DEFAULT_MAX_REDIRECTS: usize = 10;

    pub fn new(timeout: Duration) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            max_redirects: Self::DEFAULT_MAX_REDIRECTS,
        })
    }

    fn build(&self, request: &HttpRequest, cookies: &CookieSet) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if !cookies.is_empty() {
            builder = builder.header(header::COOKIE, cookie_header(cookies));
        }
        match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(fields) => builder.form(fields),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, BridgeError> {
        let mut sent_cookies = request.cookies.clone();
        let mut received = CookieSet::new();

        for _ in 0..=self.max_redirects {
            debug!("{} {}", request.method, request.url);
            let response = self.build(&request, &sent_cookies).send().await?;
            let status = response.status();

            for value in response.headers().get_all(header::SET_COOKIE) {
                if let Some((name, value)) = value.to_str().ok().and_then(parse_set_cookie) {
                    sent_cookies.insert(name.clone(), value.clone());
                    received.insert(name, value);
                }
            }

            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            match location {
                Some(location) if status.is_redirection() => {
                    let next = Url::parse(&request.url)?.join(&location)?;
                    if status == StatusCode::SEE_OTHER
                        || (request.method == Method::POST
                            && matches!(status, StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND))
                    {
                        request.method = Method::GET;
                        request.body = RequestBody::Empty;
                    }
                    request.url = next.to_string();
                }
                _ => {
                    let body = response.text().await?;
                    return Ok(HttpResponse {
                        status,
                        body,
                        cookies: received,
                    });
                }
            }
        }

        Err(BridgeError::TransportError(format!(
            "Too many redirects for {}",
            request.url
        )))
    }
}

/// Render a `Cookie` request header
pub fn cookie_header(cookies: &CookieSet) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Extract `name=value` from a `Set-Cookie` header, ignoring attributes
pub fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().trim_matches('"').to_string()))
}
