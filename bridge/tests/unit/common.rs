//! Shared fixtures: a scripted transport, a settable clock and a wired bridge

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use http::{Method, StatusCode};
use serde_json::Value;
use tempfile::TempDir;

use yadevices::app::options::AppOptions;
use yadevices::app::state::AppState;
use yadevices::errors::BridgeError;
use yadevices::filesys::dir::Dir;
use yadevices::http::endpoints::CloudEndpoints;
use yadevices::http::transport::{HttpRequest, HttpResponse, HttpTransport};
use yadevices::objects::{MemoryObjectGraph, ObjectGraph};
use yadevices::storage::layout::StorageLayout;
use yadevices::storage::session::{CookieSet, SessionStore, PRIMARY_SESSION};
use yadevices::store::local::LocalStore;
use yadevices::utils::Clock;

pub const BASE: &str = "http://cloud.test";

/// Transport answering from per-route queues; the last queued response of a
/// route repeats
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
    delay: Mutex<Option<std::time::Duration>>,
}

impl MockTransport {
    pub fn on(&self, method: Method, url: &str, status: u16, body: Value) {
        let status = StatusCode::from_u16(status).unwrap();
        self.on_raw(method, url, HttpResponse::new(status, body.to_string()));
    }

    pub fn on_raw(&self, method: Method, url: &str, response: HttpResponse) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, url.to_string()))
            .or_default()
            .push_back(response);
    }

    /// Hold every response back for `delay`
    pub fn set_delay(&self, delay: std::time::Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &Method, url: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| &r.method == method && r.url == url)
            .collect()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BridgeError> {
        self.requests.lock().unwrap().push(request.clone());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut routes = self.routes.lock().unwrap();
        let queue = routes
            .get_mut(&(request.method.clone(), request.url.clone()))
            .filter(|q| !q.is_empty())
            .ok_or_else(|| {
                BridgeError::TransportError(format!("no route: {} {}", request.method, request.url))
            })?;
        if queue.len() > 1 {
            Ok(queue.pop_front().unwrap())
        } else {
            Ok(queue.front().cloned().unwrap())
        }
    }
}

/// Clock moved by hand
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self(Mutex::new(start))
    }

    pub fn advance(&self, secs: i64) {
        *self.0.lock().unwrap() += Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn cookies(pairs: &[(&str, &str)]) -> CookieSet {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A method invocation seen by [`RecordingGraph`]
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub path: String,
    pub params: Value,
    pub source: String,
}

/// In-memory graph that also journals every property write and method call
#[derive(Default)]
pub struct RecordingGraph {
    inner: MemoryObjectGraph,
    property_writes: Mutex<Vec<(String, Value)>>,
    method_calls: Mutex<Vec<MethodCall>>,
}

impl RecordingGraph {
    /// Property writes in the order they happened
    pub async fn property_writes(&self) -> Vec<(String, Value)> {
        self.property_writes.lock().unwrap().clone()
    }

    pub async fn method_calls(&self) -> Vec<MethodCall> {
        self.method_calls.lock().unwrap().clone()
    }

    pub async fn is_linked(&self, object: &str, property: &str) -> bool {
        self.inner.is_linked(object, property).await
    }
}

#[async_trait]
impl ObjectGraph for RecordingGraph {
    async fn get_property(&self, path: &str) -> Option<Value> {
        self.inner.get_property(path).await
    }

    async fn set_property(&self, path: &str, value: Value, source: &str) {
        self.property_writes
            .lock()
            .unwrap()
            .push((path.to_string(), value.clone()));
        self.inner.set_property(path, value, source).await;
    }

    async fn call_method(&self, path: &str, params: Value, source: &str) {
        self.method_calls.lock().unwrap().push(MethodCall {
            path: path.to_string(),
            params,
            source: source.to_string(),
        });
    }

    async fn set_link(&self, object: &str, property: &str, source: &str) {
        self.inner.set_link(object, property, source).await;
    }

    async fn remove_link(&self, object: &str, property: &str, source: &str) {
        self.inner.remove_link(object, property, source).await;
    }
}

/// A bridge wired to the mock cloud, an in-memory store and graph
pub struct Harness {
    pub dir: TempDir,
    pub transport: Arc<MockTransport>,
    pub store: Arc<LocalStore>,
    pub graph: Arc<RecordingGraph>,
    pub clock: Arc<ManualClock>,
    pub endpoints: CloudEndpoints,
    pub state: AppState,
}

impl Harness {
    /// Logged in with a stored primary session
    pub async fn new() -> Self {
        Self::build(Some(cookies(&[("Session_id", "sess-1")]))).await
    }

    /// No stored session
    pub async fn logged_out() -> Self {
        Self::build(None).await
    }

    async fn build(primary: Option<CookieSet>) -> Self {
        let dir = TempDir::new().unwrap();
        let layout = StorageLayout::new(dir.path());
        if let Some(primary) = primary {
            SessionStore::new(layout.cache_dir())
                .save(PRIMARY_SESSION, &primary)
                .await
                .unwrap();
        }

        let endpoints = CloudEndpoints::with_base(BASE);
        let options = AppOptions {
            layout,
            endpoints: endpoints.clone(),
            ..Default::default()
        };

        let transport = Arc::new(MockTransport::default());
        let store = Arc::new(LocalStore::in_memory());
        let graph = Arc::new(RecordingGraph::default());
        let clock = Arc::new(ManualClock::new(start_time()));

        let state = AppState::assemble(
            &options,
            transport.clone(),
            store.clone(),
            graph.clone(),
            clock.clone(),
        )
        .await
        .unwrap();

        Self {
            dir,
            transport,
            store,
            graph,
            clock,
            endpoints,
            state,
        }
    }

    /// Serve the CSRF page with `token`
    pub fn csrf_page(&self, token: &str) {
        let body = format!(r#"<script>var s = {{"csrfToken2":"{token}","uid":1}};</script>"#);
        self.transport.on_raw(
            Method::GET,
            &self.endpoints.csrf_page,
            HttpResponse::new(StatusCode::OK, body),
        );
    }

    pub fn session_dir(&self) -> Dir {
        StorageLayout::new(self.dir.path()).cache_dir()
    }
}
