//! Home-automation object graph seam
//!
//! Paths are `Object.property` or `Object.method`. The bridge only calls into the
//! graph; what a property write or method call means is up to the host.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

/// Object graph collaborator
#[async_trait]
pub trait ObjectGraph: Send + Sync {
    async fn get_property(&self, path: &str) -> Option<Value>;

    async fn set_property(&self, path: &str, value: Value, source: &str);

    async fn call_method(&self, path: &str, params: Value, source: &str);

    /// Subscribe `source` to changes of `object.property`
    async fn set_link(&self, object: &str, property: &str, source: &str);

    async fn remove_link(&self, object: &str, property: &str, source: &str);
}

#[derive(Debug, Default)]
struct GraphData {
    properties: BTreeMap<String, Value>,
    links: BTreeSet<(String, String, String)>,
}

/// In-memory object graph
///
/// Used when the bridge runs standalone; it holds the latest property values
/// and the links, and only logs method calls.
#[derive(Debug, Default)]
pub struct MemoryObjectGraph {
    data: RwLock<GraphData>,
}

impl MemoryObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_linked(&self, object: &str, property: &str) -> bool {
        self.data
            .read()
            .await
            .links
            .iter()
            .any(|(o, p, _)| o == object && p == property)
    }
}

#[async_trait]
impl ObjectGraph for MemoryObjectGraph {
    async fn get_property(&self, path: &str) -> Option<Value> {
        self.data.read().await.properties.get(path).cloned()
    }

    async fn set_property(&self, path: &str, value: Value, source: &str) {
        debug!("setProperty {} = {} ({})", path, value, source);
        self.data
            .write()
            .await
            .properties
            .insert(path.to_string(), value);
    }

    async fn call_method(&self, path: &str, params: Value, source: &str) {
        debug!("callMethod {} {} ({})", path, params, source);
    }

    async fn set_link(&self, object: &str, property: &str, source: &str) {
        self.data.write().await.links.insert((
            object.to_string(),
            property.to_string(),
            source.to_string(),
        ));
    }

    async fn remove_link(&self, object: &str, property: &str, source: &str) {
        self.data.write().await.links.remove(&(
            object.to_string(),
            property.to_string(),
            source.to_string(),
        ));
    }
}
