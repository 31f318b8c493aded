//! Outbound commands: device actions, station speech and link maintenance

pub mod device;
pub mod links;
pub mod tts;

use std::sync::Arc;

use crate::http::client::QuasarClient;
use crate::objects::ObjectGraph;
use crate::store::DataStore;

/// Sends commands to the cloud on behalf of the host
pub struct CommandSender {
    client: Arc<QuasarClient>,
    store: Arc<dyn DataStore>,
    graph: Arc<dyn ObjectGraph>,
    module_name: String,
}

impl CommandSender {
    pub fn new(
        client: Arc<QuasarClient>,
        store: Arc<dyn DataStore>,
        graph: Arc<dyn ObjectGraph>,
        module_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            store,
            graph,
            module_name: module_name.into(),
        }
    }
}
