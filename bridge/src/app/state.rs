//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::authn::qr_login::QrLogin;
use crate::authn::session_mngr::SessionManager;
use crate::commands::CommandSender;
use crate::errors::BridgeError;
use crate::http::client::QuasarClient;
use crate::http::transport::{HttpTransport, ReqwestTransport};
use crate::notify::Notifier;
use crate::objects::ObjectGraph;
use crate::storage::session::SessionStore;
use crate::store::local::LocalStore;
use crate::store::DataStore;
use crate::sync::device_state::DeviceStateSyncer;
use crate::sync::directory::DirectorySyncer;
use crate::sync::stations::StationSyncer;
use crate::utils::{Clock, SystemClock};

/// Main application state
pub struct AppState {
    /// Local records
    pub store: Arc<dyn DataStore>,

    /// Host object graph
    pub graph: Arc<dyn ObjectGraph>,

    /// Device update notifications
    pub notifier: Notifier,

    /// Primary session
    pub session_mngr: Arc<SessionManager>,

    /// Cloud API client
    pub client: Arc<QuasarClient>,

    /// QR login flow
    pub login: QrLogin,

    /// Device listing sync
    pub directory: DirectorySyncer,

    /// Station and scenario sync
    pub stations: StationSyncer,

    /// Device state sync
    pub device_state: Arc<DeviceStateSyncer>,

    /// Outbound commands
    pub commands: CommandSender,
}

impl AppState {
    /// Initialize application state against the real cloud
    pub async fn init(options: &AppOptions, graph: Arc<dyn ObjectGraph>) -> Result<Self, BridgeError> {
        info!("Initializing application state...");

        options.layout.setup().await?;
        let transport = Arc::new(ReqwestTransport::new(options.request_timeout)?);
        let store = Arc::new(LocalStore::open(options.layout.store_file()).await?);

        Self::assemble(options, transport, store, graph, Arc::new(SystemClock)).await
    }

    /// Wire the components over the given collaborators
    pub async fn assemble(
        options: &AppOptions,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn DataStore>,
        graph: Arc<dyn ObjectGraph>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BridgeError> {
        let sessions = Arc::new(SessionStore::new(options.layout.cache_dir()));
        let session_mngr = Arc::new(
            SessionManager::new(
                sessions,
                transport.clone(),
                options.endpoints.csrf_page.clone(),
            )
            .await?,
        );
        let client = Arc::new(QuasarClient::new(
            transport,
            session_mngr.clone(),
            options.endpoints.clone(),
        ));
        let notifier = Notifier::default();

        let device_state = Arc::new(DeviceStateSyncer::new(
            client.clone(),
            store.clone(),
            graph.clone(),
            notifier.clone(),
            clock.clone(),
            options.device_sync.clone(),
        ));

        Ok(Self {
            login: QrLogin::new(client.clone()),
            directory: DirectorySyncer::new(client.clone(), store.clone(), clock.clone()),
            stations: StationSyncer::new(client.clone(), store.clone(), clock),
            commands: CommandSender::new(
                client.clone(),
                store.clone(),
                graph.clone(),
                options.device_sync.module_name.clone(),
            ),
            device_state,
            store,
            graph,
            notifier,
            session_mngr,
            client,
        })
    }

    /// Shutdown application state
    pub async fn shutdown(&self) -> Result<(), BridgeError> {
        info!("Shutting down application state...");
        Ok(())
    }
}
