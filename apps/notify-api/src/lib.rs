pub mod auth;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod hub;
pub mod kv;
pub mod registry;
pub mod routes;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use auth::jwks::JwksClient;
use config::Config;
use dispatch::dispatcher::NotificationDispatcher;
use dispatch::store::NotificationStore;
use hub::session::SessionManager;
use hub::transport::TransportHub;
use kv::KeyValueStore;
use registry::{ConnectionRegistry, PresenceDirectory};

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub kv: Arc<dyn KeyValueStore>,
    pub store: Arc<dyn NotificationStore>,
    pub jwks: JwksClient,
    pub config: Arc<Config>,
    pub hub: Arc<TransportHub>,
    pub registry: ConnectionRegistry,
    pub presence: PresenceDirectory,
    pub sessions: Arc<SessionManager>,
    pub dispatcher: Arc<NotificationDispatcher>,
    /// Cancelled on graceful shutdown; in-flight registry removals observe it.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire the state graph from its leaves. `kv` and `store` are injected so
    /// tests and single-process deployments can swap in the memory-backed
    /// implementations.
    pub fn build(
        config: Arc<Config>,
        kv: Arc<dyn KeyValueStore>,
        store: Arc<dyn NotificationStore>,
        jwks: JwksClient,
    ) -> Self {
        let hub = Arc::new(TransportHub::new());
        let registry = ConnectionRegistry::new(kv.clone());
        let presence = PresenceDirectory::new(registry.clone());
        let sessions = Arc::new(SessionManager::new(
            registry.clone(),
            hub.clone(),
            config.default_tenant.clone(),
        ));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            hub.clone(),
            presence.clone(),
            store.clone(),
            config.default_tenant.clone(),
        ));

        Self {
            kv,
            store,
            jwks,
            config,
            hub,
            registry,
            presence,
            sessions,
            dispatcher,
            shutdown: CancellationToken::new(),
        }
    }
}
