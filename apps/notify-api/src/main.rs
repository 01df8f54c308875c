use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notify_api::auth::jwks::JwksClient;
use notify_api::config::Config;
use notify_api::dispatch::store::{MemoryNotificationStore, NotificationStore};
use notify_api::kv::{KeyValueStore, MemoryStore, RedisStore};
use notify_api::AppState;
use signet_common::SnowflakeGenerator;

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing — env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    // Redis backs the registry across processes; the memory store only works
    // for a single instance.
    let kv: Arc<dyn KeyValueStore> = match &config.redis_url {
        Some(url) => Arc::new(
            RedisStore::connect(url)
                .await
                .expect("failed to connect to redis"),
        ),
        None => {
            tracing::warn!("REDIS_URL not set, using in-memory connection registry");
            Arc::new(MemoryStore::new())
        }
    };

    let snowflake = Arc::new(SnowflakeGenerator::new(config.worker_id));
    let store: Arc<dyn NotificationStore> = Arc::new(MemoryNotificationStore::new(snowflake));

    // JWKS client for validating issuer access tokens.
    let jwks = JwksClient::new(&config.issuer_url);

    tracing::info!(issuer = %config.issuer_url, "notify-api configured");

    let state = AppState::build(Arc::new(config), kv, store, jwks);
    let shutdown = state.shutdown.clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(notify_api::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "notify-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            // In-flight registry removals observe this and stop early.
            shutdown.cancel();
        })
        .await
        .expect("server error");
}
