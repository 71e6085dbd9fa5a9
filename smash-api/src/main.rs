use std::net::SocketAddr;
use std::sync::Arc;

use smash_api::{app, AppState};
use smash_store::{FsBlobStore, Registry, SecretBundle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smash_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = smash_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Smash API on port {}", config.server.port);

    // Storage key, fetched once and held read-only for the process lifetime
    let bundle = SecretBundle::load(&config.secret.bundle_path)
        .await
        .expect("Failed to load secret bundle");
    let key = bundle.storage_key().expect("Invalid storage key");

    let store = Arc::new(FsBlobStore::new(&config.storage.root));
    let registry = Arc::new(Registry::new(store, key));

    let app_state = AppState { registry };
    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
