//! SmartLib Server - library portal backend
//!
//! Serves the REST API over live mirrors of the library collections.

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use smartlib_server::{
    api,
    config::{AppConfig, LoggingConfig, StoreBackend},
    repository::Repository,
    services::{auth::hash_password, email::notifier_from_config, library_store::LibraryStore, Services},
    store::{CollectionStore, MemoryStore, PgStore},
    AppState,
};

fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("smartlib_server={},tower_http=debug", config.level).into());

    let json = config.format == "json";
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json());
    let pretty_layer = (!json).then(|| tracing_subscriber::fmt::layer());

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(pretty_layer)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `smartlib-server hash-password <password>` prints a value for auth.admin_password_hash
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some("hash-password") {
        let password = args.get(2).context("usage: smartlib-server hash-password <password>")?;
        println!("{}", hash_password(password)?);
        return Ok(());
    }

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    tracing::info!("Starting SmartLib Server v{}", env!("CARGO_PKG_VERSION"));

    let backend: Arc<dyn CollectionStore> = match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Postgres => {
            let store = PgStore::connect(&config.store)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");

            if config.store.run_migrations {
                store.migrate().await.context("Failed to run migrations")?;
                tracing::info!("Database migrations completed");
            }
            Arc::new(store)
        }
    };

    // Open the live mirrors before serving anything that reads them
    let library = Arc::new(LibraryStore::new(backend.clone()));
    library.init(None);
    library.ready().await;
    if library.has_errors() {
        tracing::warn!("Some collections failed to load; serving partial data");
    }

    let services = Services::new(
        Repository::new(backend),
        library.clone(),
        notifier_from_config(&config.email),
        &config,
    );

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };
    let app = api::router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    library.destroy();
    tracing::info!("Server stopped");
    Ok(())
}
