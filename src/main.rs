use std::sync::Arc;

use dotenv::dotenv;
use phone_tracker::{create_router, AppConfig, AppState, MemoryStore, PgStore, SharedStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,phone_tracker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        bind = %config.bind_addr(),
        database_url_set = config.database_url.is_some(),
        database_name = config.database_name.as_deref().unwrap_or("-"),
        max_connections = config.max_connections,
        "Starting phone tracker"
    );

    let pg = connect_store(&config).await;
    let store: Option<SharedStore> = if config.memory_store {
        tracing::warn!("Serving from the in-memory store; records are lost on exit");
        Some(Arc::new(MemoryStore::new()))
    } else {
        pg.clone().map(|pg| Arc::new(pg) as SharedStore)
    };

    let app = create_router(AppState {
        store,
        database_url_set: config.database_url.is_some(),
        database_name_set: config.database_name.is_some(),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("Server running at http://{}", config.bind_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pg) = pg {
        pg.close().await;
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Connects to Postgres when configured. Failure is logged and leaves the
/// service running without a store.
async fn connect_store(config: &AppConfig) -> Option<PgStore> {
    if config.memory_store {
        return None;
    }
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set; data routes will report the store as unavailable");
        return None;
    };

    match PgStore::connect(url, config.database_name.as_deref(), config.max_connections).await {
        Ok(store) => {
            tracing::info!("Connected to database");
            Some(store)
        }
        Err(err) => {
            tracing::error!(error = %err, "Database connection failed; continuing without a store");
            None
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        _ = terminate => tracing::info!("Received terminate signal"),
    }
}
