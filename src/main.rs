use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use shoppingcart as api;
use shoppingcart::{
    auth::DirectoryAuthenticator,
    config::{AppConfig, StoreBackend},
    db::DbConfig,
    metrics::HttpMetrics,
    repositories::{CartRepository, CartStore, InMemoryCartStore},
    services::CartService,
    AppState,
};

/// Shopping cart HTTP service
#[derive(Debug, Parser)]
#[command(name = "shoppingcart", version, about)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:3000; overrides host and port
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = api::config::load_config()?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    let store = build_store(&cfg).await?;
    let carts = Arc::new(CartService::new(store));
    let metrics = Arc::new(
        HttpMetrics::new(&cfg.metrics_namespace).context("failed to register metrics")?,
    );

    let state = AppState::new(carts, Arc::new(DirectoryAuthenticator::default()), metrics)
        .with_duplicate_item_policy(cfg.cart.duplicate_item_policy);
    let app = api::app_router(state);

    let addr = args.bind.unwrap_or_else(|| cfg.bind_address());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(
        environment = %cfg.environment,
        store = ?cfg.store_backend,
        "shoppingcart listening on http://{}",
        addr
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shoppingcart stopped");
    Ok(())
}

async fn build_store(cfg: &AppConfig) -> anyhow::Result<Arc<dyn CartStore>> {
    match cfg.store_backend {
        StoreBackend::InMemory => {
            if cfg.is_development() {
                info!("Using the in-memory cart store");
            } else {
                warn!("Using the in-memory cart store outside development; carts are lost on restart");
            }
            Ok(Arc::new(InMemoryCartStore::new()))
        }
        StoreBackend::SeaOrm => {
            let db_cfg = DbConfig::from_settings(&cfg.database)
                .context("no database configured for the sea-orm store")?;
            let db = api::db::establish_connection(&db_cfg)
                .await
                .context("failed to connect to the database")?;
            if cfg.auto_migrate {
                api::db::run_migrations(&db).await.map_err(|e| {
                    error!("Failed running migrations: {}", e);
                    e
                })?;
            }
            Ok(Arc::new(CartRepository::new(Arc::new(db))))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining connections");
}
