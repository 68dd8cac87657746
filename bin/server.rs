// Private Banking - Web Server
// REST API over the banking tables with Axum

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use private_banking::{router, AppState, Catalog, Config, Store};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        db = %config.db_path.display(),
        variant = %config.schema_variant,
        strict_validation = config.strict_validation,
        "starting private banking server"
    );

    // Open database and make sure the variant's tables exist
    let store = Store::open(&config.db_path, config.busy_timeout())?;
    store.setup(&Catalog::new(config.schema_variant))?;

    let app = router(AppState::new(store, &config));

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(%addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
