use std::net::SocketAddr;
use std::time::Duration;

use natours_api::api::build_router;
use natours_api::api::middleware::rate_limit::spawn_pruner;
use natours_api::config::Config;
use natours_api::infrastructure::database;
use natours_api::state::{AppState, Repositories};
use tokio::signal;
use tracing_subscriber::EnvFilter;

const RATE_LIMIT_PRUNE_PERIOD: Duration = Duration::from_secs(10 * 60);

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;
    init_tracing(&config);
    for warning in config.warnings() {
        tracing::warn!("{}", warning);
    }
    config.validate()?;

    tracing::info!(environment = ?config.environment, "Starting Natours");

    // Storage
    let repositories = if config.uses_memory_store() {
        tracing::warn!("Using the in-memory store; data is lost on shutdown");
        Repositories::in_memory()
    } else {
        let pool = database::connect(&config).await?;
        database::migrate(&pool).await?;
        Repositories::postgres(pool)
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = AppState::new(config, repositories);
    spawn_pruner(state.rate_limiter.clone(), RATE_LIMIT_PRUNE_PERIOD);
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}
