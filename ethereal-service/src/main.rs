use ethereal_core::observability::logging::init_tracing;
use ethereal_service::{build_router, config::EtherealConfig, db, AppState};
use std::net::SocketAddr;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), ethereal_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = EtherealConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        environment = ?config.environment,
        "starting ethereal room layer"
    );

    let pool = db::create_pool(&config.database)
        .await
        .map_err(|e| ethereal_core::error::AppError::DatabaseError(anyhow::anyhow!(e)))?;
    db::init_schema(&pool)
        .await
        .map_err(|e| ethereal_core::error::AppError::DatabaseError(anyhow::anyhow!(e)))?;
    tracing::info!("record store ready");

    let addr: SocketAddr = format!("{}:{}", config.common.host, config.common.port)
        .parse()
        .map_err(|e| {
            ethereal_core::error::AppError::ConfigError(anyhow::anyhow!(
                "invalid listen address: {}",
                e
            ))
        })?;

    let state = AppState::new(config, pool).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
