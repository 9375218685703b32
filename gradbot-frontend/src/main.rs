use dotenvy::dotenv;
use gradbot_core::observability::init_tracing;
use gradbot_core::{HttpTransport, SessionRegistry, SyncOptions, Transport};
use gradbot_frontend::config::get_configuration;
use gradbot_frontend::startup::{build_router, spawn_session_reaper};
use gradbot_frontend::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing("gradbot-frontend", &configuration.telemetry)?;

    gradbot_frontend::services::metrics::init_metrics();

    let transport: Arc<dyn Transport> = Arc::new(
        HttpTransport::new(&configuration.backend)
            .map_err(|e| anyhow::anyhow!("Backend configuration error: {}", e))?,
    );
    let sessions = Arc::new(SessionRegistry::new(
        transport,
        SyncOptions::from(&configuration.chat),
    ));

    spawn_session_reaper(
        sessions.clone(),
        Duration::from_secs(configuration.session.idle_minutes * 60),
    );

    let app = build_router(AppState::new(sessions), &configuration);

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!(
        backend = %configuration.backend.base_url,
        "Starting gradbot-frontend on {}", address
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!("Server error: {}", e);
            anyhow::anyhow!("Server error: {}", e)
        })?;

    Ok(())
}
