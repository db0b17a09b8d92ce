use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;

use sustentabag_push_bridge::config::Settings;
use sustentabag_push_bridge::server::{create_app, AppState};
use sustentabag_push_bridge::telemetry::init_telemetry;
use sustentabag_push_bridge::triggers::RedisPushTransport;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::new()?;
    let _telemetry = init_telemetry(&settings.otel)?;
    tracing::info!(
        package = %settings.platform.package_name,
        api_level = settings.platform.api_level,
        "Configuration loaded"
    );

    let state = AppState::new(settings.clone());
    tracing::info!("Application state initialized");

    // The app is launched from the home screen at boot
    state.ui.start(&state.context.launcher_intent()).await?;

    let transport = settings.redis.enabled.then(|| {
        Arc::new(RedisPushTransport::new(
            settings.redis.clone(),
            state.context.intake().clone(),
        ))
    });
    let shutdown_signal = match &transport {
        Some(transport) => transport.shutdown_signal(),
        None => {
            tracing::info!("Redis transport disabled, accepting pushes over HTTP only");
            broadcast::channel(1).0
        }
    };

    let transport_handle = transport.map(|transport| {
        tokio::spawn(async move {
            if let Err(e) = transport.start().await {
                tracing::error!(error = %e, "Redis push transport failed");
            }
        })
    });

    let app = create_app(state.clone());

    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_signal))
        .await?;

    tracing::info!("Waiting for background tasks to finish...");
    if let Some(handle) = transport_handle {
        let _ = handle.await;
    }

    if state.ui.is_running().await {
        state.ui.stop().await?;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Stop the push transport
    let _ = shutdown_tx.send(());
}
