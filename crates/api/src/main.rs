use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fileops_api::compose::compose;
use fileops_api::config::ServerConfig;
use fileops_api::router::build_app_router;
use fileops_notify::{EventBridge, ExpirySweeper};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fileops_api=debug,fileops_notify=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Engine composition ---
    let engine = compose(config.clone());
    let state = engine.state.clone();
    tracing::info!("Notification engine composed");

    // Spawn the event bridge (translates platform events into sends).
    let bridge = EventBridge::new(Arc::clone(&state.service));
    let bridge_handle = tokio::spawn(bridge.run(state.event_bus.subscribe()));

    // Spawn the expiry sweeper.
    let sweep_cancel = tokio_util::sync::CancellationToken::new();
    let sweeper = ExpirySweeper::new(
        engine.notifications,
        engine.audit,
        config.engine.sweep_interval(),
    );
    let sweep_cancel_clone = sweep_cancel.clone();
    let sweeper_handle = tokio::spawn(async move {
        sweeper.run(sweep_cancel_clone).await;
    });

    tracing::info!("Background services started (event bridge, expiry sweeper)");

    // --- Router ---
    let app = build_app_router(state.clone(), &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Stop the expiry sweeper.
    sweep_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), sweeper_handle).await;
    tracing::info!("Expiry sweeper stopped");

    // Drop the event bus sender to close the broadcast channel, signalling
    // the bridge to shut down.
    drop(state.event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), bridge_handle).await;
    tracing::info!("Event bridge shut down");

    let count = state.registry.connection_count().await;
    tracing::info!(count, "Closing remaining live connections");
    state.registry.shutdown_all().await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server shuts
/// down cleanly whether stopped interactively or by a process manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
