//! Match Controller
//!
//! Stateful WebSocket pairing server for anonymous 1:1 chat.
//!
//! # Servers
//!
//! A single HTTP server (default: 0.0.0.0:8080) carries:
//! - `GET /ws` - WebSocket upgrade for clients
//! - `GET /health`, `GET /ready` - liveness/readiness probes
//! - `GET /metrics` - Prometheus metrics
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize Prometheus metrics recorder
//! 3. Spawn the coordinator actor (`MatchCoordinatorHandle`)
//! 4. Bind the listener, mark ready, serve
//! 5. Wait for shutdown signal, then drain gracefully

#![warn(clippy::pedantic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use match_controller::actors::MatchCoordinatorHandle;
use match_controller::config::Config;
use match_controller::observability::{health_router, HealthState};
use match_controller::transport::{transport_router, TransportState};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Grace period for in-flight connections during shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "match_controller=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Match Controller");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        instance_id = %config.instance_id,
        bind_address = %config.bind_address,
        mailbox_buffer = config.mailbox_buffer,
        outbound_buffer = config.outbound_buffer,
        "Configuration loaded successfully"
    );

    // Initialize Prometheus metrics recorder
    // This must happen before any metrics are recorded
    let prometheus_handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        format!("Failed to install Prometheus metrics recorder: {e}")
    })?;
    info!("Prometheus metrics recorder initialized");

    // Initialize health state
    let health_state = Arc::new(HealthState::new());

    // Spawn the coordinator actor
    let coordinator = MatchCoordinatorHandle::new(config.mailbox_buffer);
    info!("Coordinator actor spawned");

    // Shutdown token as child of the coordinator's token, so cancelling
    // either direction tears everything down
    let shutdown_token = coordinator.child_token();

    let transport_state = TransportState {
        coordinator: coordinator.clone(),
        outbound_buffer: config.outbound_buffer,
    };

    let metrics_router = Router::new().route(
        "/metrics",
        axum::routing::get(move || {
            let handle = prometheus_handle.clone();
            async move { handle.render() }
        }),
    );

    let app = transport_router(transport_state)
        .merge(health_router(Arc::clone(&health_state)))
        .merge(metrics_router)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.bind_address, "Invalid bind address");
        format!("Invalid bind address: {e}")
    })?;

    // Bind BEFORE marking ready to fail fast on bind errors
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!(error = %e, addr = %addr, "Failed to bind server");
        format!("Failed to bind server to {addr}: {e}")
    })?;
    info!(addr = %addr, "Server bound successfully");

    health_state.set_ready();

    let serve_token = shutdown_token.child_token();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        serve_token.cancelled().await;
        info!("Server shutting down");
    });

    let server_task = tokio::spawn(async move {
        if let Err(e) = server.await {
            error!(error = %e, "Server failed");
        }
    });
    info!(addr = %addr, "Match Controller running - press Ctrl+C to shutdown");

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, initiating graceful shutdown...");

    // Mark as not ready immediately so load balancers stop sending traffic
    health_state.set_not_ready();

    shutdown_token.cancel();

    // Give in-flight connections time to observe the close
    tokio::time::sleep(SHUTDOWN_GRACE).await;

    // Stop the coordinator (cancels its token and closes the mailbox)
    coordinator.cancel();
    server_task.abort();

    info!("Match Controller shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed. This is acceptable because
/// without signal handlers, we cannot gracefully shut down the service.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
