use anyhow::{Context, Result};
use axum::{http::Method, Router};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::broadcaster::Broadcaster;
use super::port::find_free_port;
use super::service::DeviceService;
use crate::config::RelayConfig;

/// Relay state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub devices: DeviceService,
    pub broadcaster: Broadcaster,
}

impl AppState {
    pub fn new(config: &RelayConfig) -> crate::error::Result<Self> {
        let broadcaster = Broadcaster::new();
        let devices = DeviceService::new(config, broadcaster.clone())?;
        Ok(Self {
            devices,
            broadcaster,
        })
    }
}

/// Relay server instance
pub struct RelayServer {
    config: RelayConfig,
    state: AppState,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> crate::error::Result<Self> {
        let state = AppState::new(&config)?;
        Ok(Self { config, state })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Bind to the first free port and serve until ctrl-c
    pub async fn run(self) -> Result<()> {
        let port = find_free_port(
            &self.config.host,
            self.config.port,
            self.config.port_attempts,
        )?;
        let addr = format!("{}:{}", self.config.host, port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: tokio::net::TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let local_addr: SocketAddr = listener.local_addr().context("Listener has no address")?;

        tracing::info!("Device relay listening on {}", local_addr);
        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            poll_timeout_ms = self.config.poll_timeout.as_millis() as u64,
            reregister = ?self.config.reregister,
            "Polling configuration"
        );

        let app = create_router(self.state.clone());
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("Server error")?;

        self.state.devices.shutdown().await;
        Ok(())
    }
}

/// Create the Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    use super::{handlers, routes};

    routes::api_routes()
        .fallback(handlers::not_found_handler)
        .with_state(state)
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods([Method::GET, Method::POST, Method::DELETE])
                    .allow_headers(Any),
            ),
        )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
