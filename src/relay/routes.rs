use axum::{
    routing::{delete, get},
    Router,
};

use super::handlers;
use super::server::AppState;
use super::websocket;

/// Create the device API router
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/devices",
            get(handlers::list_devices).post(handlers::add_device),
        )
        .route("/devices/:id", delete(handlers::remove_device))
        .route("/ws", get(websocket::handle_status_websocket))
        .route("/health", get(handlers::health_handler))
}
