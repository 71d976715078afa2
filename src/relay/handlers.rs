use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use super::models::{HealthResponse, MessageResponse, RegisterDeviceRequest};
use super::server::AppState;
use crate::error::{ErrorResponse, RelayError};

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match &self {
            RelayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RelayError::DeviceConflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self.to_error_response())).into_response()
    }
}

/// Register a device and start monitoring it
pub async fn add_device(
    State(state): State<AppState>,
    payload: Result<Json<RegisterDeviceRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, RelayError> {
    let Json(req) = payload.map_err(|e| RelayError::InvalidInput(e.body_text()))?;

    let record = state.devices.register(req).await.inspect_err(|e| {
        tracing::warn!(error = %e, "Device registration rejected");
    })?;

    Ok(Json(MessageResponse::new(format!(
        "Device {} added successfully",
        record.id
    ))))
}

/// List all registered devices
pub async fn list_devices(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.devices.list().await)
}

/// Stop monitoring a device. Unknown ids are not an error.
pub async fn remove_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<MessageResponse> {
    let message = if state.devices.remove(&id).await {
        format!("Device {} removed successfully", id)
    } else {
        format!("Device {} not found", id)
    };
    Json(MessageResponse::new(message))
}

/// Health check handler
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "device-relay".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// 404 Not Found handler
pub async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            code: "NOT_FOUND".to_string(),
            message: "Not found".to_string(),
        }),
    )
}
