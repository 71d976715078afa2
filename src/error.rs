use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Device already registered: {0}")]
    DeviceConflict(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No free port after {attempts} attempts starting at {start}")]
    NoFreePort { start: u16, attempts: u16 },
}

/// Error body shared by the HTTP API and CLI failure output
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl RelayError {
    pub fn to_error_code(&self) -> &'static str {
        match self {
            RelayError::InvalidInput(_) => "INVALID_INPUT",
            RelayError::DeviceConflict(_) => "DEVICE_CONFLICT",
            RelayError::Http(_) | RelayError::UnexpectedStatus { .. } => "UPSTREAM_ERROR",
            RelayError::NoFreePort { .. } => "NO_FREE_PORT",
            _ => "INTERNAL_ERROR",
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.to_error_code().to_string(),
            message: self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
