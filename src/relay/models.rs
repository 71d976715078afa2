use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Network address of a monitored device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAddress {
    pub ip: String,
    pub port: u16,
}

impl DeviceAddress {
    pub fn status_url(&self) -> String {
        format!("http://{}:{}/status", self.ip, self.port)
    }
}

/// Registered device plus its last observed status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub ip: String,
    pub port: u16,
    pub status: Option<Value>,
}

impl DeviceRecord {
    pub fn address(&self) -> DeviceAddress {
        DeviceAddress {
            ip: self.ip.clone(),
            port: self.port,
        }
    }
}

/// Pushed to every subscriber when a device's status changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub device_id: String,
    pub status: Value,
}

/// Body of `POST /devices`.
///
/// Every field is optional at the serde level so that missing fields are
/// reported as `INVALID_INPUT` rather than a bare extractor rejection.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RegisterDeviceRequest {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub device_type: Option<String>,
    pub ip: Option<String>,
    pub port: Option<u16>,
}

/// Plain acknowledgement returned by mutating endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}
