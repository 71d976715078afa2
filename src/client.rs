//! HTTP client for the relay's device API, used by the `relay devices`
//! commands.

use std::time::Duration;

use crate::error::{ErrorResponse, RelayError, Result};
use crate::relay::models::{DeviceRecord, MessageResponse, RegisterDeviceRequest};

pub struct RelayClient {
    base_url: String,
    client: reqwest::Client,
}

impl RelayClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub async fn list_devices(&self) -> Result<Vec<DeviceRecord>> {
        let response = self
            .client
            .get(format!("{}/devices", self.base_url))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn add_device(
        &self,
        id: &str,
        device_type: &str,
        ip: &str,
        port: u16,
    ) -> Result<MessageResponse> {
        let body = RegisterDeviceRequest {
            id: Some(id.to_string()),
            device_type: Some(device_type.to_string()),
            ip: Some(ip.to_string()),
            port: Some(port),
        };
        let response = self
            .client
            .post(format!("{}/devices", self.base_url))
            .json(&body)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn remove_device(&self, id: &str) -> Result<MessageResponse> {
        let response = self.client.delete(self.device_url(id)?).send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// `{base}/devices/{id}` with `id` percent-encoded as one path segment
    fn device_url(&self, id: &str) -> Result<reqwest::Url> {
        let invalid = || RelayError::InvalidInput(format!("invalid relay url: {}", self.base_url));
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(["devices", id]);
        Ok(url)
    }
}

/// Map an error response from the relay back onto `RelayError`
async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    match response.json::<ErrorResponse>().await {
        Ok(body) => Err(match body.code.as_str() {
            "INVALID_INPUT" => RelayError::InvalidInput(detail(body.message, "Invalid input: ")),
            "DEVICE_CONFLICT" => {
                RelayError::DeviceConflict(detail(body.message, "Device already registered: "))
            },
            _ => RelayError::UnexpectedStatus {
                url,
                status: status.as_u16(),
            },
        }),
        Err(_) => Err(RelayError::UnexpectedStatus {
            url,
            status: status.as_u16(),
        }),
    }
}

/// The relay sends the full error text; keep only the part after `prefix`
/// so re-wrapping it does not repeat the prefix.
fn detail(message: String, prefix: &str) -> String {
    match message.strip_prefix(prefix) {
        Some(rest) => rest.to_string(),
        None => message,
    }
}
