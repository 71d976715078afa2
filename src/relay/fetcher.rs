use serde_json::Value;
use std::time::Duration;

use super::models::DeviceAddress;
use crate::error::{RelayError, Result};

/// HTTP client for the device-side `GET /status` endpoint
#[derive(Clone, Debug)]
pub struct StatusFetcher {
    client: reqwest::Client,
}

impl StatusFetcher {
    /// Create a fetcher whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Fetch and parse the current status of a device.
    ///
    /// Anything other than a 200 with a JSON body is an error.
    pub async fn fetch(&self, address: &DeviceAddress) -> Result<Value> {
        let url = address.status_url();
        let response = self.client.get(&url).send().await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(RelayError::UnexpectedStatus {
                url,
                status: response.status().as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
