use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::broadcaster::Broadcaster;
use super::fetcher::StatusFetcher;
use super::models::{DeviceAddress, StatusEvent};
use super::registry::{DeviceRegistry, StatusUpdate};

/// Why a poller stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The cancellation token fired (removal, replacement or shutdown)
    Cancelled,
    /// The registry no longer holds this device generation
    Removed,
}

/// Recurring status check for one registered device
pub struct Poller {
    device_id: String,
    address: DeviceAddress,
    generation: u64,
    interval: Duration,
    cancel: CancellationToken,
    registry: DeviceRegistry,
    broadcaster: Broadcaster,
    fetcher: StatusFetcher,
}

impl Poller {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device_id: String,
        address: DeviceAddress,
        generation: u64,
        interval: Duration,
        cancel: CancellationToken,
        registry: DeviceRegistry,
        broadcaster: Broadcaster,
        fetcher: StatusFetcher,
    ) -> Self {
        Self {
            device_id,
            address,
            generation,
            interval,
            cancel,
            registry,
            broadcaster,
            fetcher,
        }
    }

    /// Poll until the device is removed or the token is cancelled.
    pub async fn run(self) -> StopReason {
        tracing::info!(
            device_id = %self.device_id,
            url = %self.address.status_url(),
            "Poller started"
        );

        let reason = loop {
            if self.cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if !self.registry.contains(&self.device_id, self.generation).await {
                break StopReason::Removed;
            }

            let fetched = tokio::select! {
                _ = self.cancel.cancelled() => break StopReason::Cancelled,
                result = self.fetcher.fetch(&self.address) => result,
            };

            match fetched {
                Ok(status) => {
                    if let Some(reason) = self.handle_status(status).await {
                        break reason;
                    }
                },
                Err(e) => {
                    tracing::warn!(device_id = %self.device_id, error = %e, "Error polling device");
                },
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break StopReason::Cancelled,
                _ = tokio::time::sleep(self.interval) => {},
            }
        };

        tracing::info!(device_id = %self.device_id, reason = ?reason, "Poller stopped");
        reason
    }

    async fn handle_status(&self, status: serde_json::Value) -> Option<StopReason> {
        match self
            .registry
            .record_status(&self.device_id, self.generation, status.clone())
            .await
        {
            StatusUpdate::Changed => {
                tracing::debug!(device_id = %self.device_id, status = %status, "Device status changed");
                let event = StatusEvent {
                    device_id: self.device_id.clone(),
                    status,
                };
                self.broadcaster.broadcast(&event).await;
                None
            },
            StatusUpdate::Unchanged => {
                tracing::trace!(device_id = %self.device_id, "Device status unchanged");
                None
            },
            StatusUpdate::Gone => Some(StopReason::Removed),
        }
    }
}
