use std::time::Duration;
use tokio_util::task::TaskTracker;

use super::broadcaster::Broadcaster;
use super::fetcher::StatusFetcher;
use super::models::{DeviceRecord, RegisterDeviceRequest};
use super::poller::Poller;
use super::registry::DeviceRegistry;
use crate::config::{RelayConfig, ReregisterPolicy};
use crate::error::{RelayError, Result};

/// Device registration front door: keeps the registry and the set of
/// running pollers in step.
#[derive(Clone)]
pub struct DeviceService {
    registry: DeviceRegistry,
    broadcaster: Broadcaster,
    fetcher: StatusFetcher,
    pollers: TaskTracker,
    poll_interval: Duration,
    policy: ReregisterPolicy,
}

impl DeviceService {
    pub fn new(config: &RelayConfig, broadcaster: Broadcaster) -> Result<Self> {
        Ok(Self {
            registry: DeviceRegistry::new(),
            broadcaster,
            fetcher: StatusFetcher::new(config.poll_timeout)?,
            pollers: TaskTracker::new(),
            poll_interval: config.poll_interval,
            policy: config.reregister,
        })
    }

    /// Validate a registration request and start polling the device.
    pub async fn register(&self, req: RegisterDeviceRequest) -> Result<DeviceRecord> {
        let record = validate(req)?;
        let registration = self.registry.register(record.clone(), self.policy).await?;

        if registration.replaced {
            tracing::info!(device_id = %record.id, "Device re-registered, restarting poller");
        } else {
            tracing::info!(
                device_id = %record.id,
                device_type = %record.device_type,
                ip = %record.ip,
                port = record.port,
                "Device registered"
            );
        }

        let poller = Poller::new(
            record.id.clone(),
            record.address(),
            registration.generation,
            self.poll_interval,
            registration.cancel,
            self.registry.clone(),
            self.broadcaster.clone(),
            self.fetcher.clone(),
        );
        self.pollers.spawn(poller.run());

        Ok(record)
    }

    pub async fn list(&self) -> Vec<DeviceRecord> {
        self.registry.list().await
    }

    /// Remove a device. Returns whether it was registered.
    pub async fn remove(&self, id: &str) -> bool {
        let found = self.registry.remove(id).await;
        if found {
            tracing::info!(device_id = %id, "Device removed");
        } else {
            tracing::debug!(device_id = %id, "Remove requested for unknown device");
        }
        found
    }

    /// Number of poller tasks that have not finished yet
    pub fn active_pollers(&self) -> usize {
        self.pollers.len()
    }

    /// Cancel every poller and wait for them to finish
    pub async fn shutdown(&self) {
        self.registry.cancel_all();
        self.pollers.close();
        self.pollers.wait().await;
        tracing::info!("All pollers stopped");
    }
}

fn validate(req: RegisterDeviceRequest) -> Result<DeviceRecord> {
    fn required(value: Option<String>, field: &str) -> Result<String> {
        match value {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(RelayError::InvalidInput(format!("missing field: {}", field))),
        }
    }

    let id = required(req.id, "id")?;
    let device_type = required(req.device_type, "type")?;
    let ip = required(req.ip, "ip")?;
    let port = req
        .port
        .ok_or_else(|| RelayError::InvalidInput("missing field: port".into()))?;

    Ok(DeviceRecord {
        id,
        device_type,
        ip,
        port,
        status: None,
    })
}
