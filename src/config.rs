use crate::error::{RelayError, Result};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_PORT_ATTEMPTS: u16 = 10;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(2);

/// What happens when a device id is registered a second time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReregisterPolicy {
    /// Cancel the running poller and start over with the new descriptor
    #[default]
    Replace,
    /// Refuse the registration with a conflict error
    Reject,
}

/// Relay configuration.
///
/// Defaults are overridden by environment variables, which are in turn
/// overridden by CLI flags (see `cli::ServeArgs::apply`).
///
/// Environment:
///   RELAY_HOST  bind address, defaults to "0.0.0.0"
///   RELAY_PORT  first port to try, defaults to 8000
///   RELAY_PORT_ATTEMPTS  consecutive ports to try, defaults to 10
///   RELAY_POLL_INTERVAL_MS  delay between polls, defaults to 1000
///   RELAY_POLL_TIMEOUT_MS  per-request timeout, defaults to 2000
///   RELAY_REJECT_DUPLICATES  "1"/"true" rejects re-registration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub port_attempts: u16,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub reregister: ReregisterPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            port_attempts: DEFAULT_PORT_ATTEMPTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            reregister: ReregisterPolicy::Replace,
        }
    }
}

impl RelayConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("RELAY_HOST") {
            config.host = host;
        }
        if let Some(port) = parse_env::<u16>("RELAY_PORT")? {
            config.port = port;
        }
        if let Some(attempts) = parse_env::<u16>("RELAY_PORT_ATTEMPTS")? {
            config.port_attempts = attempts;
        }
        if let Some(ms) = parse_env::<u64>("RELAY_POLL_INTERVAL_MS")? {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_env::<u64>("RELAY_POLL_TIMEOUT_MS")? {
            config.poll_timeout = Duration::from_millis(ms);
        }
        if std::env::var("RELAY_REJECT_DUPLICATES")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
        {
            config.reregister = ReregisterPolicy::Reject;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.port_attempts == 0 {
            return Err(RelayError::InvalidInput(
                "port attempts must be at least 1".into(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(RelayError::InvalidInput(
                "poll interval must be greater than zero".into(),
            ));
        }
        if self.poll_timeout.is_zero() {
            return Err(RelayError::InvalidInput(
                "poll timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            RelayError::InvalidInput(format!("{} has an invalid value: {}", name, raw))
        }),
        Err(_) => Ok(None),
    }
}
