use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use crate::config::{RelayConfig, ReregisterPolicy};

const LONG_ABOUT: &str = r#"
Device Relay - poll network devices and push status changes over WebSocket

Register devices with `relay devices add`. The relay fetches
http://<ip>:<port>/status from each device every poll interval and sends
{"device_id": ..., "status": ...} to every client connected on /ws whenever
the status changes.

Environment:
  RELAY_HOST, RELAY_PORT, RELAY_PORT_ATTEMPTS, RELAY_POLL_INTERVAL_MS,
  RELAY_POLL_TIMEOUT_MS, RELAY_REJECT_DUPLICATES, RELAY_LOG_FILE, RUST_LOG
"#;

/// Default relay address used by the client commands
pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:8000";

#[derive(Parser, Clone)]
#[command(name = "relay")]
#[command(about = "Poll network devices and push status changes to WebSocket subscribers")]
#[command(long_about = LONG_ABOUT)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output (-q)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Run the relay server
    Serve(ServeArgs),

    /// Manage devices on a running relay
    #[command(subcommand)]
    Devices(DeviceCommands),
}

#[derive(Args, Clone, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// First port to try
    #[arg(long)]
    pub port: Option<u16>,

    /// Number of consecutive ports to try when the first is taken
    #[arg(long)]
    pub port_attempts: Option<u16>,

    /// Delay between polls of the same device, in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Timeout for a single status request, in milliseconds
    #[arg(long)]
    pub poll_timeout_ms: Option<u64>,

    /// Reject registration of an id that is already registered
    #[arg(long)]
    pub reject_duplicates: bool,

    /// Write logs to ~/.device-relay/logs/relay.log
    #[arg(long)]
    pub log_to_file: bool,
}

impl ServeArgs {
    /// Apply flags on top of an environment-derived config
    pub fn apply(&self, mut config: RelayConfig) -> RelayConfig {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(attempts) = self.port_attempts {
            config.port_attempts = attempts;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.poll_timeout_ms {
            config.poll_timeout = Duration::from_millis(ms);
        }
        if self.reject_duplicates {
            config.reregister = ReregisterPolicy::Reject;
        }
        config
    }
}

#[derive(Subcommand, Clone)]
pub enum DeviceCommands {
    /// List registered devices and their last status
    List {
        /// Relay base URL
        #[arg(long, default_value = DEFAULT_RELAY_URL)]
        url: String,
    },

    /// Register a device
    ///
    /// Examples:
    ///   relay devices add ABC123 shelly 192.168.1.20 80
    ///   relay devices add DOOR1 contact 127.0.0.1 8081 --url http://relay:8000
    Add {
        /// Unique device id
        id: String,

        /// Free-form device type
        #[arg(value_name = "TYPE")]
        device_type: String,

        /// Device IP address or hostname
        ip: String,

        /// Device HTTP port
        port: u16,

        /// Relay base URL
        #[arg(long, default_value = DEFAULT_RELAY_URL)]
        url: String,
    },

    /// Stop monitoring a device
    Remove {
        /// Device id
        id: String,

        /// Relay base URL
        #[arg(long, default_value = DEFAULT_RELAY_URL)]
        url: String,
    },
}
