use std::net::TcpListener;

use crate::error::{RelayError, Result};

/// Check if a port is available on the given host
pub fn is_port_available(host: &str, port: u16) -> bool {
    TcpListener::bind((host, port)).is_ok()
}

/// Find the first free port in `start..start + attempts`
pub fn find_free_port(host: &str, start: u16, attempts: u16) -> Result<u16> {
    (0..attempts)
        .filter_map(|offset| start.checked_add(offset))
        .find(|&port| is_port_available(host, port))
        .ok_or(RelayError::NoFreePort { start, attempts })
}
