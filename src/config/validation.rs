//! Listen address validation.
//!
//! Accepts `host:port`, `ip:port`, `[ipv6]:port` and the `:port`
//! shorthand for all IPv4 interfaces. Hostnames are resolved once,
//! at startup.

use std::net::{SocketAddr, ToSocketAddrs};

use crate::error::PorticoError;

pub fn resolve_listen_addr(listen: &str) -> Result<SocketAddr, PorticoError> {
    let candidate = if listen.starts_with(':') {
        format!("0.0.0.0{listen}")
    } else {
        listen.to_string()
    };

    let invalid = |reason: String| PorticoError::ListenAddress {
        addr: listen.to_string(),
        reason,
    };

    candidate
        .to_socket_addrs()
        .map_err(|e| invalid(e.to_string()))?
        .next()
        .ok_or_else(|| invalid("no address found".into()))
}
