//! Routable local address discovery.
//!
//! UDP socket + connect() towards an unreachable address: the kernel picks the
//! outbound interface, `local_addr()` reports it. No packet is sent.
//! Any failure (no route, no network) falls back to loopback.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use crate::consts::ROUTE_TARGET;

fn local_ip_towards(target: &str) -> Result<IpAddr> {
    let sock = UdpSocket::bind("0.0.0.0:0").context("bind udp socket")?;
    sock.connect(target)
        .with_context(|| format!("udp connect {}", target))?;
    let local = sock.local_addr().context("udp local_addr")?;
    Ok(local.ip())
}

/// Resolve the host's routable address; loopback on failure.
pub fn resolve() -> IpAddr {
    resolve_via(ROUTE_TARGET)
}

/// Same as `resolve`, with an explicit routing target.
pub fn resolve_via(target: &str) -> IpAddr {
    match local_ip_towards(target) {
        Ok(ip) if !ip.is_unspecified() => {
            debug!("net: resolved local address {} (via {})", ip, target);
            ip
        }
        Ok(ip) => {
            warn!("net: routing lookup returned {}, falling back to loopback", ip);
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
        Err(e) => {
            warn!("net: {:#}; falling back to loopback", e);
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}
