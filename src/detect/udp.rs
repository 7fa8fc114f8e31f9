//! Source-address detection via UDP route selection.
//!
//! Connecting a UDP socket never sends a packet; it only forces the stack to
//! pick an egress route and bind a local address. That makes this strategy
//! work even without real connectivity to the probe targets.

use crate::detect::is_usable_ipv4;
use crate::error::{DdnsError, Result};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tokio::net::UdpSocket;

/// Either target should select the default egress interface.
const PROBE_TARGETS: [&str; 2] = ["8.8.8.8:80", "1.1.1.1:80"];

const PROBE_DEADLINE: Duration = Duration::from_secs(2);

pub(crate) async fn probe_ipv4() -> Result<Ipv4Addr> {
    for target in PROBE_TARGETS {
        match tokio::time::timeout(PROBE_DEADLINE, probe(target)).await {
            Ok(Ok(ip)) if is_usable_ipv4(ip) => return Ok(ip),
            Ok(Ok(ip)) => {
                tracing::debug!(%ip, target, "udp probe returned an unusable address")
            }
            Ok(Err(e)) => tracing::debug!(error = %e, target, "udp probe failed"),
            Err(_) => tracing::debug!(target, "udp probe timed out"),
        }
    }
    Err(DdnsError::Detection(
        "udp source-ip detection failed".to_string(),
    ))
}

async fn probe(target: &str) -> std::io::Result<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(target).await?;
    match socket.local_addr()?.ip() {
        IpAddr::V4(ip) => Ok(ip),
        IpAddr::V6(_) => Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "expected an IPv4 local address",
        )),
    }
}
