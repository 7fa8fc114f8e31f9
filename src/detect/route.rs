//! Default-route discovery via the kernel routing table.
//!
//! `/proc/net/route` is reliable even inside a host-networked container,
//! where HTTP-based detection would report the NAT gateway instead.

use crate::error::{DdnsError, Result};

/// Whether this platform exposes a parseable kernel routing table.
pub(crate) fn supported() -> bool {
    cfg!(target_os = "linux")
}

#[cfg(target_os = "linux")]
pub(crate) fn default_route_interface() -> Result<String> {
    let table = std::fs::read_to_string("/proc/net/route")?;
    parse_route_table(&table).ok_or_else(|| {
        DdnsError::Detection("default route not found in /proc/net/route".to_string())
    })
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn default_route_interface() -> Result<String> {
    Err(DdnsError::Detection(
        "routing-table detection requires a kernel routing table (linux)".to_string(),
    ))
}

/// Locate the interface of the first route with an all-zero destination and a
/// nonzero flag word (a default route that is up).
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_route_table(table: &str) -> Option<String> {
    // Iface Destination Gateway Flags RefCnt Use Metric Mask MTU Window IRTT
    for line in table.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 11 {
            continue;
        }
        if fields[1] != "00000000" {
            continue;
        }
        if fields[3] == "00000000" {
            continue;
        }
        return Some(fields[0].to_string());
    }
    None
}
