//! Local IPv4 detection.
//!
//! The agent never asks an external "what is my IP" service; it inspects the
//! host itself. Four strategies exist, selected by [`DetectMethod`]:
//!
//! - `iface`: first usable IPv4 on a named interface
//! - `route`: interface of the kernel's default route, then `iface`
//! - `udp`: source address chosen by the stack when dialing a public peer
//! - `auto` (default): preferred interface, then route (where supported),
//!   then udp, then a scan of all up non-loopback interfaces
//!
//! Every strategy applies the same usability filter so that loopback and
//! link-local artifacts never end up in a public DNS record.

mod iface;
mod route;
mod udp;
mod wifi;

use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

pub(crate) use iface::IfaceIpv4;

/// Detection strategy selection, parsed from `IP_DETECT_METHOD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectMethod {
    Auto,
    Route,
    Udp,
    Iface,
}

impl FromStr for DetectMethod {
    type Err = DdnsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "auto" => Ok(DetectMethod::Auto),
            "route" => Ok(DetectMethod::Route),
            "udp" => Ok(DetectMethod::Udp),
            "iface" => Ok(DetectMethod::Iface),
            other => Err(DdnsError::Config(format!(
                "unknown IP_DETECT_METHOD: {other:?}"
            ))),
        }
    }
}

/// Which strategy (and interface, where applicable) produced an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectSource {
    Iface(String),
    Route(String),
    Udp,
    Scan(String),
}

impl fmt::Display for DetectSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectSource::Iface(name) => write!(f, "iface:{name}"),
            DetectSource::Route(name) => write!(f, "route:{name}"),
            DetectSource::Udp => write!(f, "udp"),
            DetectSource::Scan(name) => write!(f, "any:{name}"),
        }
    }
}

/// A freshly detected address, produced once per reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedAddress {
    pub ip: Ipv4Addr,
    pub source: DetectSource,
}

/// Trait for address-detection strategies.
///
/// The reconciliation loop only sees this seam, so tests can swap in a fake
/// source with a fixed answer.
#[async_trait]
pub trait AddressSource: Send + Sync {
    async fn detect_ipv4(&self) -> Result<DetectedAddress>;
}

/// The production [`AddressSource`]: a fallback chain over the platform
/// strategies, optionally gated by a wifi SSID constraint.
#[derive(Debug)]
pub struct IpDetector {
    method: DetectMethod,
    preferred_iface: Option<String>,
    wifi_ssid: Option<String>,
}

impl IpDetector {
    /// Build a detector, validating the method against this platform.
    ///
    /// Platform mismatches are configuration errors here, before the loop
    /// ever starts, distinct from runtime detection failures.
    pub fn new(
        method: DetectMethod,
        preferred_iface: Option<String>,
        wifi_ssid: Option<String>,
    ) -> Result<Self> {
        if method == DetectMethod::Route && !route::supported() {
            return Err(DdnsError::Config(
                "IP_DETECT_METHOD=route requires a kernel routing table (linux)".to_string(),
            ));
        }
        if method == DetectMethod::Iface && preferred_iface.is_none() {
            return Err(DdnsError::Config(
                "IP_DETECT_METHOD=iface requires IP_PREFERRED_IFACE".to_string(),
            ));
        }
        Ok(Self {
            method,
            preferred_iface,
            wifi_ssid,
        })
    }

    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        Self::new(
            config.detect_method,
            config.preferred_iface.clone(),
            config.wifi_ssid.clone(),
        )
    }
}

#[async_trait]
impl AddressSource for IpDetector {
    async fn detect_ipv4(&self) -> Result<DetectedAddress> {
        if let Some(target) = &self.wifi_ssid {
            let (ifname, ssid) = wifi::current_ssid(target)?;
            tracing::debug!(iface = %ifname, ssid = %ssid, "wifi ssid constraint satisfied");
        }

        let plan = detection_plan(
            self.method,
            self.preferred_iface.is_some(),
            route::supported(),
        );

        let mut last_err = None;
        for step in plan {
            match step {
                Step::Preferred => {
                    let Some(name) = &self.preferred_iface else {
                        continue;
                    };
                    match iface_ipv4(name) {
                        Ok(ip) => {
                            return Ok(DetectedAddress {
                                ip,
                                source: DetectSource::Iface(name.clone()),
                            })
                        }
                        Err(e) if self.method == DetectMethod::Iface => return Err(e),
                        Err(e) => {
                            tracing::debug!(iface = %name, error = %e, "preferred interface failed");
                            last_err = Some(e);
                        }
                    }
                }
                Step::Route => match route_ipv4() {
                    Ok((ip, name)) => {
                        return Ok(DetectedAddress {
                            ip,
                            source: DetectSource::Route(name),
                        })
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "route detection failed");
                        last_err = Some(e);
                    }
                },
                Step::Udp => match udp::probe_ipv4().await {
                    Ok(ip) => {
                        return Ok(DetectedAddress {
                            ip,
                            source: DetectSource::Udp,
                        })
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "udp detection failed");
                        last_err = Some(e);
                    }
                },
                Step::Scan => match scan_ipv4() {
                    Ok((ip, name)) => {
                        return Ok(DetectedAddress {
                            ip,
                            source: DetectSource::Scan(name),
                        })
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "interface scan failed");
                        last_err = Some(e);
                    }
                },
            }
        }

        match self.method {
            DetectMethod::Auto => Err(DdnsError::Detection(
                "failed to detect a usable IPv4 address".to_string(),
            )),
            _ => Err(last_err.unwrap_or_else(|| {
                DdnsError::Detection("failed to detect a usable IPv4 address".to_string())
            })),
        }
    }
}

/// One step of the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Preferred,
    Route,
    Udp,
    Scan,
}

/// The ordered steps a detector will attempt. Pure so ordering is testable.
fn detection_plan(method: DetectMethod, has_preferred: bool, route_supported: bool) -> Vec<Step> {
    let mut plan = Vec::new();
    if has_preferred {
        plan.push(Step::Preferred);
    }
    match method {
        DetectMethod::Auto => {
            if route_supported {
                plan.push(Step::Route);
            }
            plan.push(Step::Udp);
            plan.push(Step::Scan);
        }
        DetectMethod::Route => plan.push(Step::Route),
        DetectMethod::Udp => plan.push(Step::Udp),
        // The preferred-interface step is the whole strategy.
        DetectMethod::Iface => {}
    }
    plan
}

fn iface_ipv4(name: &str) -> Result<Ipv4Addr> {
    let entries = iface::enumerate()?;
    first_usable_on(&entries, name)
        .ok_or_else(|| DdnsError::Detection(format!("no usable IPv4 found on interface {name}")))
}

fn route_ipv4() -> Result<(Ipv4Addr, String)> {
    let name = route::default_route_interface()?;
    let ip = iface_ipv4(&name).map_err(|e| {
        DdnsError::Detection(format!("default route interface {name}: {e}"))
    })?;
    Ok((ip, name))
}

fn scan_ipv4() -> Result<(Ipv4Addr, String)> {
    let entries = iface::enumerate()?;
    first_usable_any(&entries)
        .ok_or_else(|| DdnsError::Detection("no usable IPv4 found on any interface".to_string()))
}

fn first_usable_on(entries: &[IfaceIpv4], name: &str) -> Option<Ipv4Addr> {
    entries
        .iter()
        .find(|e| e.name == name && is_usable_ipv4(e.addr))
        .map(|e| e.addr)
}

fn first_usable_any(entries: &[IfaceIpv4]) -> Option<(Ipv4Addr, String)> {
    entries
        .iter()
        .find(|e| e.up && !e.loopback && is_usable_ipv4(e.addr))
        .map(|e| (e.addr, e.name.clone()))
}

/// A usable IPv4 is one safe to publish: not loopback, not link-local
/// (169.254.0.0/16), and global-unicast in the broad sense (RFC1918
/// addresses pass; multicast, broadcast and unspecified do not).
pub(crate) fn is_usable_ipv4(ip: Ipv4Addr) -> bool {
    !(ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_multicast())
}
