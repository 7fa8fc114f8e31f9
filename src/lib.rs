//! # dnspod-ddns
//!
//! A dynamic-DNS agent for DNSPod. It periodically detects the host's
//! outbound IPv4 address — from a named interface, the kernel's default
//! route, or a UDP source-address probe — and updates one DNSPod record
//! when the stored value drifts.
//!
//! ## Features
//!
//! - Local IP detection with a fallback chain (no external "what is my IP"
//!   services)
//! - Optional wifi SSID constraint: only update while on a trusted network
//! - Record resolution by id or by (domain, subdomain, type) search
//! - Idempotent: equal values never trigger an update
//! - Preserves record type and routing line unless explicitly overridden
//!
//! ## Usage
//!
//! ```bash
//! # Reconcile on an interval (CHECK_INTERVAL=300)
//! dnspod-ddns run
//!
//! # Run exactly one cycle and exit
//! dnspod-ddns once
//!
//! # Show what address detection would pick
//! dnspod-ddns detect
//! ```

pub mod config;
pub mod detect;
pub mod dnspod;
pub mod error;
pub mod resolver;
pub mod updater;

pub use config::Config;
pub use detect::{AddressSource, DetectMethod, DetectSource, DetectedAddress, IpDetector};
pub use error::{DdnsError, Result};
pub use updater::{CycleOutcome, Updater};
