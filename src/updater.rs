//! The reconciliation loop.
//!
//! One cycle is detect → resolve → compare → conditionally update. Cycles run
//! on a fixed interval (or exactly once in single-shot mode), never overlap,
//! and a failing cycle never stops the loop: only cancellation does.
//!
//! Dependencies are injected so tests can drive the loop with a fake address
//! source and a fake provider.

use crate::config::Config;
use crate::detect::AddressSource;
use crate::dnspod::{DnspodApi, ModifyParams};
use crate::error::{DdnsError, Result};
use crate::resolver::{self, RecordSelection, ResolvedRecord};
use std::net::Ipv4Addr;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

/// Outcome of one reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The stored value differed and the record was updated.
    Updated { ip: Ipv4Addr, previous: String },
    /// The stored value already matched; explicit idempotent no-op.
    NoChange { ip: Ipv4Addr },
    /// The wifi constraint was not satisfied; nothing was attempted.
    ConstraintSkipped,
}

/// Orchestrates detection, resolution and conditional updates.
pub struct Updater {
    config: Config,
    detector: Box<dyn AddressSource>,
    api: Box<dyn DnspodApi>,
}

impl Updater {
    pub fn new(config: Config, detector: Box<dyn AddressSource>, api: Box<dyn DnspodApi>) -> Self {
        Self {
            config,
            detector,
            api,
        }
    }

    /// Run until cancelled, or until the first cycle completes in single-shot
    /// mode.
    ///
    /// Returns [`DdnsError::Cancelled`] on cancellation, distinguishable from
    /// every other terminal error. In single-shot mode the first cycle's
    /// outcome is returned so a failed run is observable by the caller.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        if *shutdown.borrow() {
            return Err(DdnsError::Cancelled);
        }

        if !self.config.start_delay.is_zero() {
            info!(delay = ?self.config.start_delay, "start delay");
            tokio::select! {
                _ = shutdown.changed() => return Err(DdnsError::Cancelled),
                _ = tokio::time::sleep(self.config.start_delay) => {}
            }
        }

        // Always run once on startup.
        let first = self.check_once().await;
        if let Err(e) = &first {
            error!(error = %e, "startup check failed");
        }

        if self.config.single_shot() {
            info!(
                oneshot = self.config.one_shot,
                interval = ?self.config.check_interval,
                "exiting after startup cycle"
            );
            return first.map(|_| ());
        }

        let period = self.config.check_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        // A slow cycle delays the next tick, it never piles up extra cycles.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval = ?period, "watching for IP changes");
        loop {
            tokio::select! {
                _ = shutdown.changed() => return Err(DdnsError::Cancelled),
                _ = ticker.tick() => {
                    if let Err(e) = self.check_once().await {
                        error!(error = %e, "periodic check failed");
                    }
                }
            }
        }
    }

    /// Perform one reconciliation cycle.
    pub async fn check_once(&self) -> Result<CycleOutcome> {
        let detected = match self.detector.detect_ipv4().await {
            Ok(detected) => detected,
            Err(e) if e.is_wifi_skip() => {
                info!(reason = %e, "wifi constraint not satisfied, skipping cycle");
                return Ok(CycleOutcome::ConstraintSkipped);
            }
            Err(e) => return Err(e),
        };
        let want = detected.ip.to_string();
        info!(ip = %want, source = %detected.source, "detected IPv4");

        let common = self.config.common_params();
        let selection = RecordSelection::from_config(&self.config);
        let record = resolver::resolve(self.api.as_ref(), &common, &selection).await?;
        info!(
            record_id = record.id,
            name = %record.name,
            value = %record.value,
            "resolved target record"
        );

        if record.value == want {
            info!("no update needed (same IP)");
            return Ok(CycleOutcome::NoChange { ip: detected.ip });
        }

        let params = self.build_modify_params(&record, &want);
        self.api
            .record_modify(&common, record.id, &params)
            .await?;
        info!(record_id = record.id, value = %want, "record updated");

        Ok(CycleOutcome::Updated {
            ip: detected.ip,
            previous: record.value,
        })
    }

    /// Build the update intent for this cycle, carrying forward the record's
    /// observed type and routing line wherever the operator pinned nothing.
    fn build_modify_params(&self, record: &ResolvedRecord, value: &str) -> ModifyParams {
        // An operator-provided line id wins; otherwise preserve what the
        // record already has, id form first.
        let (record_line_id, record_line) = if self.config.record_line_id.is_empty() {
            (record.line_id.clone(), record.line.clone())
        } else {
            (
                self.config.record_line_id.clone(),
                self.config.record_line.clone(),
            )
        };

        let record_type = if self.config.record_type.is_empty() {
            record.record_type.clone()
        } else {
            self.config.record_type.clone()
        };

        ModifyParams {
            sub_domain: record.name.clone(),
            record_type,
            record_line,
            record_line_id,
            value: value.to_string(),
            mx: self.config.mx,
            ttl: self.config.ttl,
            status: self.config.status.clone(),
            weight: self.config.weight,
        }
    }
}
