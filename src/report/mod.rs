//! Run reporting: per-bundle outcomes, delivery records, byte accounting.
//!
//! Reports are plain serde-serialisable values; callers choose the
//! serialisation format. The `to_json` helpers cover the common case.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::Bundle;
use crate::phy::PhyProfile;

/// Terminal classification of a bundle at run end.
///
/// Exactly one of these holds for every bundle (exhaustive and mutually
/// exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BundleOutcome {
    Delivered,
    Expired,
    NotDelivered,
    NotSimulated,
}

impl BundleOutcome {
    /// Classify a bundle against the simulation end time.
    pub fn classify(bundle: &Bundle, end_seconds: f64) -> BundleOutcome {
        if bundle.is_delivered() {
            BundleOutcome::Delivered
        } else if bundle.is_expired() {
            BundleOutcome::Expired
        } else if bundle.release_time() > end_seconds {
            BundleOutcome::NotSimulated
        } else {
            BundleOutcome::NotDelivered
        }
    }
}

/// Delay decomposition for a delivered bundle.
///
/// The store-carry-forward path delay dominates at DTN scale; the PHY extra
/// is additive per-hop accounting (serialisation time plus handshake).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayComponents {
    pub path_delay_s: f64,
    pub phy_extra_s: f64,
    pub total_delay_s: f64,
}

impl DelayComponents {
    pub fn compute(
        release_time: f64,
        delivered_at: f64,
        hops: u32,
        size_bytes: u64,
        phy: &PhyProfile,
    ) -> Self {
        let path_delay_s = delivered_at - release_time;
        let phy_extra_s = hops as f64 * phy.per_hop_extra_s(size_bytes);
        Self {
            path_delay_s,
            phy_extra_s,
            total_delay_s: path_delay_s + phy_extra_s,
        }
    }
}

/// Per-bundle report row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleReport {
    pub id: u64,
    pub source: String,
    pub destination: String,
    pub release_time_s: f64,
    pub outcome: BundleOutcome,
    pub delivered_at_s: Option<f64>,
    pub expired_at_s: Option<f64>,
    pub hops: u32,
    pub delay: Option<DelayComponents>,
    pub phy_profile: String,
}

/// One delivery, emitted exactly once per delivered bundle id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub bundle_id: u64,
    pub created_at_s: f64,
    pub delivered_at_s: f64,
    pub size_bytes: u64,
    pub latency_s: f64,
}

/// Byte accounting for one buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteTotals {
    pub bytes_in: u64,
    pub bytes_dropped: u64,
}

/// Summary of a geometric-engine (Mode A) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub reports: Vec<BundleReport>,
    pub delivered: usize,
    pub expired: usize,
    pub not_delivered: usize,
    pub not_simulated: usize,
    pub ticks_executed: usize,
    /// True for an empty run (horizon does not reach past the start offset)
    pub nothing_simulated: bool,
}

impl RunSummary {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Summary of a contact-plan (Mode B) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerReport {
    /// Ordered delivery records with latencies
    pub deliveries: Vec<DeliveryRecord>,
    pub created: usize,
    pub delivered: usize,
    pub ttl_drops: u64,
    pub buffer_drops: u64,
    pub dup_suppressed: u64,
    /// Bundles still queued and undelivered at run end
    pub in_flight: usize,
    /// Bytes that crossed a link, scaled by the ARQ factor
    pub air_bytes: f64,
    /// Payload bytes of first deliveries
    pub payload_bytes_delivered: u64,
    pub source_totals: ByteTotals,
    pub satellite_totals: BTreeMap<String, ByteTotals>,
}

impl SchedulerReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Mean delivery latency, if anything was delivered.
    pub fn mean_latency_s(&self) -> Option<f64> {
        if self.deliveries.is_empty() {
            return None;
        }
        let sum: f64 = self.deliveries.iter().map(|d| d.latency_s).sum();
        Some(sum / self.deliveries.len() as f64)
    }
}
