//! Workload generation for the contact-plan scheduler.
//!
//! Bundle-creation events come from a per-second Bernoulli trial with
//! probability λ. All randomness is drawn from the run's seeded RNG, so a
//! given seed and span always produce the same workload. A fallback
//! minimum guarantees non-empty runs when λ is small relative to the span.

use serde::{Deserialize, Serialize};

use crate::rng::RngManager;

/// A bundle-creation event: time and payload size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BundleSeed {
    /// Creation time, seconds since run start
    pub created_at: f64,
    pub size_bytes: u64,
}

/// Workload parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Per-second creation probability
    pub lambda_per_second: f64,
    /// Fixed payload size for every bundle
    pub msg_size_bytes: u64,
    /// Bundles injected uniformly over the span when the Bernoulli sweep
    /// produces none
    pub fallback_min_bundles: usize,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            lambda_per_second: 0.001,
            msg_size_bytes: 10_000,
            fallback_min_bundles: 100,
        }
    }
}

/// Deterministic bundle-creation generator.
#[derive(Debug, Clone)]
pub struct WorkloadGenerator {
    config: WorkloadConfig,
}

impl WorkloadGenerator {
    pub fn new(config: WorkloadConfig) -> Self {
        Self { config }
    }

    /// Generate creation events over `[start_s, stop_s)`, sorted by time.
    ///
    /// One Bernoulli trial per whole second. If the sweep yields nothing,
    /// `fallback_min_bundles` events are injected uniformly over the span.
    pub fn generate(&self, start_s: f64, stop_s: f64, rng: &mut RngManager) -> Vec<BundleSeed> {
        let mut seeds = Vec::new();
        let span = (stop_s - start_s).max(0.0);
        let whole_seconds = span.floor() as u64;

        for s in 0..whole_seconds {
            if rng.bernoulli(self.config.lambda_per_second) {
                seeds.push(BundleSeed {
                    created_at: start_s + s as f64,
                    size_bytes: self.config.msg_size_bytes,
                });
            }
        }

        if seeds.is_empty() && span > 0.0 && self.config.fallback_min_bundles > 0 {
            for _ in 0..self.config.fallback_min_bundles {
                seeds.push(BundleSeed {
                    created_at: rng.range_f64(start_s, stop_s),
                    size_bytes: self.config.msg_size_bytes,
                });
            }
            seeds.sort_by(|a, b| {
                a.created_at
                    .partial_cmp(&b.created_at)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        seeds
    }
}
