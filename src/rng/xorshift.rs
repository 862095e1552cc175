//! xorshift64* random number generator
//!
//! Fast, high-quality PRNG suitable for simulation purposes. The engine
//! draws every random decision (workload arrivals, random buffer eviction)
//! from a single stream seeded at run start.
//!
//! # Determinism
//!
//! Same seed, same sequence. This is CRITICAL for:
//! - Debugging (reproduce an exact run)
//! - Testing (replay identity of bundle reports and counters)
//! - Research (validate results)

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use dtn_sim_core::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let raw = rng.next_u64();
/// let coin = rng.bernoulli(0.5);
/// let victim = rng.index(10); // [0, 10)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    /// Internal state (64-bit), never zero
    state: u64,
}

impl RngManager {
    /// Create a new RNG with the given seed.
    ///
    /// A zero seed is mapped to 1 (xorshift requirement).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate the next random u64, advancing the internal state.
    pub fn next_u64(&mut self) -> u64 {
        // xorshift64* algorithm
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Generate a random f64 in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next_u64();
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Single Bernoulli trial with success probability `p`.
    ///
    /// `p <= 0.0` never succeeds, `p >= 1.0` always succeeds. Used by the
    /// workload generator for per-second bundle-creation trials.
    pub fn bernoulli(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform index in [0, len).
    ///
    /// Used by the random buffer-eviction policy.
    ///
    /// # Panics
    /// Panics if `len == 0`.
    pub fn index(&mut self, len: usize) -> usize {
        assert!(len > 0, "len must be positive");
        (self.next_u64() % len as u64) as usize
    }

    /// Uniform f64 in [min, max).
    ///
    /// # Panics
    /// Panics if `min >= max`.
    pub fn range_f64(&mut self, min: f64, max: f64) -> f64 {
        assert!(min < max, "min must be less than max");
        min + self.next_f64() * (max - min)
    }

    /// Get current RNG state (for replay from a mid-run point).
    pub fn get_state(&self) -> u64 {
        self.state
    }
}
