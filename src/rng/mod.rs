//! Deterministic random number generation.
//!
//! A single seeded stream per run feeds both the workload generator and
//! the random buffer-eviction policy, preserving replay identity.

pub mod xorshift;

pub use xorshift::RngManager;
