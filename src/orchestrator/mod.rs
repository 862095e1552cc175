//! Geometric contact engine (Mode A): live adjacency and the driver loop.
//!
//! See `engine.rs` for the full implementation.

pub mod engine;

pub use engine::{ContactEngine, EngineConfig, TickResult};
