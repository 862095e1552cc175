//! DTN Simulator Core - Rust Engine
//!
//! Deterministic store-carry-forward simulation for satellite and
//! ground-station networks under intermittent connectivity.
//!
//! # Architecture
//!
//! - **core**: Time management (tick axis anchored at a UTC start)
//! - **models**: Domain types (Node, Bundle, ContactWindow)
//! - **oracle**: Position oracle interface (consumed, never implemented here)
//! - **geometry**: Line-of-sight and PHY-range adjacency (Mode A)
//! - **routing**: Epidemic / PRoPHET-like / Spray-and-Wait deciders (Mode A)
//! - **orchestrator**: Geometric contact engine and driver loop (Mode A)
//! - **scheduler**: Contact-plan scheduler with bounded buffers (Mode B)
//! - **buffer**: Byte-capacity queues with eviction policies
//! - **arrivals**: Bernoulli bundle workload generation (Mode B)
//! - **events**: Append-only ledger with best-effort log streaming
//! - **report**: Per-bundle outcomes, delivery records, byte accounting
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. All randomness is deterministic (one seeded xorshift64* stream per run)
//! 2. A finalised bundle (delivered or expired) never changes state again
//! 3. Exactly one delivery record per delivered bundle id
//! 4. Log streaming is best-effort and can never affect simulation state

// Module declarations
pub mod arrivals;
pub mod buffer;
pub mod core;
pub mod error;
pub mod events;
pub mod geometry;
pub mod models;
pub mod oracle;
pub mod orchestrator;
pub mod phy;
pub mod report;
pub mod rng;
pub mod routing;
pub mod scheduler;

// Re-exports for convenience
pub use crate::core::SimClock;
pub use arrivals::{BundleSeed, WorkloadConfig, WorkloadGenerator};
pub use buffer::{BundleQueue, DropPolicy, QueueEntry};
pub use error::SimulationError;
pub use events::{Event, EventLog, LogSink};
pub use geometry::{AdjacencyEvaluator, AdjacencyMatrix, DEFAULT_LOS_RADIUS_KM};
pub use models::{
    Bundle, BundleError, BundleRegistry, ContactPlan, ContactPlanError, ContactPlanSource,
    ContactRecord, ContactWindow, HolderSet, LinkDirection, Node, NodeError, NodeKind, NodeSet,
};
pub use oracle::{geodetic_to_ecef_km, FnOracle, OracleError, PositionOracle, StaticOracle, Vec3};
pub use orchestrator::{ContactEngine, EngineConfig, TickResult};
pub use phy::PhyProfile;
pub use report::{
    BundleOutcome, BundleReport, ByteTotals, DelayComponents, DeliveryRecord, RunSummary,
    SchedulerReport,
};
pub use rng::RngManager;
pub use routing::{ForwardDecision, RoutingKind, RoutingPolicy, TickContext};
pub use scheduler::{CopyMode, PlanScheduler, SchedulerConfig};
