//! Geometric contact engine
//!
//! The time-stepped driver for live-adjacency simulation. At each tick:
//!
//! ```text
//! For each tick t:
//! 1. Release bundles whose release time has arrived
//! 2. Expire bundles past their TTL
//! 3. Query the position oracle, evaluate adjacency (LOS + range)
//! 4. Apply the routing decider to every born, non-finalised bundle
//! 5. Delivery check against the committed holder sets
//! 6. Advance time; stop early once every bundle is finalised
//! ```
//!
//! # Determinism
//!
//! Bundles are processed in ascending id order, holders in custody order,
//! neighbours in ascending node index. Same config and seed produce
//! byte-identical reports and event logs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::SimClock;
use crate::error::SimulationError;
use crate::events::{Event, EventLog, LogSink};
use crate::geometry::{AdjacencyEvaluator, DEFAULT_LOS_RADIUS_KM};
use crate::models::{Bundle, BundleRegistry, Node, NodeSet};
use crate::oracle::{PositionOracle, Vec3};
use crate::phy::PhyProfile;
use crate::report::{BundleOutcome, BundleReport, DelayComponents, RunSummary};
use crate::routing::{policy_for, RoutingKind, RoutingPolicy, TickContext};

// ============================================================================
// Configuration
// ============================================================================

/// Complete configuration for a geometric-engine run.
///
/// Per-bundle lists (`bundle_release_offsets_minutes`, `bundle_src_names`,
/// `bundle_dst_names`) accept either one element per bundle or a single
/// element broadcast to all bundles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of bundles created
    pub num_bundles: usize,

    /// Routing mode applied to all bundles
    pub routing: RoutingKind,

    /// PHY profile (adjacency range + delay accounting)
    pub phy: PhyProfile,

    /// Wall-clock anchor for t = 0
    pub start_time: DateTime<Utc>,

    /// Simulation horizon, minutes from `start_time`
    pub horizon_minutes: f64,

    /// Tick length, seconds
    pub step_seconds: f64,

    /// Bundle TTL, minutes; 0 disables expiry
    pub ttl_minutes: f64,

    /// Payload size used for PHY-extra delay accounting
    pub packet_size_bytes: u64,

    /// Skip the first N minutes of the horizon
    pub sim_start_offset_minutes: f64,

    /// Per-bundle release offsets from `start_time`, minutes (scalar
    /// broadcast allowed)
    pub bundle_release_offsets_minutes: Vec<f64>,

    /// Per-bundle source node names (scalar broadcast allowed)
    pub bundle_src_names: Vec<String>,

    /// Per-bundle destination node names (scalar broadcast allowed)
    pub bundle_dst_names: Vec<String>,

    /// Spray-and-Wait copy budget; 0 means unlimited
    pub max_copies: u32,

    /// Live-playback factor: ticks are paced at `step_seconds / speed`
    /// wall-clock seconds; 0 disables pacing
    pub real_time_speed: f64,

    /// Radius of the occluding Earth sphere for LOS tests, km
    pub r_los_km: f64,

    /// Seed for the run's RNG stream
    pub rng_seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_bundles: 1,
            routing: RoutingKind::Epidemic,
            phy: PhyProfile::default(),
            start_time: Utc::now(),
            horizon_minutes: 90.0,
            step_seconds: 60.0,
            ttl_minutes: 0.0,
            packet_size_bytes: 10_000,
            sim_start_offset_minutes: 0.0,
            bundle_release_offsets_minutes: vec![0.0],
            bundle_src_names: Vec::new(),
            bundle_dst_names: Vec::new(),
            max_copies: 0,
            real_time_speed: 0.0,
            r_los_km: DEFAULT_LOS_RADIUS_KM,
            rng_seed: 1,
        }
    }
}

/// Result of a single tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickResult {
    pub tick: usize,
    /// Seconds since run start at this tick
    pub time_s: f64,
    pub num_released: usize,
    pub num_forwarded: usize,
    pub num_delivered: usize,
    pub num_expired: usize,
}

// ============================================================================
// Engine
// ============================================================================

/// Driver owning all Mode A state: clock, bundles, adjacency, routing.
///
/// # Example
///
/// ```rust,ignore
/// let mut engine = ContactEngine::new(config, nodes, Box::new(oracle))?;
/// let summary = engine.run()?;
/// for report in &summary.reports {
///     println!("bundle {} -> {:?}", report.id, report.outcome);
/// }
/// ```
pub struct ContactEngine {
    config: EngineConfig,
    clock: SimClock,
    nodes: NodeSet,
    oracle: Box<dyn PositionOracle>,
    evaluator: AdjacencyEvaluator,
    policy: Box<dyn RoutingPolicy>,
    registry: BundleRegistry,
    event_log: EventLog,
    stop_flag: Option<Arc<AtomicBool>>,
    ticks_executed: usize,
}

impl std::fmt::Debug for ContactEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactEngine")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("nodes", &self.nodes)
            .field("evaluator", &self.evaluator)
            .field("registry", &self.registry)
            .field("event_log", &self.event_log)
            .field("ticks_executed", &self.ticks_executed)
            .finish()
    }
}

impl ContactEngine {
    /// Create an engine from configuration, validating fail-fast.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for a non-positive step, bad per-bundle list
    /// lengths, or `num_bundles == 0`; `UnknownNode` when a bundle endpoint
    /// does not name a registered node.
    pub fn new(
        config: EngineConfig,
        nodes: Vec<Node>,
        oracle: Box<dyn PositionOracle>,
    ) -> Result<Self, SimulationError> {
        let nodes = NodeSet::new(nodes)?;
        Self::validate_config(&config, &nodes)?;

        let offset_s = config.sim_start_offset_minutes * 60.0;
        let end_s = config.horizon_minutes * 60.0;
        let clock = SimClock::new(config.start_time, config.step_seconds, offset_s, end_s);

        let sources = broadcast(&config.bundle_src_names, config.num_bundles);
        let destinations = broadcast(&config.bundle_dst_names, config.num_bundles);
        let releases = broadcast(&config.bundle_release_offsets_minutes, config.num_bundles);

        let mut registry = BundleRegistry::new();
        for i in 0..config.num_bundles {
            let src = nodes
                .index_of(&sources[i])
                .ok_or_else(|| SimulationError::UnknownNode(sources[i].clone()))?;
            let dst = nodes
                .index_of(&destinations[i])
                .ok_or_else(|| SimulationError::UnknownNode(destinations[i].clone()))?;
            let bundle = Bundle::new(
                (i + 1) as u64,
                src,
                dst,
                config.packet_size_bytes,
                releases[i] * 60.0,
            )?
            .with_ttl_seconds(config.ttl_minutes * 60.0)
            .with_max_copies(if config.routing == RoutingKind::SprayAndWait {
                config.max_copies
            } else {
                0
            });
            registry.insert(bundle);
        }

        let evaluator = AdjacencyEvaluator::new(config.r_los_km, config.phy.max_range_km);
        let policy = policy_for(config.routing);
        let event_log = EventLog::new(config.start_time);

        Ok(Self {
            config,
            clock,
            nodes,
            oracle,
            evaluator,
            policy,
            registry,
            event_log,
            stop_flag: None,
            ticks_executed: 0,
        })
    }

    fn validate_config(config: &EngineConfig, nodes: &NodeSet) -> Result<(), SimulationError> {
        if config.num_bundles == 0 {
            return Err(SimulationError::InvalidConfig(
                "num_bundles must be > 0".to_string(),
            ));
        }
        if config.step_seconds <= 0.0 {
            return Err(SimulationError::InvalidConfig(
                "step_seconds must be > 0".to_string(),
            ));
        }
        if nodes.is_empty() {
            return Err(SimulationError::InvalidConfig(
                "at least one node is required".to_string(),
            ));
        }
        for (name, list) in [
            ("bundle_src_names", config.bundle_src_names.len()),
            ("bundle_dst_names", config.bundle_dst_names.len()),
            (
                "bundle_release_offsets_minutes",
                config.bundle_release_offsets_minutes.len(),
            ),
        ] {
            if list != 1 && list != config.num_bundles {
                return Err(SimulationError::InvalidConfig(format!(
                    "{} must have 1 or {} entries, got {}",
                    name, config.num_bundles, list
                )));
            }
        }
        Ok(())
    }

    /// Attach a cooperative cancellation flag, polled once per tick.
    pub fn set_stop_flag(&mut self, flag: Arc<AtomicBool>) {
        self.stop_flag = Some(flag);
    }

    /// Attach a best-effort log stream sink.
    pub fn set_log_sink(&mut self, sink: LogSink) {
        self.event_log = EventLog::with_sink(self.config.start_time, sink);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn current_tick(&self) -> usize {
        self.clock.current_tick()
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn registry(&self) -> &BundleRegistry {
        &self.registry
    }

    pub fn nodes(&self) -> &NodeSet {
        &self.nodes
    }

    // ========================================================================
    // Tick loop
    // ========================================================================

    /// Execute one simulation tick.
    ///
    /// All per-tick work is atomic with respect to the ledger: events for a
    /// tick are fully recorded before time advances.
    pub fn tick(&mut self) -> Result<TickResult, SimulationError> {
        let tick = self.clock.current_tick();
        let t = self.clock.current_seconds();
        let end_s = self.clock.end_seconds();

        let mut result = TickResult {
            tick,
            time_s: t,
            num_released: 0,
            num_forwarded: 0,
            num_delivered: 0,
            num_expired: 0,
        };

        // STEP 1: RELEASES
        // A bundle with release_time > t is not yet born; it neither
        // forwards nor expires.
        for id in self.registry.ids() {
            let Some(bundle) = self.registry.get_mut(id) else {
                continue;
            };
            if !bundle.is_born()
                && !bundle.is_finalized()
                && bundle.release_time() <= t
                && bundle.release_time() <= end_s
            {
                bundle.mark_born()?;
                result.num_released += 1;
                let event = Event::Released {
                    time_s: t,
                    bundle_id: id,
                    source: self.nodes.name_of(bundle.source()).to_string(),
                    destination: self.nodes.name_of(bundle.destination()).to_string(),
                };
                self.event_log.record(event);
            }
        }

        // STEP 2: TTL EXPIRY
        for id in self.registry.ids() {
            let Some(bundle) = self.registry.get_mut(id) else {
                continue;
            };
            if bundle.is_born() && !bundle.is_finalized() && bundle.ttl_exceeded_at(t) {
                bundle.mark_expired(t)?;
                result.num_expired += 1;
                self.event_log.record(Event::Expired {
                    time_s: t,
                    bundle_id: id,
                    at: None,
                });
            }
        }

        // STEP 3: ADJACENCY
        // Fully computed before any routing decision.
        let positions = self.query_positions(t)?;
        let adjacency = self.evaluator.evaluate(&positions);
        let ctx = TickContext {
            adjacency: &adjacency,
            positions: &positions,
        };

        // STEP 4: ROUTING + STEP 5: DELIVERY CHECK
        // Bundles in ascending id order; each decision sees only its own
        // bundle's committed holders plus this tick's accumulated adds.
        let mut events = Vec::new();
        for id in self.registry.ids() {
            let Some(bundle) = self.registry.get_mut(id) else {
                continue;
            };
            if !bundle.is_born() || bundle.is_finalized() {
                continue;
            }

            let decisions = self.policy.decide(bundle, &ctx);
            for decision in decisions {
                if bundle.add_holder(decision.to)? {
                    if decision.consumes_copy {
                        bundle.use_copy()?;
                    }
                    result.num_forwarded += 1;
                    events.push(Event::Forwarded {
                        time_s: t,
                        bundle_id: id,
                        from: self.nodes.name_of(decision.from).to_string(),
                        to: self.nodes.name_of(decision.to).to_string(),
                    });
                }
            }

            if bundle.holders().contains(bundle.destination()) && !bundle.is_delivered() {
                bundle.mark_delivered(t)?;
                result.num_delivered += 1;
                events.push(Event::Delivered {
                    time_s: t,
                    bundle_id: id,
                    at: self.nodes.name_of(bundle.destination()).to_string(),
                });
            }
        }
        for event in events {
            self.event_log.record(event);
        }

        // STEP 6: ADVANCE TIME
        self.clock.advance_tick();
        self.ticks_executed += 1;

        Ok(result)
    }

    fn query_positions(&self, t: f64) -> Result<Vec<Vec3>, SimulationError> {
        let mut positions = Vec::with_capacity(self.nodes.len());
        for idx in 0..self.nodes.len() {
            let pos = self.oracle.xyz_km(idx, t).map_err(|source| {
                SimulationError::Oracle {
                    node: self.nodes.name_of(idx).to_string(),
                    time_s: t,
                    source,
                }
            })?;
            positions.push(pos);
        }
        Ok(positions)
    }

    /// True once every bundle is finalised or out of the simulation window.
    fn all_bundles_settled(&self) -> bool {
        let end_s = self.clock.end_seconds();
        self.registry
            .iter()
            .all(|b| b.is_finalized() || b.release_time() > end_s)
    }

    // ========================================================================
    // Driver
    // ========================================================================

    /// Run to completion: horizon reached, every bundle settled, or the
    /// stop flag raised. Always produces a summary.
    pub fn run(&mut self) -> Result<RunSummary, SimulationError> {
        let end_s = self.clock.end_seconds();

        // Out-of-window bundles are known up front
        for id in self.registry.ids() {
            let Some(bundle) = self.registry.get(id) else {
                continue;
            };
            if bundle.release_time() > end_s {
                self.event_log.record(Event::NotSimulated {
                    time_s: bundle.release_time(),
                    bundle_id: id,
                });
            }
        }

        if self.clock.is_empty() {
            tracing::info!(
                offset_minutes = self.config.sim_start_offset_minutes,
                horizon_minutes = self.config.horizon_minutes,
                "horizon does not reach past the start offset; nothing simulated"
            );
            return Ok(self.summarize(true));
        }

        tracing::info!(
            bundles = self.registry.len(),
            nodes = self.nodes.len(),
            routing = %self.policy.kind(),
            "starting geometric contact engine run"
        );

        while !self.clock.is_exhausted() {
            if let Some(flag) = &self.stop_flag {
                if flag.load(Ordering::Relaxed) {
                    tracing::info!(tick = self.clock.current_tick(), "stop requested");
                    break;
                }
            }

            self.tick()?;

            if self.all_bundles_settled() {
                tracing::debug!(
                    tick = self.clock.current_tick(),
                    "all bundles settled, terminating early"
                );
                break;
            }

            if self.config.real_time_speed > 0.0 {
                let pause = self.config.step_seconds / self.config.real_time_speed;
                std::thread::sleep(std::time::Duration::from_secs_f64(pause));
            }
        }

        Ok(self.summarize(false))
    }

    fn summarize(&self, nothing_simulated: bool) -> RunSummary {
        let end_s = self.clock.end_seconds();
        let mut delivered = 0;
        let mut expired = 0;
        let mut not_delivered = 0;
        let mut not_simulated = 0;

        let reports = self
            .registry
            .iter()
            .map(|bundle| {
                let outcome = if nothing_simulated && !bundle.is_finalized() {
                    BundleOutcome::NotSimulated
                } else {
                    BundleOutcome::classify(bundle, end_s)
                };
                match outcome {
                    BundleOutcome::Delivered => delivered += 1,
                    BundleOutcome::Expired => expired += 1,
                    BundleOutcome::NotDelivered => not_delivered += 1,
                    BundleOutcome::NotSimulated => not_simulated += 1,
                }
                let delay = bundle.delivered_at().map(|at| {
                    DelayComponents::compute(
                        bundle.release_time(),
                        at,
                        bundle.hops(),
                        bundle.size_bytes(),
                        &self.config.phy,
                    )
                });
                BundleReport {
                    id: bundle.id(),
                    source: self.nodes.name_of(bundle.source()).to_string(),
                    destination: self.nodes.name_of(bundle.destination()).to_string(),
                    release_time_s: bundle.release_time(),
                    outcome,
                    delivered_at_s: bundle.delivered_at(),
                    expired_at_s: bundle.expired_at(),
                    hops: bundle.hops(),
                    delay,
                    phy_profile: self.config.phy.name.clone(),
                }
            })
            .collect();

        RunSummary {
            reports,
            delivered,
            expired,
            not_delivered,
            not_simulated,
            ticks_executed: self.ticks_executed,
            nothing_simulated,
        }
    }
}

/// Expand a one-element list to `n` entries, or pass a full list through.
fn broadcast<T: Clone>(values: &[T], n: usize) -> Vec<T> {
    if values.len() == 1 {
        vec![values[0].clone(); n]
    } else {
        values.to_vec()
    }
}
