//! Routing deciders for the geometric contact engine
//!
//! At each tick, for every born non-finalised bundle, a [`RoutingPolicy`]
//! inspects the committed holder set and the tick's adjacency and proposes
//! forwards. The engine commits the proposals: each new holder counts one
//! hop, capped-budget bundles consume copies, and the delivery check runs
//! after commit.
//!
//! Traversal is deterministic everywhere: holders in custody order,
//! neighbours in ascending node index, ties at the lowest index.

use crate::geometry::AdjacencyMatrix;
use crate::models::Bundle;
use crate::oracle::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod epidemic;
pub mod prophet;
pub mod spray;

pub use epidemic::EpidemicRouting;
pub use prophet::ProphetRouting;
pub use spray::SprayAndWaitRouting;

/// Routing mode selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingKind {
    /// Replicate to every connected neighbour lacking the bundle.
    Epidemic,
    /// Greedy single-copy forward toward the destination (PRoPHET-like
    /// stand-in; true delivery-predictability PRoPHET is a future addition).
    Prophet,
    /// L-copies spray: capped replication with greedy target selection.
    SprayAndWait,
}

impl RoutingKind {
    /// Parse a configuration tag, falling back to Epidemic for unknown
    /// values (documented fallback for option records).
    pub fn parse_lossy(tag: &str) -> RoutingKind {
        tag.parse().unwrap_or(RoutingKind::Epidemic)
    }
}

impl fmt::Display for RoutingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingKind::Epidemic => write!(f, "Epidemic"),
            RoutingKind::Prophet => write!(f, "PRoPHET"),
            RoutingKind::SprayAndWait => write!(f, "SprayAndWait"),
        }
    }
}

impl FromStr for RoutingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "epidemic" => Ok(RoutingKind::Epidemic),
            "prophet" => Ok(RoutingKind::Prophet),
            "sprayandwait" | "spray-and-wait" | "spray" => Ok(RoutingKind::SprayAndWait),
            _ => Err(format!(
                "invalid routing tag: '{}'. Valid values: Epidemic, PRoPHET, SprayAndWait",
                s
            )),
        }
    }
}

/// One proposed custody transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardDecision {
    pub from: usize,
    pub to: usize,
    /// Whether this forward consumes one unit of the copy budget.
    pub consumes_copy: bool,
}

/// Read-only view of one tick handed to the deciders.
pub struct TickContext<'a> {
    pub adjacency: &'a AdjacencyMatrix,
    /// Node positions at this tick, indexed by node.
    pub positions: &'a [Vec3],
}

impl TickContext<'_> {
    pub fn node_count(&self) -> usize {
        self.adjacency.node_count()
    }
}

/// Per-tick routing decision interface.
///
/// Implementations are stateless; all routing state (holders, copy budget)
/// lives on the bundle so decisions replay identically.
pub trait RoutingPolicy: Send + Sync {
    /// Proposed forwards for `bundle` at this tick.
    ///
    /// Decisions observe the committed holder set at tick start plus the
    /// forwards already proposed for this bundle within the call.
    fn decide(&self, bundle: &Bundle, ctx: &TickContext<'_>) -> Vec<ForwardDecision>;

    /// Routing mode implemented by this decider.
    fn kind(&self) -> RoutingKind;
}

/// Decider instance for a routing mode.
pub fn policy_for(kind: RoutingKind) -> Box<dyn RoutingPolicy> {
    match kind {
        RoutingKind::Epidemic => Box::new(EpidemicRouting),
        RoutingKind::Prophet => Box::new(ProphetRouting),
        RoutingKind::SprayAndWait => Box::new(SprayAndWaitRouting),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_tag_parse() {
        assert_eq!("Epidemic".parse::<RoutingKind>().unwrap(), RoutingKind::Epidemic);
        assert_eq!("prophet".parse::<RoutingKind>().unwrap(), RoutingKind::Prophet);
        assert_eq!(
            "SprayAndWait".parse::<RoutingKind>().unwrap(),
            RoutingKind::SprayAndWait
        );
        assert!("flooding".parse::<RoutingKind>().is_err());
    }

    #[test]
    fn test_unknown_tag_falls_back_to_epidemic() {
        assert_eq!(RoutingKind::parse_lossy("flooding"), RoutingKind::Epidemic);
        assert_eq!(RoutingKind::parse_lossy("spray"), RoutingKind::SprayAndWait);
    }
}
