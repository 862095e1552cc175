//! Epidemic flooding
//!
//! Every holder replicates to every connected neighbour that lacks the
//! bundle. Hops are counted once per new `(holder, neighbour)` addition by
//! the engine when it commits the decisions.

use crate::models::Bundle;

use super::{ForwardDecision, RoutingKind, RoutingPolicy, TickContext};

/// Unbounded replication to all connected non-holders.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpidemicRouting;

impl RoutingPolicy for EpidemicRouting {
    fn decide(&self, bundle: &Bundle, ctx: &TickContext<'_>) -> Vec<ForwardDecision> {
        let mut decisions = Vec::new();
        // Membership of committed holders plus this tick's accumulated adds
        let mut has_copy = vec![false; ctx.node_count()];
        for h in bundle.holders().iter() {
            if h < has_copy.len() {
                has_copy[h] = true;
            }
        }

        for holder in bundle.holders().iter() {
            for neighbor in ctx.adjacency.neighbors(holder) {
                if !has_copy[neighbor] {
                    has_copy[neighbor] = true;
                    decisions.push(ForwardDecision {
                        from: holder,
                        to: neighbor,
                        consumes_copy: false,
                    });
                }
            }
        }
        decisions
    }

    fn kind(&self) -> RoutingKind {
        RoutingKind::Epidemic
    }
}
