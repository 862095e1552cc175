//! L-copies Spray-and-Wait
//!
//! Replication is capped by the bundle's copy budget: the source copy
//! consumes one unit at birth, and every sprayed relay consumes another.
//! Targets are chosen with the same greedy selection as PRoPHET-like
//! forwarding. A holder that meets the destination hands over directly even
//! with the budget exhausted (the wait phase); a direct handover only
//! consumes budget when some remains.
//!
//! A zero budget means unlimited and degrades to Epidemic flooding
//! (documented fallback).

use crate::models::Bundle;

use super::epidemic::EpidemicRouting;
use super::prophet::{greedy_candidate, holder_mask};
use super::{ForwardDecision, RoutingKind, RoutingPolicy, TickContext};

/// Budget-capped spray with greedy target selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct SprayAndWaitRouting;

impl RoutingPolicy for SprayAndWaitRouting {
    fn decide(&self, bundle: &Bundle, ctx: &TickContext<'_>) -> Vec<ForwardDecision> {
        if bundle.max_copies() == 0 {
            return EpidemicRouting.decide(bundle, ctx);
        }

        let mut decisions: Vec<ForwardDecision> = Vec::new();
        let mut has_copy = holder_mask(bundle, ctx.node_count());
        let destination = bundle.destination();
        let max_copies = bundle.max_copies();
        let mut copies = bundle.copies_used();

        for holder in bundle.holders().iter() {
            if copies >= max_copies {
                break;
            }
            if let Some(target) = greedy_candidate(holder, destination, ctx, &has_copy) {
                has_copy[target] = true;
                copies += 1;
                decisions.push(ForwardDecision {
                    from: holder,
                    to: target,
                    consumes_copy: true,
                });
            }
        }

        // Wait phase: with the budget exhausted, direct handover to the
        // destination is still permitted and completes delivery.
        if copies >= max_copies && !has_copy[destination] {
            for holder in bundle.holders().iter() {
                if ctx.adjacency.connected(holder, destination) {
                    decisions.push(ForwardDecision {
                        from: holder,
                        to: destination,
                        consumes_copy: false,
                    });
                    break;
                }
            }
        }

        decisions
    }

    fn kind(&self) -> RoutingKind {
        RoutingKind::SprayAndWait
    }
}
