//! PRoPHET-like greedy forwarding
//!
//! A single-copy stand-in for PRoPHET: each holder forwards to at most one
//! connected neighbour that is strictly closer to the destination, picking
//! the closest such neighbour, ties at the lowest node index. The
//! destination itself is at distance zero, so a holder that meets the
//! destination always hands over directly.

use crate::models::Bundle;

use super::{ForwardDecision, RoutingKind, RoutingPolicy, TickContext};

/// Greedy single-neighbour forward toward the destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProphetRouting;

/// The best candidate for `holder`: connected, not excluded, strictly
/// closer to the destination than the holder itself.
///
/// Shared with Spray-and-Wait, which applies the same selection under a
/// copy budget.
pub(crate) fn greedy_candidate(
    holder: usize,
    destination: usize,
    ctx: &TickContext<'_>,
    excluded: &[bool],
) -> Option<usize> {
    let dst_pos = &ctx.positions[destination];
    let holder_dist = ctx.positions[holder].distance(dst_pos);

    let mut best: Option<(usize, f64)> = None;
    for neighbor in ctx.adjacency.neighbors(holder) {
        if excluded[neighbor] {
            continue;
        }
        let dist = ctx.positions[neighbor].distance(dst_pos);
        if dist >= holder_dist {
            continue;
        }
        // Strictly-less comparison keeps the lowest index on ties
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((neighbor, dist)),
        }
    }
    best.map(|(n, _)| n)
}

/// Membership mask of committed holders, sized to the node count.
pub(crate) fn holder_mask(bundle: &Bundle, node_count: usize) -> Vec<bool> {
    let mut mask = vec![false; node_count];
    for h in bundle.holders().iter() {
        if h < mask.len() {
            mask[h] = true;
        }
    }
    mask
}

impl RoutingPolicy for ProphetRouting {
    fn decide(&self, bundle: &Bundle, ctx: &TickContext<'_>) -> Vec<ForwardDecision> {
        let mut decisions = Vec::new();
        let mut has_copy = holder_mask(bundle, ctx.node_count());

        for holder in bundle.holders().iter() {
            if let Some(target) = greedy_candidate(holder, bundle.destination(), ctx, &has_copy) {
                has_copy[target] = true;
                decisions.push(ForwardDecision {
                    from: holder,
                    to: target,
                    consumes_copy: false,
                });
            }
        }
        decisions
    }

    fn kind(&self) -> RoutingKind {
        RoutingKind::Prophet
    }
}
