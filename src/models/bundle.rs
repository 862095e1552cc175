//! Bundle model
//!
//! A bundle is the DTN unit of payload: source, destination, size, release
//! time, TTL, and a replication budget. Custody is a holder *set* (no
//! exclusive transfer); the holder set is insertion-ordered with O(1)
//! membership so routing traversal is deterministic.
//!
//! # Lifecycle invariants
//!
//! - a bundle is born exactly when the source holds a copy
//! - delivery requires the destination to hold a copy
//! - `delivered` and `expired` are mutually exclusive and terminal: once a
//!   bundle is finalised no further state change is accepted
//! - `copies_used` never exceeds `max_copies` when the budget is capped
//! - every holder addition increments `hops`, so hops is at least
//!   `holders - 1`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised by bundle state transitions.
#[derive(Debug, Error, PartialEq)]
pub enum BundleError {
    #[error("bundle {0} is already finalised")]
    Finalized(u64),

    #[error("bundle {0} is not yet born")]
    NotBorn(u64),

    #[error("bundle {0} cannot be delivered: destination is not a holder")]
    DestinationNotHolder(u64),

    #[error("bundle {id} copy budget exhausted ({used}/{max})")]
    CopyBudgetExhausted { id: u64, used: u32, max: u32 },

    #[error("bundle size must be positive")]
    ZeroSize,
}

/// Insertion-ordered set of holder node indices with O(1) membership.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HolderSet {
    order: Vec<usize>,
    members: Vec<bool>,
}

impl HolderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node index; returns false if already present.
    pub fn insert(&mut self, node: usize) -> bool {
        if self.contains(node) {
            return false;
        }
        if node >= self.members.len() {
            self.members.resize(node + 1, false);
        }
        self.members[node] = true;
        self.order.push(node);
        true
    }

    pub fn contains(&self, node: usize) -> bool {
        self.members.get(node).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Holders in the order they acquired custody.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.order.iter().copied()
    }
}

/// A DTN bundle and its custody state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    /// Unique identifier, 1-based
    id: u64,
    /// Source node index
    source: usize,
    /// Destination node index
    destination: usize,
    /// Payload size in bytes
    size_bytes: u64,
    /// Simulated seconds at which the bundle becomes eligible
    release_time: f64,
    /// Time-to-live in seconds; 0 disables expiry
    ttl_seconds: f64,
    /// Replication budget; 0 means unlimited
    max_copies: u32,
    /// Copies consumed so far (the source copy counts as one)
    copies_used: u32,
    /// Nodes currently holding a copy
    holders: HolderSet,
    /// Holder additions since birth
    hops: u32,
    born: bool,
    delivered: bool,
    delivered_at: Option<f64>,
    expired: bool,
    expired_at: Option<f64>,
}

impl Bundle {
    /// Create a bundle. TTL and copy budget default to disabled/unlimited.
    pub fn new(
        id: u64,
        source: usize,
        destination: usize,
        size_bytes: u64,
        release_time: f64,
    ) -> Result<Self, BundleError> {
        if size_bytes == 0 {
            return Err(BundleError::ZeroSize);
        }
        Ok(Self {
            id,
            source,
            destination,
            size_bytes,
            release_time,
            ttl_seconds: 0.0,
            max_copies: 0,
            copies_used: 0,
            holders: HolderSet::new(),
            hops: 0,
            born: false,
            delivered: false,
            delivered_at: None,
            expired: false,
            expired_at: None,
        })
    }

    pub fn with_ttl_seconds(mut self, ttl_seconds: f64) -> Self {
        self.ttl_seconds = ttl_seconds.max(0.0);
        self
    }

    pub fn with_max_copies(mut self, max_copies: u32) -> Self {
        self.max_copies = max_copies;
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn source(&self) -> usize {
        self.source
    }

    pub fn destination(&self) -> usize {
        self.destination
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn release_time(&self) -> f64 {
        self.release_time
    }

    pub fn ttl_seconds(&self) -> f64 {
        self.ttl_seconds
    }

    pub fn ttl_enabled(&self) -> bool {
        self.ttl_seconds > 0.0
    }

    pub fn max_copies(&self) -> u32 {
        self.max_copies
    }

    pub fn copies_used(&self) -> u32 {
        self.copies_used
    }

    pub fn holders(&self) -> &HolderSet {
        &self.holders
    }

    pub fn hops(&self) -> u32 {
        self.hops
    }

    pub fn is_born(&self) -> bool {
        self.born
    }

    pub fn is_delivered(&self) -> bool {
        self.delivered
    }

    pub fn delivered_at(&self) -> Option<f64> {
        self.delivered_at
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn expired_at(&self) -> Option<f64> {
        self.expired_at
    }

    /// Delivered or expired: no further state changes accepted.
    pub fn is_finalized(&self) -> bool {
        self.delivered || self.expired
    }

    /// Remaining copy budget, if capped.
    pub fn copies_remaining(&self) -> Option<u32> {
        if self.max_copies == 0 {
            None
        } else {
            Some(self.max_copies.saturating_sub(self.copies_used))
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle transitions
    // ------------------------------------------------------------------

    /// Mark the bundle born: custody starts at the source, and the source
    /// copy consumes one unit of a capped budget.
    pub fn mark_born(&mut self) -> Result<(), BundleError> {
        if self.is_finalized() {
            return Err(BundleError::Finalized(self.id));
        }
        if self.born {
            return Ok(());
        }
        self.born = true;
        self.holders.insert(self.source);
        self.copies_used = 1;
        Ok(())
    }

    /// Add a holder, counting one hop. Returns false for an existing holder.
    pub fn add_holder(&mut self, node: usize) -> Result<bool, BundleError> {
        if self.is_finalized() {
            return Err(BundleError::Finalized(self.id));
        }
        if !self.born {
            return Err(BundleError::NotBorn(self.id));
        }
        if self.holders.insert(node) {
            self.hops += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Consume one unit of the replication budget.
    pub fn use_copy(&mut self) -> Result<(), BundleError> {
        if self.max_copies > 0 && self.copies_used >= self.max_copies {
            return Err(BundleError::CopyBudgetExhausted {
                id: self.id,
                used: self.copies_used,
                max: self.max_copies,
            });
        }
        self.copies_used += 1;
        Ok(())
    }

    pub fn mark_delivered(&mut self, t: f64) -> Result<(), BundleError> {
        if self.is_finalized() {
            return Err(BundleError::Finalized(self.id));
        }
        if !self.holders.contains(self.destination) {
            return Err(BundleError::DestinationNotHolder(self.id));
        }
        self.delivered = true;
        self.delivered_at = Some(t);
        Ok(())
    }

    pub fn mark_expired(&mut self, t: f64) -> Result<(), BundleError> {
        if self.is_finalized() {
            return Err(BundleError::Finalized(self.id));
        }
        self.expired = true;
        self.expired_at = Some(t);
        Ok(())
    }

    /// Age at time `t`, negative before release.
    pub fn age_at(&self, t: f64) -> f64 {
        t - self.release_time
    }

    /// TTL violated at time `t` (strictly older than the TTL).
    pub fn ttl_exceeded_at(&self, t: f64) -> bool {
        self.ttl_enabled() && self.age_at(t) > self.ttl_seconds
    }
}

/// Owner of all bundles in a run, keyed by id in stable order.
#[derive(Debug, Clone, Default)]
pub struct BundleRegistry {
    bundles: BTreeMap<u64, Bundle>,
}

impl BundleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bundle: Bundle) {
        self.bundles.insert(bundle.id(), bundle);
    }

    pub fn get(&self, id: u64) -> Option<&Bundle> {
        self.bundles.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Bundle> {
        self.bundles.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Bundles in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Bundle> {
        self.bundles.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Bundle> {
        self.bundles.values_mut()
    }

    /// Ids in ascending order (for iteration while mutating).
    pub fn ids(&self) -> Vec<u64> {
        self.bundles.keys().copied().collect()
    }
}
