//! Bounded byte buffers with eviction policies
//!
//! Every node that stores bundle copies does so through a [`BundleQueue`]:
//! a FIFO of queue entries bounded by a byte capacity. Admission evicts
//! victims under the configured policy until the new entry fits; if the
//! queue empties and the entry still does not fit, the entry itself is the
//! drop. Random eviction draws from the run's seeded RNG stream so replays
//! are identical.
//!
//! A queue entry is a reference to a bundle copy: the queue owns the entry,
//! never the bundle (the bundle registry does).

use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

/// Victim selection policy for a full buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPolicy {
    /// Evict the head of the FIFO (oldest entry).
    Oldest,
    /// Evict the largest entry; ties break at the lowest index.
    Largest,
    /// Evict a uniformly random entry (seeded RNG).
    Random,
}

impl fmt::Display for DropPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropPolicy::Oldest => write!(f, "oldest"),
            DropPolicy::Largest => write!(f, "largest"),
            DropPolicy::Random => write!(f, "random"),
        }
    }
}

impl FromStr for DropPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "oldest" => Ok(DropPolicy::Oldest),
            "largest" => Ok(DropPolicy::Largest),
            "random" => Ok(DropPolicy::Random),
            _ => Err(format!(
                "invalid buffer policy: '{}'. Valid values: oldest, largest, random",
                s
            )),
        }
    }
}

/// A queued reference to a bundle copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub bundle_id: u64,
    /// Creation time of the bundle, seconds since run start
    pub created_at: f64,
    /// Remaining bytes to transfer (shrinks on partial transmission)
    pub size_bytes: u64,
    /// TTL of the bundle, seconds; 0 disables expiry
    pub ttl_seconds: f64,
    /// Earliest downlink eligibility; set once at admission, 0 at the source
    pub ready_at: f64,
}

impl QueueEntry {
    pub fn ttl_enabled(&self) -> bool {
        self.ttl_seconds > 0.0
    }

    /// Absolute expiry deadline, or +inf when TTL is disabled.
    pub fn expires_at(&self) -> f64 {
        if self.ttl_enabled() {
            self.created_at + self.ttl_seconds
        } else {
            f64::INFINITY
        }
    }
}

/// Outcome of an admission attempt.
#[derive(Debug, PartialEq)]
pub struct AdmitResult {
    /// True when the entry was stored
    pub admitted: bool,
    /// Entries evicted to make room, in eviction order
    pub evicted: Vec<QueueEntry>,
}

/// FIFO byte buffer with capacity enforcement and drop accounting.
///
/// # Example
/// ```
/// use dtn_sim_core::buffer::{BundleQueue, DropPolicy, QueueEntry};
/// use dtn_sim_core::RngManager;
///
/// let mut rng = RngManager::new(7);
/// let mut queue = BundleQueue::new(1000, DropPolicy::Oldest);
/// let entry = QueueEntry {
///     bundle_id: 1,
///     created_at: 0.0,
///     size_bytes: 600,
///     ttl_seconds: 0.0,
///     ready_at: 0.0,
/// };
/// let result = queue.admit(entry, &mut rng);
/// assert!(result.admitted);
/// assert_eq!(queue.total_bytes(), 600);
/// ```
#[derive(Debug, Clone)]
pub struct BundleQueue {
    capacity_bytes: u64,
    policy: DropPolicy,
    entries: VecDeque<QueueEntry>,
    current_bytes: u64,
    bytes_in: u64,
    bytes_dropped: u64,
    buffer_drops: u64,
}

impl BundleQueue {
    pub fn new(capacity_bytes: u64, policy: DropPolicy) -> Self {
        Self {
            capacity_bytes,
            policy,
            entries: VecDeque::new(),
            current_bytes: 0,
            bytes_in: 0,
            bytes_dropped: 0,
            buffer_drops: 0,
        }
    }

    /// Admit an entry, evicting under the policy until it fits.
    ///
    /// Every eviction and a rejected entry count as buffer drops.
    pub fn admit(&mut self, entry: QueueEntry, rng: &mut RngManager) -> AdmitResult {
        let need = entry.size_bytes;
        let mut evicted = Vec::new();

        while self.current_bytes + need > self.capacity_bytes && !self.entries.is_empty() {
            let victim_idx = self.select_victim(rng);
            // remove() is Some: victim_idx < len by construction
            if let Some(victim) = self.entries.remove(victim_idx) {
                self.current_bytes -= victim.size_bytes;
                self.bytes_dropped += victim.size_bytes;
                self.buffer_drops += 1;
                evicted.push(victim);
            }
        }

        if self.current_bytes + need <= self.capacity_bytes {
            self.current_bytes += need;
            self.bytes_in += need;
            self.entries.push_back(entry);
            AdmitResult {
                admitted: true,
                evicted,
            }
        } else {
            self.bytes_dropped += need;
            self.buffer_drops += 1;
            AdmitResult {
                admitted: false,
                evicted,
            }
        }
    }

    fn select_victim(&mut self, rng: &mut RngManager) -> usize {
        match self.policy {
            DropPolicy::Oldest => 0,
            DropPolicy::Largest => {
                let mut best = 0;
                for (i, e) in self.entries.iter().enumerate() {
                    if e.size_bytes > self.entries[best].size_bytes {
                        best = i;
                    }
                }
                best
            }
            DropPolicy::Random => rng.index(self.entries.len()),
        }
    }

    /// Evict every entry whose TTL deadline falls before `now`.
    ///
    /// Returns the evicted entries in FIFO order; their bytes count as
    /// dropped from this buffer (the caller accounts them as TTL drops).
    pub fn sweep_expired(&mut self, now: f64) -> Vec<QueueEntry> {
        let mut expired = Vec::new();
        let mut kept = VecDeque::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if entry.expires_at() < now {
                self.current_bytes -= entry.size_bytes;
                self.bytes_dropped += entry.size_bytes;
                expired.push(entry);
            } else {
                kept.push_back(entry);
            }
        }
        self.entries = kept;
        expired
    }

    /// Account bytes removed from this buffer without a successful handoff
    /// (in-transfer TTL violations).
    pub fn note_dropped(&mut self, bytes: u64) {
        self.bytes_dropped += bytes;
    }

    /// Remove every entry referencing `bundle_id`.
    ///
    /// Deleting a bundle purges its copies from all queues; the removed
    /// bytes count as dropped from this buffer. Returns entries removed.
    pub fn purge_bundle(&mut self, bundle_id: u64) -> usize {
        let before = self.entries.len();
        let mut kept = VecDeque::with_capacity(before);
        for entry in self.entries.drain(..) {
            if entry.bundle_id == bundle_id {
                self.current_bytes -= entry.size_bytes;
                self.bytes_dropped += entry.size_bytes;
            } else {
                kept.push_back(entry);
            }
        }
        self.entries = kept;
        before - self.entries.len()
    }

    pub fn head(&self) -> Option<&QueueEntry> {
        self.entries.front()
    }

    pub fn head_mut(&mut self) -> Option<&mut QueueEntry> {
        self.entries.front_mut()
    }

    /// Remove and return the head entry, releasing its bytes.
    pub fn pop_head(&mut self) -> Option<QueueEntry> {
        let entry = self.entries.pop_front()?;
        self.current_bytes -= entry.size_bytes;
        Some(entry)
    }

    /// Entry at position `idx` (FIFO order).
    pub fn get(&self, idx: usize) -> Option<&QueueEntry> {
        self.entries.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut QueueEntry> {
        self.entries.get_mut(idx)
    }

    /// Remove the entry at `idx`, releasing its bytes.
    pub fn remove(&mut self, idx: usize) -> Option<QueueEntry> {
        let entry = self.entries.remove(idx)?;
        self.current_bytes -= entry.size_bytes;
        Some(entry)
    }

    /// Shrink the entry at `idx` after a partial transmission.
    pub fn shrink_entry(&mut self, idx: usize, by_bytes: u64) {
        if let Some(entry) = self.entries.get_mut(idx) {
            let by = by_bytes.min(entry.size_bytes);
            entry.size_bytes -= by;
            self.current_bytes -= by;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.current_bytes
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }

    /// Distinct bundle ids currently queued.
    pub fn bundle_ids(&self) -> Vec<u64> {
        self.entries.iter().map(|e| e.bundle_id).collect()
    }

    // ------------------------------------------------------------------
    // Counters
    // ------------------------------------------------------------------

    pub fn bytes_in(&self) -> u64 {
        self.bytes_in
    }

    pub fn bytes_dropped(&self) -> u64 {
        self.bytes_dropped
    }

    pub fn buffer_drops(&self) -> u64 {
        self.buffer_drops
    }
}
