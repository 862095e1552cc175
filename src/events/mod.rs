//! Event logging for simulation replay and auditing.
//!
//! Every significant bundle state change is recorded as an [`Event`] in the
//! append-only [`EventLog`]. Events enable deterministic replay checks,
//! debugging, and metric extraction. The log can additionally stream each
//! event as a textual line `t=<ISO>: bundle <id> ...` to a caller-supplied
//! sink; sink failures are swallowed, so log streaming can never influence
//! simulation state.

use chrono::{DateTime, Utc};

use crate::core::SimClock;

/// Simulation event capturing a bundle state change.
///
/// All events carry seconds since run start for temporal ordering. Node
/// references are names, so events are readable without the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Bundle became eligible and took custody at its source
    Released {
        time_s: f64,
        bundle_id: u64,
        source: String,
        destination: String,
    },

    /// A copy moved between nodes (Mode A forward or Mode B transfer)
    Forwarded {
        time_s: f64,
        bundle_id: u64,
        from: String,
        to: String,
    },

    /// First copy reached the destination
    Delivered {
        time_s: f64,
        bundle_id: u64,
        at: String,
    },

    /// TTL exceeded before delivery (terminal)
    Expired {
        time_s: f64,
        bundle_id: u64,
        /// Queue holding the dropped copy, when known (Mode B)
        at: Option<String>,
    },

    /// Copy evicted or rejected at a full buffer
    BufferDropped {
        time_s: f64,
        bundle_id: u64,
        at: String,
    },

    /// Copy of an already-delivered bundle arrived at the destination
    DuplicateSuppressed {
        time_s: f64,
        bundle_id: u64,
        at: String,
    },

    /// Release time falls after the simulation end; never simulated
    NotSimulated { time_s: f64, bundle_id: u64 },
}

impl Event {
    /// Seconds since run start at which the event occurred.
    pub fn time_s(&self) -> f64 {
        match self {
            Event::Released { time_s, .. }
            | Event::Forwarded { time_s, .. }
            | Event::Delivered { time_s, .. }
            | Event::Expired { time_s, .. }
            | Event::BufferDropped { time_s, .. }
            | Event::DuplicateSuppressed { time_s, .. }
            | Event::NotSimulated { time_s, .. } => *time_s,
        }
    }

    /// Bundle the event refers to.
    pub fn bundle_id(&self) -> u64 {
        match self {
            Event::Released { bundle_id, .. }
            | Event::Forwarded { bundle_id, .. }
            | Event::Delivered { bundle_id, .. }
            | Event::Expired { bundle_id, .. }
            | Event::BufferDropped { bundle_id, .. }
            | Event::DuplicateSuppressed { bundle_id, .. }
            | Event::NotSimulated { bundle_id, .. } => *bundle_id,
        }
    }

    /// Short description of the event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Released { .. } => "Released",
            Event::Forwarded { .. } => "Forwarded",
            Event::Delivered { .. } => "Delivered",
            Event::Expired { .. } => "Expired",
            Event::BufferDropped { .. } => "BufferDropped",
            Event::DuplicateSuppressed { .. } => "DuplicateSuppressed",
            Event::NotSimulated { .. } => "NotSimulated",
        }
    }

    /// Textual line for the log stream, timestamped against `start`.
    pub fn format_line(&self, start: DateTime<Utc>) -> String {
        let iso = (start + chrono::Duration::milliseconds((self.time_s() * 1000.0).round() as i64))
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        match self {
            Event::Released {
                bundle_id,
                source,
                destination,
                ..
            } => format!(
                "t={}: bundle {} RELEASED src={} dst={}",
                iso, bundle_id, source, destination
            ),
            Event::Forwarded {
                bundle_id, from, to, ..
            } => format!("t={}: bundle {} forwarded {} -> {}", iso, bundle_id, from, to),
            Event::Delivered { bundle_id, at, .. } => {
                format!("t={}: bundle {} DELIVERED at {}", iso, bundle_id, at)
            }
            Event::Expired { bundle_id, at, .. } => match at {
                Some(node) => format!("t={}: bundle {} EXPIRED at {}", iso, bundle_id, node),
                None => format!("t={}: bundle {} EXPIRED", iso, bundle_id),
            },
            Event::BufferDropped { bundle_id, at, .. } => {
                format!("t={}: bundle {} DROPPED buffer at {}", iso, bundle_id, at)
            }
            Event::DuplicateSuppressed { bundle_id, at, .. } => {
                format!("t={}: bundle {} DUPLICATE suppressed at {}", iso, bundle_id, at)
            }
            Event::NotSimulated { bundle_id, .. } => {
                format!("t={}: bundle {} NOT-SIMULATED", iso, bundle_id)
            }
        }
    }
}

/// Fallible log-stream consumer. Errors are ignored by the log.
pub type LogSink = Box<dyn FnMut(&str) -> Result<(), Box<dyn std::error::Error>> + Send>;

/// Append-only event log with optional best-effort streaming.
pub struct EventLog {
    start: DateTime<Utc>,
    events: Vec<Event>,
    sink: Option<LogSink>,
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("start", &self.start)
            .field("events", &self.events.len())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl EventLog {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            events: Vec::new(),
            sink: None,
        }
    }

    /// Attach a streaming sink. Each recorded event is formatted and handed
    /// to the sink; a sink error is dropped on the floor.
    pub fn with_sink(start: DateTime<Utc>, sink: LogSink) -> Self {
        Self {
            start,
            events: Vec::new(),
            sink: Some(sink),
        }
    }

    /// Convenience constructor from a clock anchor.
    pub fn for_clock(clock: &SimClock) -> Self {
        Self::new(clock.start())
    }

    /// Append an event, streaming it if a sink is attached.
    pub fn record(&mut self, event: Event) {
        if let Some(sink) = self.sink.as_mut() {
            let line = event.format_line(self.start);
            // Best effort: a failing sink must not affect simulation state
            let _ = sink(&line);
        }
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn events_for_bundle(&self, bundle_id: u64) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.bundle_id() == bundle_id)
            .collect()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }
}
