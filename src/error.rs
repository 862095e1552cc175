//! Top-level simulation error taxonomy.
//!
//! Configuration problems fail fast at engine construction; oracle failures
//! abort a run in progress. Everything else (TTL expiry, buffer overflow,
//! duplicate delivery) is a recorded outcome, not an error.

use thiserror::Error;

use crate::models::{BundleError, ContactPlanError, NodeError};
use crate::oracle::OracleError;

/// Errors that abort a run or reject a configuration.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("position oracle failed for {node} at t={time_s}s: {source}")]
    Oracle {
        node: String,
        time_s: f64,
        source: OracleError,
    },

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    ContactPlan(#[from] ContactPlanError),

    #[error(transparent)]
    Bundle(#[from] BundleError),
}
