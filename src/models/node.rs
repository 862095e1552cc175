//! Node model
//!
//! A node is a satellite or a ground station, identified by a unique
//! non-empty name. The [`NodeSet`] registry assigns each node a dense index;
//! all routing tie-breaks and iteration orders are canonicalised on that
//! index so runs replay identically.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Node category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Orbiting node; position comes from an external propagator.
    Satellite,
    /// Fixed node; position is a geodetic-to-ECEF transform of (lat, lon, alt).
    GroundStation,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Satellite => write!(f, "satellite"),
            NodeKind::GroundStation => write!(f, "ground-station"),
        }
    }
}

/// Errors raised while building a [`NodeSet`].
#[derive(Debug, Error, PartialEq)]
pub enum NodeError {
    #[error("node name must be non-empty")]
    EmptyName,

    #[error("duplicate node name: {0}")]
    DuplicateName(String),
}

/// A network participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    name: String,
    kind: NodeKind,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn satellite(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Satellite)
    }

    pub fn ground_station(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::GroundStation)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }
}

/// Registry assigning dense indices to nodes.
///
/// Index order is insertion order and is the canonical iteration order for
/// adjacency evaluation and routing tie-breaks.
///
/// # Example
/// ```
/// use dtn_sim_core::models::node::{Node, NodeSet};
///
/// let nodes = NodeSet::new(vec![
///     Node::ground_station("GS-A"),
///     Node::satellite("SAT-1"),
/// ]).unwrap();
///
/// assert_eq!(nodes.index_of("SAT-1"), Some(1));
/// assert_eq!(nodes.name_of(0), "GS-A");
/// ```
#[derive(Debug, Clone)]
pub struct NodeSet {
    nodes: Vec<Node>,
    by_name: HashMap<String, usize>,
}

impl NodeSet {
    /// Build a registry, validating name uniqueness.
    pub fn new(nodes: Vec<Node>) -> Result<Self, NodeError> {
        let mut by_name = HashMap::with_capacity(nodes.len());
        for (idx, node) in nodes.iter().enumerate() {
            if node.name.is_empty() {
                return Err(NodeError::EmptyName);
            }
            if by_name.insert(node.name.clone(), idx).is_some() {
                return Err(NodeError::DuplicateName(node.name.clone()));
            }
        }
        Ok(Self { nodes, by_name })
    }

    /// Dense index of a node, by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Name of the node at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn name_of(&self, index: usize) -> &str {
        self.nodes[index].name()
    }

    /// Node at `index`.
    pub fn get(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }
}
