//! Routing problem data model and synthesis.
//!
//! A [`GeneratedProblem`] is immutable once produced: a board outline, one
//! node with labelled ports, and the ordered boundary connection pairs whose
//! position defines each pair's connection index.

pub mod synth;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::geometry::BoardOutline;

pub use synth::{PerimeterSynthesizer, ProblemSynthesizer, SynthesisParams};

/// A labelled port on the node, reachable on the listed layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortPoint {
    pub port_id: String,
    pub x: f64,
    pub y: f64,
    pub available_z: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeWithPorts {
    pub node_id: String,
    pub ports: Vec<PortPoint>,
}

/// Two ports that must be electrically connected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundaryConnectionPair {
    pub connection_name: String,
    pub start_port_id: String,
    pub end_port_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedProblem {
    pub problem_id: String,
    pub board: BoardOutline,
    pub node: NodeWithPorts,
    pub boundary_connection_pairs: Vec<BoundaryConnectionPair>,
}

impl GeneratedProblem {
    pub fn port(&self, port_id: &str) -> Option<&PortPoint> {
        self.node.ports.iter().find(|p| p.port_id == port_id)
    }

    pub fn pair_count(&self) -> usize {
        self.boundary_connection_pairs.len()
    }

    /// Connection index of the pair using `port_id`, if any.
    pub fn connection_index_of(&self, port_id: &str) -> Option<usize> {
        self.boundary_connection_pairs
            .iter()
            .position(|pair| pair.start_port_id == port_id || pair.end_port_id == port_id)
    }

    /// Check that every pair references existing ports and no pair repeats.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for pair in &self.boundary_connection_pairs {
            for port in [&pair.start_port_id, &pair.end_port_id] {
                if self.port(port).is_none() {
                    return Err(format!("unknown port '{}'", port));
                }
            }
            let mut key = [pair.start_port_id.as_str(), pair.end_port_id.as_str()];
            key.sort();
            if !seen.insert(key) {
                return Err(format!(
                    "duplicate connection pair {} <-> {}",
                    pair.start_port_id, pair.end_port_id
                ));
            }
        }
        Ok(())
    }
}
