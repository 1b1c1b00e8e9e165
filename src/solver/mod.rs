//! Routing solver boundary.
//!
//! A solver is created per problem from a [`SolverFactory`], asked to
//! [`solve`](RoutingSolver::solve) once, and then queried for its routed
//! paths and a [`GraphicsScene`] of its current state. Instances share no
//! state, so an unsolved instance always visualizes the untouched problem.

pub mod grid;

use kurbo::Point;
use serde::{Deserialize, Serialize};

use crate::error::SolverError;
use crate::problem::GeneratedProblem;
use crate::render::GraphicsScene;

pub use grid::{GridRouter, GridRouterFactory};

/// Physical routing rules and search limits.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    pub cell_size_mm: f64,
    pub trace_thickness_mm: f64,
    pub trace_margin_mm: f64,
    pub via_diameter_mm: f64,
    /// Seed for the order in which connections are routed.
    pub shuffle_seed: u32,
    pub max_iterations_per_connection: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            cell_size_mm: 0.1,
            trace_thickness_mm: 0.1,
            trace_margin_mm: 0.1,
            via_diameter_mm: 0.3,
            shuffle_seed: 0,
            max_iterations_per_connection: 200_000,
        }
    }
}

/// One vertex of a routed trace; `z` is the copper layer (0 = top).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub x: f64,
    pub y: f64,
    pub z: u8,
}

/// Geometric solution for one boundary connection pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedPath {
    pub connection_name: String,
    pub start_port_id: String,
    pub end_port_id: String,
    pub route: Vec<RoutePoint>,
    #[serde(default)]
    pub vias: Vec<Point>,
}

/// How a completed `solve` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveStatus {
    Solved,
    Unsolved { error: Option<String> },
}

pub trait RoutingSolver: Send {
    /// Run the search. `Err` means the solver itself broke, as opposed to
    /// finishing without a solution.
    fn solve(&mut self) -> Result<SolveStatus, SolverError>;

    fn routed_paths(&self) -> Vec<RoutedPath>;

    fn visualize(&self) -> GraphicsScene;
}

pub trait SolverFactory: Send + Sync {
    fn create(
        &self,
        problem: &GeneratedProblem,
        config: &SolverConfig,
    ) -> Result<Box<dyn RoutingSolver>, SolverError>;
}
