//! Solve orchestration: one problem in, rendered before/after images out.
//!
//! Each problem is handed to two independent solver instances. The first is
//! solved and provides the routed paths plus the "routed" image; the second
//! is never solved and provides the "connection-pair" image. Both images use
//! the same per-problem net color offset.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{RenderError, SolveError, SolverError};
use crate::problem::{BoundaryConnectionPair, GeneratedProblem};
use crate::render::{ImageRenderer, NetColorAssigner, NetStyle};
use crate::solver::{RoutedPath, SolveStatus, SolverConfig, SolverFactory};

/// Directory (relative to the output root) for unsolved images.
pub const CONNECTION_PAIRS_DIR: &str = "images/connection-pairs";
/// Directory (relative to the output root) for solved images.
pub const ROUTED_DIR: &str = "images/routed";

/// Marker radius for port and via points, in board millimetres.
pub const DEFAULT_MARKER_RADIUS_MM: f64 = 0.15;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// 32-bit FNV-1a over the UTF-8 bytes of `input`.
pub fn fnv1a32(input: &str) -> u32 {
    input.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Seed for the solver's connection ordering.
pub fn shuffle_seed_for(problem_id: &str) -> u32 {
    fnv1a32(problem_id)
}

/// Net color rotation for a problem, in `0..max(pair_count, 1)`.
pub fn color_offset_for(problem_id: &str, pair_count: usize) -> u32 {
    let modulus = pair_count.max(1) as u32;
    fnv1a32(&format!("{}:net-color-offset", problem_id)) % modulus
}

/// Successful solve result as carried in service responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolvedSample {
    pub boundary_connection_pairs: Vec<BoundaryConnectionPair>,
    pub routed_paths: Vec<RoutedPath>,
    pub connection_pair_svg: String,
    pub routed_svg: String,
}

/// One line of `dataset.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub id: String,
    pub boundary_connection_pairs: Vec<BoundaryConnectionPair>,
    pub connection_pair_image: String,
    pub routed_image: String,
    pub routed_paths: Vec<RoutedPath>,
}

pub struct SolveOrchestrator {
    factory: Arc<dyn SolverFactory>,
    renderer: ImageRenderer,
    marker_radius_mm: f64,
}

impl SolveOrchestrator {
    pub fn new(factory: Arc<dyn SolverFactory>, renderer: ImageRenderer) -> Self {
        Self {
            factory,
            renderer,
            marker_radius_mm: DEFAULT_MARKER_RADIUS_MM,
        }
    }

    pub fn with_marker_radius(mut self, radius_mm: f64) -> Self {
        self.marker_radius_mm = radius_mm;
        self
    }

    /// Solve `problem` and render both images.
    ///
    /// `config.shuffle_seed` is overwritten with the seed derived from the
    /// problem id.
    pub fn solve(
        &self,
        problem: &GeneratedProblem,
        config: &SolverConfig,
    ) -> Result<SolvedSample, SolveError> {
        problem.validate().map_err(SolveError::InvalidProblem)?;

        let config = SolverConfig {
            shuffle_seed: shuffle_seed_for(&problem.problem_id),
            ..config.clone()
        };

        let mut solver = self
            .factory
            .create(problem, &config)
            .map_err(|e| solver_threw(&problem.problem_id, e))?;

        let status = catch_unwind(AssertUnwindSafe(|| solver.solve()))
            .map_err(|payload| SolverError::Panicked(panic_message(payload.as_ref())))
            .and_then(|result| result)
            .map_err(|e| solver_threw(&problem.problem_id, e))?;

        if let SolveStatus::Unsolved { error } = status {
            return Err(SolveError::NoSolution(
                error.unwrap_or_else(|| "no solution".to_string()),
            ));
        }

        let routed_paths = solver.routed_paths();
        let expected = problem.pair_count();
        if routed_paths.len() != expected {
            return Err(SolveError::IncompletePaths {
                expected,
                actual: routed_paths.len(),
            });
        }

        let unsolved = self
            .factory
            .create(problem, &config)
            .map_err(|e| solver_threw(&problem.problem_id, e))?;

        let offset = color_offset_for(&problem.problem_id, expected);
        let style = NetStyle::new(self.marker_radius_mm, NetColorAssigner::new(offset as usize));
        let connection_pair_svg =
            self.renderer
                .render_svg(&unsolved.visualize(), &problem.board, &style);
        let routed_svg = self
            .renderer
            .render_svg(&solver.visualize(), &problem.board, &style);

        debug!(
            problem_id = %problem.problem_id,
            pairs = expected,
            color_offset = offset,
            "Problem solved"
        );

        Ok(SolvedSample {
            boundary_connection_pairs: problem.boundary_connection_pairs.clone(),
            routed_paths,
            connection_pair_svg,
            routed_svg,
        })
    }
}

fn solver_threw(problem_id: &str, error: SolverError) -> SolveError {
    warn!(problem_id = %problem_id, error = %error, "Solver raised an error");
    SolveError::SolverThrew(error)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Write both images of `sample` under `output_dir` and build its dataset
/// row. Image references are relative to `output_dir`.
pub fn persist_sample(
    sample: SolvedSample,
    id: &str,
    output_dir: &Path,
    png_width: u32,
) -> Result<DatasetRow, RenderError> {
    ImageRenderer::write_artifacts(
        &sample.connection_pair_svg,
        &output_dir.join(CONNECTION_PAIRS_DIR),
        id,
        png_width,
    )?;
    ImageRenderer::write_artifacts(
        &sample.routed_svg,
        &output_dir.join(ROUTED_DIR),
        id,
        png_width,
    )?;

    Ok(DatasetRow {
        id: id.to_string(),
        boundary_connection_pairs: sample.boundary_connection_pairs,
        connection_pair_image: format!("{}/{}.png", CONNECTION_PAIRS_DIR, id),
        routed_image: format!("{}/{}.png", ROUTED_DIR, id),
        routed_paths: sample.routed_paths,
    })
}
