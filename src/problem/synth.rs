//! Synthetic routing problem generation.
//!
//! Ports are scattered on the board perimeter with a minimum separation and
//! paired at random. Everything derives from the request seed through a
//! ChaCha8 RNG, so the same parameters always produce the same problem.

use kurbo::Point;
use rand::seq::SliceRandom;
use rand::{RngExt, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{BoundaryConnectionPair, GeneratedProblem, NodeWithPorts, PortPoint};
use crate::error::SynthesisError;
use crate::geometry::BoardOutline;

/// Inputs for one synthesized problem.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisParams {
    pub problem_id: String,
    pub seed: i64,
    pub pair_count: usize,
    pub min_point_separation_mm: f64,
    pub board: BoardOutline,
}

impl SynthesisParams {
    /// Parameters on the default 10 × 10 mm board centred at the origin.
    pub fn new(problem_id: impl Into<String>, seed: i64, pair_count: usize) -> Self {
        Self {
            problem_id: problem_id.into(),
            seed,
            pair_count,
            min_point_separation_mm: 0.5,
            board: BoardOutline::new(Point::ZERO, 10.0, 10.0),
        }
    }
}

/// Produces routing problems from synthesis parameters.
pub trait ProblemSynthesizer: Send + Sync {
    fn synthesize(&self, params: &SynthesisParams) -> Result<GeneratedProblem, SynthesisError>;
}

/// Places ports on the board perimeter by rejection sampling.
#[derive(Debug, Clone)]
pub struct PerimeterSynthesizer {
    /// Sampling attempts per port before giving up.
    pub max_tries_per_port: usize,
}

impl Default for PerimeterSynthesizer {
    fn default() -> Self {
        Self {
            max_tries_per_port: 2_000,
        }
    }
}

impl ProblemSynthesizer for PerimeterSynthesizer {
    fn synthesize(&self, params: &SynthesisParams) -> Result<GeneratedProblem, SynthesisError> {
        let board = &params.board;
        if params.pair_count == 0 {
            return Err(SynthesisError::InvalidParameter(
                "pair_count must be at least 1".to_string(),
            ));
        }
        if !(board.width > 0.0 && board.height > 0.0) {
            return Err(SynthesisError::InvalidParameter(format!(
                "board must have positive size, got {}x{}",
                board.width, board.height
            )));
        }

        let port_count = params.pair_count * 2;
        let separation = params.min_point_separation_mm.max(0.0);
        let perimeter = 2.0 * (board.width + board.height);
        let placement_error = || SynthesisError::PortPlacement {
            requested: port_count,
            separation_mm: separation,
        };
        if port_count as f64 * separation > perimeter {
            return Err(placement_error());
        }

        let mut rng = ChaCha8Rng::seed_from_u64(params.seed as u64);
        let mut placed: Vec<Point> = Vec::with_capacity(port_count);
        for _ in 0..port_count {
            let mut accepted = None;
            for _ in 0..self.max_tries_per_port {
                let t = rng.random_range(0.0..perimeter);
                let candidate = perimeter_point(board, t);
                if placed.iter().all(|p| p.distance(candidate) >= separation) {
                    accepted = Some(candidate);
                    break;
                }
            }
            placed.push(accepted.ok_or_else(placement_error)?);
        }

        let ports: Vec<PortPoint> = placed
            .iter()
            .enumerate()
            .map(|(i, p)| PortPoint {
                port_id: format!("P{:02}", i),
                x: p.x,
                y: p.y,
                available_z: vec![0, 1],
            })
            .collect();

        let mut order: Vec<usize> = (0..port_count).collect();
        order.shuffle(&mut rng);
        let boundary_connection_pairs = order
            .chunks(2)
            .enumerate()
            .map(|(k, chunk)| BoundaryConnectionPair {
                connection_name: format!("conn{}", k),
                start_port_id: ports[chunk[0]].port_id.clone(),
                end_port_id: ports[chunk[1]].port_id.clone(),
            })
            .collect();

        Ok(GeneratedProblem {
            problem_id: params.problem_id.clone(),
            board: *board,
            node: NodeWithPorts {
                node_id: format!("{}-node", params.problem_id),
                ports,
            },
            boundary_connection_pairs,
        })
    }
}

/// Point at arc length `t` along the perimeter, counter-clockwise from the
/// bottom-left corner.
fn perimeter_point(board: &BoardOutline, t: f64) -> Point {
    let (w, h) = (board.width, board.height);
    let (x0, y0, x1, y1) = (board.min_x(), board.min_y(), board.max_x(), board.max_y());
    if t < w {
        Point::new(x0 + t, y0)
    } else if t < w + h {
        Point::new(x1, y0 + (t - w))
    } else if t < 2.0 * w + h {
        Point::new(x1 - (t - w - h), y1)
    } else {
        Point::new(x0, y1 - (t - 2.0 * w - h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_perimeter(board: &BoardOutline, p: &PortPoint) -> bool {
        let eps = 1e-9;
        let on_x = (p.x - board.min_x()).abs() < eps || (p.x - board.max_x()).abs() < eps;
        let on_y = (p.y - board.min_y()).abs() < eps || (p.y - board.max_y()).abs() < eps;
        on_x || on_y
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let synth = PerimeterSynthesizer::default();
        let params = SynthesisParams::new("sample-000001", 42, 5);
        let a = synth.synthesize(&params).unwrap();
        let b = synth.synthesize(&params).unwrap();
        assert_eq!(a, b);

        let other = synth
            .synthesize(&SynthesisParams::new("sample-000001", 43, 5))
            .unwrap();
        assert_ne!(a.node.ports, other.node.ports);
    }

    #[test]
    fn test_ports_respect_perimeter_and_separation() {
        let synth = PerimeterSynthesizer::default();
        let params = SynthesisParams::new("p", 7, 10);
        let problem = synth.synthesize(&params).unwrap();

        assert_eq!(problem.node.ports.len(), 20);
        assert_eq!(problem.pair_count(), 10);
        assert!(problem.validate().is_ok());
        for (i, a) in problem.node.ports.iter().enumerate() {
            assert!(on_perimeter(&problem.board, a), "{:?}", a);
            for b in &problem.node.ports[i + 1..] {
                let d = Point::new(a.x, a.y).distance(Point::new(b.x, b.y));
                assert!(d >= 0.5);
            }
        }
    }

    #[test]
    fn test_every_port_used_exactly_once() {
        let problem = PerimeterSynthesizer::default()
            .synthesize(&SynthesisParams::new("p", 3, 6))
            .unwrap();
        let mut used: Vec<&str> = problem
            .boundary_connection_pairs
            .iter()
            .flat_map(|p| [p.start_port_id.as_str(), p.end_port_id.as_str()])
            .collect();
        used.sort();
        used.dedup();
        assert_eq!(used.len(), 12);
    }

    #[test]
    fn test_impossible_separation_fails() {
        let mut params = SynthesisParams::new("p", 1, 10);
        params.min_point_separation_mm = 5.0;
        let result = PerimeterSynthesizer::default().synthesize(&params);
        assert!(matches!(result, Err(SynthesisError::PortPlacement { .. })));
    }

    #[test]
    fn test_perimeter_walk_covers_all_edges() {
        let board = BoardOutline::new(Point::ZERO, 10.0, 10.0);
        assert_eq!(perimeter_point(&board, 0.0), Point::new(-5.0, -5.0));
        assert_eq!(perimeter_point(&board, 15.0), Point::new(5.0, 0.0));
        assert_eq!(perimeter_point(&board, 25.0), Point::new(0.0, 5.0));
        assert_eq!(perimeter_point(&board, 35.0), Point::new(-5.0, 0.0));
    }
}
