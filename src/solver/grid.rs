//! Two-layer grid A* router.
//!
//! Connections are routed one at a time in a seeded shuffled order. Each
//! routed trace claims the cells around it (trace width plus margin) on its
//! layer, and each via claims a disk on both layers, so later connections
//! keep their clearance. Ports claim their surroundings up front.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use kurbo::Point;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::{RoutePoint, RoutedPath, RoutingSolver, SolveStatus, SolverConfig, SolverFactory};
use crate::error::SolverError;
use crate::problem::GeneratedProblem;
use crate::render::{GraphicsScene, SceneLine, ScenePoint};

const LAYERS: usize = 2;
const FREE: u32 = u32::MAX;
const NO_PARENT: u32 = u32::MAX;
const MAX_GRID_CELLS: usize = 4_000_000;

/// 8 directions for octilinear routing
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

const ORTHO_COST: i32 = 1000;
const DIAG_COST: i32 = 1414; // sqrt(2) * 1000
const VIA_COST: i32 = 8 * ORTHO_COST;

const TOP_LAYER_COLOR: &str = "#ff0000";
const BOTTOM_LAYER_COLOR: &str = "#0000ff";
const VIA_COLOR: &str = "#000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GridState {
    gx: i32,
    gy: i32,
    layer: u8,
}

/// A* open set entry with reverse ordering for min-heap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenEntry {
    f_score: i32,
    g_score: i32,
    state: GridState,
    counter: u32,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.counter.cmp(&self.counter))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Cell ownership per layer. A cell owned by connection `k` is passable only
/// for `k`.
#[derive(Debug, Clone)]
struct Grid {
    cols: i32,
    rows: i32,
    origin: Point,
    cell: f64,
    owner: Vec<u32>,
}

impl Grid {
    fn new(problem: &GeneratedProblem, cell: f64) -> Result<Self, SolverError> {
        if !(cell.is_finite() && cell > 0.0) {
            return Err(SolverError::InvalidConfig(format!(
                "cell size must be positive, got {}",
                cell
            )));
        }
        let board = &problem.board;
        let cols = (board.width / cell).round() as i64 + 1;
        let rows = (board.height / cell).round() as i64 + 1;
        let total = (cols.max(1) * rows.max(1)) as usize * LAYERS;
        if total > MAX_GRID_CELLS {
            return Err(SolverError::InvalidConfig(format!(
                "grid of {}x{} cells is too large",
                cols, rows
            )));
        }
        Ok(Self {
            cols: cols.max(1) as i32,
            rows: rows.max(1) as i32,
            origin: Point::new(board.min_x(), board.min_y()),
            cell,
            owner: vec![FREE; total],
        })
    }

    fn in_bounds(&self, gx: i32, gy: i32) -> bool {
        gx >= 0 && gy >= 0 && gx < self.cols && gy < self.rows
    }

    fn index(&self, s: GridState) -> usize {
        ((s.layer as i32 * self.rows + s.gy) * self.cols + s.gx) as usize
    }

    fn to_grid(&self, x: f64, y: f64) -> (i32, i32) {
        let gx = ((x - self.origin.x) / self.cell).round() as i32;
        let gy = ((y - self.origin.y) / self.cell).round() as i32;
        (gx.clamp(0, self.cols - 1), gy.clamp(0, self.rows - 1))
    }

    fn to_board(&self, gx: i32, gy: i32) -> Point {
        Point::new(
            self.origin.x + gx as f64 * self.cell,
            self.origin.y + gy as f64 * self.cell,
        )
    }

    fn passable(&self, s: GridState, net: u32) -> bool {
        if !self.in_bounds(s.gx, s.gy) {
            return false;
        }
        let owner = self.owner[self.index(s)];
        owner == FREE || owner == net
    }

    fn disk_passable(&self, gx: i32, gy: i32, layer: u8, radius: i32, net: u32) -> bool {
        disk(radius).all(|(dx, dy)| {
            let (x, y) = (gx + dx, gy + dy);
            !self.in_bounds(x, y) || self.passable(GridState { gx: x, gy: y, layer }, net)
        })
    }

    fn claim_disk(&mut self, gx: i32, gy: i32, layer: u8, radius: i32, net: u32) {
        for (dx, dy) in disk(radius) {
            let (x, y) = (gx + dx, gy + dy);
            if self.in_bounds(x, y) {
                let idx = self.index(GridState { gx: x, gy: y, layer });
                if self.owner[idx] == FREE {
                    self.owner[idx] = net;
                }
            }
        }
    }
}

fn disk(radius: i32) -> impl Iterator<Item = (i32, i32)> {
    let r2 = i64::from(radius) * i64::from(radius);
    (-radius..=radius).flat_map(move |dy| {
        (-radius..=radius)
            .filter(move |dx| i64::from(*dx) * i64::from(*dx) + i64::from(dy) * i64::from(dy) <= r2)
            .map(move |dx| (dx, dy))
    })
}

/// Clearance radius in cells, at least 1 and never wider than the grid.
fn clearance_cells(distance_mm: f64, cell: f64, max_cells: i32) -> i32 {
    let cells = (distance_mm / cell).ceil();
    if !cells.is_finite() {
        return max_cells.max(1);
    }
    (cells as i32).clamp(1, max_cells.max(1))
}

/// Creates [`GridRouter`] instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridRouterFactory;

impl SolverFactory for GridRouterFactory {
    fn create(
        &self,
        problem: &GeneratedProblem,
        config: &SolverConfig,
    ) -> Result<Box<dyn RoutingSolver>, SolverError> {
        Ok(Box::new(GridRouter::new(problem.clone(), config.clone())?))
    }
}

pub struct GridRouter {
    problem: GeneratedProblem,
    config: SolverConfig,
    grid: Grid,
    trace_clearance: i32,
    via_clearance: i32,
    routes: Vec<Option<RoutedPath>>,
}

impl GridRouter {
    pub fn new(problem: GeneratedProblem, config: SolverConfig) -> Result<Self, SolverError> {
        let mut grid = Grid::new(&problem, config.cell_size_mm)?;
        let max_cells = grid.cols.max(grid.rows);
        let trace_clearance = clearance_cells(
            config.trace_thickness_mm + config.trace_margin_mm,
            config.cell_size_mm,
            max_cells,
        );
        let via_clearance = clearance_cells(
            config.via_diameter_mm / 2.0 + config.trace_margin_mm + config.trace_thickness_mm / 2.0,
            config.cell_size_mm,
            max_cells,
        );

        for (net, pair) in problem.boundary_connection_pairs.iter().enumerate() {
            for port_id in [&pair.start_port_id, &pair.end_port_id] {
                let port = problem
                    .port(port_id)
                    .ok_or_else(|| SolverError::UnknownPort(port_id.clone()))?;
                let (gx, gy) = grid.to_grid(port.x, port.y);
                for layer in 0..LAYERS as u8 {
                    let center = GridState { gx, gy, layer };
                    let idx = grid.index(center);
                    grid.owner[idx] = net as u32;
                    grid.claim_disk(gx, gy, layer, trace_clearance, net as u32);
                }
            }
        }

        let routes = vec![None; problem.boundary_connection_pairs.len()];
        Ok(Self {
            problem,
            config,
            grid,
            trace_clearance,
            via_clearance,
            routes,
        })
    }

    fn port_states(&self, port_id: &str) -> Vec<GridState> {
        let Some(port) = self.problem.port(port_id) else {
            return Vec::new();
        };
        let (gx, gy) = self.grid.to_grid(port.x, port.y);
        port.available_z
            .iter()
            .filter(|z| (**z as usize) < LAYERS)
            .map(|&layer| GridState { gx, gy, layer })
            .collect()
    }

    fn heuristic(from: GridState, targets: &[GridState]) -> i32 {
        targets
            .iter()
            .map(|t| {
                let dx = (from.gx - t.gx).abs();
                let dy = (from.gy - t.gy).abs();
                let diag = dx.min(dy);
                let orth = (dx - dy).abs();
                diag * DIAG_COST + orth * ORTHO_COST
            })
            .min()
            .unwrap_or(0)
    }

    /// A* search for one connection; returns the cell path on success.
    fn search(&self, net: u32, sources: &[GridState], targets: &[GridState]) -> Option<Vec<GridState>> {
        let total = self.grid.owner.len();
        let mut g_costs = vec![i32::MAX; total];
        let mut parents = vec![NO_PARENT; total];
        let mut closed = vec![false; total];
        let mut open_set = BinaryHeap::new();
        let mut counter: u32 = 0;

        for &state in sources {
            let idx = self.grid.index(state);
            g_costs[idx] = 0;
            open_set.push(OpenEntry {
                f_score: Self::heuristic(state, targets),
                g_score: 0,
                state,
                counter,
            });
            counter += 1;
        }

        let mut iterations: u32 = 0;
        while let Some(entry) = open_set.pop() {
            iterations += 1;
            if iterations > self.config.max_iterations_per_connection {
                return None;
            }
            let current = entry.state;
            let current_idx = self.grid.index(current);
            if closed[current_idx] {
                continue;
            }
            closed[current_idx] = true;

            if targets.contains(&current) {
                return Some(self.reconstruct(&parents, current_idx));
            }

            let mut push = |next: GridState, cost: i32, open_set: &mut BinaryHeap<OpenEntry>| {
                let idx = self.grid.index(next);
                if closed[idx] {
                    return;
                }
                let new_g = entry.g_score + cost;
                if new_g < g_costs[idx] {
                    g_costs[idx] = new_g;
                    parents[idx] = current_idx as u32;
                    open_set.push(OpenEntry {
                        f_score: new_g + Self::heuristic(next, targets),
                        g_score: new_g,
                        state: next,
                        counter,
                    });
                    counter += 1;
                }
            };

            for (dx, dy) in DIRECTIONS {
                let next = GridState {
                    gx: current.gx + dx,
                    gy: current.gy + dy,
                    layer: current.layer,
                };
                if !self.grid.passable(next, net) {
                    continue;
                }
                let cost = if dx != 0 && dy != 0 { DIAG_COST } else { ORTHO_COST };
                push(next, cost, &mut open_set);
            }

            let via_ok = (0..LAYERS as u8).all(|layer| {
                self.grid
                    .disk_passable(current.gx, current.gy, layer, self.via_clearance, net)
            });
            if via_ok {
                for layer in 0..LAYERS as u8 {
                    if layer != current.layer {
                        push(GridState { layer, ..current }, VIA_COST, &mut open_set);
                    }
                }
            }
        }
        None
    }

    fn reconstruct(&self, parents: &[u32], goal_idx: usize) -> Vec<GridState> {
        let cols = self.grid.cols as usize;
        let rows = self.grid.rows as usize;
        let mut path = Vec::new();
        let mut idx = goal_idx;
        loop {
            let layer = (idx / (cols * rows)) as u8;
            let rem = idx % (cols * rows);
            path.push(GridState {
                gx: (rem % cols) as i32,
                gy: (rem / cols) as i32,
                layer,
            });
            match parents[idx] {
                NO_PARENT => break,
                parent => idx = parent as usize,
            }
        }
        path.reverse();
        path
    }

    fn commit(&mut self, net: u32, path: &[GridState]) -> RoutedPath {
        let mut vias = Vec::new();
        for window in path.windows(2) {
            let (a, b) = (window[0], window[1]);
            if a.layer != b.layer {
                vias.push(self.grid.to_board(a.gx, a.gy));
                for layer in 0..LAYERS as u8 {
                    self.grid
                        .claim_disk(a.gx, a.gy, layer, self.via_clearance, net);
                }
            }
        }
        for s in path {
            self.grid
                .claim_disk(s.gx, s.gy, s.layer, self.trace_clearance, net);
        }

        let pair = &self.problem.boundary_connection_pairs[net as usize];
        RoutedPath {
            connection_name: pair.connection_name.clone(),
            start_port_id: pair.start_port_id.clone(),
            end_port_id: pair.end_port_id.clone(),
            route: simplify(path)
                .into_iter()
                .map(|s| {
                    let p = self.grid.to_board(s.gx, s.gy);
                    RoutePoint {
                        x: p.x,
                        y: p.y,
                        z: s.layer,
                    }
                })
                .collect(),
            vias,
        }
    }
}

/// Drop intermediate cells on straight runs; layer changes are kept.
fn simplify(path: &[GridState]) -> Vec<GridState> {
    if path.len() < 3 {
        return path.to_vec();
    }
    let mut out = vec![path[0]];
    for i in 1..path.len() - 1 {
        let (prev, cur, next) = (path[i - 1], path[i], path[i + 1]);
        let straight = prev.layer == cur.layer
            && cur.layer == next.layer
            && (cur.gx - prev.gx, cur.gy - prev.gy) == (next.gx - cur.gx, next.gy - cur.gy);
        if !straight {
            out.push(cur);
        }
    }
    out.push(path[path.len() - 1]);
    out
}

impl RoutingSolver for GridRouter {
    fn solve(&mut self) -> Result<SolveStatus, SolverError> {
        let mut order: Vec<usize> = (0..self.problem.boundary_connection_pairs.len()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(u64::from(self.config.shuffle_seed));
        order.shuffle(&mut rng);

        for net in order {
            let pair = self.problem.boundary_connection_pairs[net].clone();
            let sources = self.port_states(&pair.start_port_id);
            let targets = self.port_states(&pair.end_port_id);
            if sources.is_empty() {
                return Err(SolverError::UnknownPort(pair.start_port_id));
            }
            if targets.is_empty() {
                return Err(SolverError::UnknownPort(pair.end_port_id));
            }

            match self.search(net as u32, &sources, &targets) {
                Some(path) => {
                    let routed = self.commit(net as u32, &path);
                    self.routes[net] = Some(routed);
                }
                None => {
                    tracing::debug!(
                        problem_id = %self.problem.problem_id,
                        connection = %pair.connection_name,
                        "No route found"
                    );
                    return Ok(SolveStatus::Unsolved {
                        error: Some(format!(
                            "could not route {} ({} -> {})",
                            pair.connection_name, pair.start_port_id, pair.end_port_id
                        )),
                    });
                }
            }
        }
        Ok(SolveStatus::Solved)
    }

    fn routed_paths(&self) -> Vec<RoutedPath> {
        self.routes.iter().flatten().cloned().collect()
    }

    fn visualize(&self) -> GraphicsScene {
        let mut scene = GraphicsScene::new();
        scene.title = Some(self.problem.problem_id.clone());

        for port in &self.problem.node.ports {
            let label = match self.problem.connection_index_of(&port.port_id) {
                Some(index) => format!("{}_{}", port.port_id, index),
                None => port.port_id.clone(),
            };
            scene.points.push(ScenePoint::new(port.x, port.y).with_label(label));
        }

        for routed in self.routes.iter().flatten() {
            for run in routed.route.chunk_by(|a, b| a.z == b.z) {
                if run.len() < 2 {
                    continue;
                }
                let color = if run[0].z == 0 {
                    TOP_LAYER_COLOR
                } else {
                    BOTTOM_LAYER_COLOR
                };
                scene.lines.push(SceneLine {
                    points: run.iter().map(|p| Point::new(p.x, p.y)).collect(),
                    stroke_width: self.config.trace_thickness_mm,
                    stroke_color: Some(color.to_string()),
                    label: Some(routed.connection_name.clone()),
                });
            }
            for via in &routed.vias {
                scene
                    .points
                    .push(ScenePoint::new(via.x, via.y).with_label("via").with_color(VIA_COLOR));
            }
        }
        scene
    }
}
