use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use super::types::{BoundingBox, Direction, Point};

// ── A* cost scaling ─────────────────────────────────────────────────
/// Cost of moving one cell.
const STEP_COST: u32 = 1000;
/// Minimum grid step; smaller values would explode the cell count.
const GRID_STEP_MIN: f32 = 1.0;

/// Weight of a free cell.
pub const FREE_WEIGHT: u32 = 1;
/// Weight of a cell covered by a node obstacle.
pub const OBSTACLE_WEIGHT: u32 = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutingConfig {
    pub enable_grid_router: bool,
    /// Extra cost of a bend, in cells.
    pub turn_penalty: f32,
    /// Upper bound on A* expansions per route.
    pub max_steps: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            enable_grid_router: true,
            turn_penalty: 2.0,
            max_steps: 200_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Traversal weight; `OBSTACLE_WEIGHT` marks a node obstacle.
    pub weight: u32,
    /// Set to 1 on cells crossed by a computed route. Debug overlay only.
    pub visited: u8,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            weight: FREE_WEIGHT,
            visited: 0,
        }
    }
}

/// Uniform routing grid laid over a layout's bounding box.
#[derive(Debug, Clone)]
pub struct Grid {
    bbox: BoundingBox,
    step: f32,
    cols: i32,
    rows: i32,
    /// Indexed `[col][row]`.
    cells: Vec<Vec<Cell>>,
    config: RoutingConfig,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct GridState {
    x: i32,
    y: i32,
    dir: Direction,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct GridEntry {
    est: u32,
    cost: u32,
    state: GridState,
}

impl Ord for GridEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .est
            .cmp(&self.est)
            .then_with(|| other.cost.cmp(&self.cost))
            .then_with(|| other.state.y.cmp(&self.state.y))
            .then_with(|| other.state.x.cmp(&self.state.x))
            .then_with(|| other.state.dir.index().cmp(&self.state.dir.index()))
    }
}

impl PartialOrd for GridEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Grid {
    pub fn new(bbox: BoundingBox, step: f32) -> Self {
        let step = if step.is_finite() {
            step.max(GRID_STEP_MIN)
        } else {
            GRID_STEP_MIN
        };
        let cols = ((bbox.width() / step).ceil() as i32).max(1);
        let rows = ((bbox.height() / step).ceil() as i32).max(1);
        Self {
            bbox,
            step,
            cols,
            rows,
            cells: vec![vec![Cell::default(); rows as usize]; cols as usize],
            config: RoutingConfig::default(),
        }
    }

    pub fn with_routing(mut self, config: RoutingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn cols(&self) -> usize {
        self.cols as usize
    }

    pub fn rows(&self) -> usize {
        self.rows as usize
    }

    pub fn cell(&self, col: usize, row: usize) -> Option<&Cell> {
        self.cells.get(col)?.get(row)
    }

    pub fn cell_at(&self, point: Point) -> Option<&Cell> {
        let (ix, iy) = self.cell_for_point(point)?;
        Some(&self.cells[ix as usize][iy as usize])
    }

    pub fn is_blocked(&self, point: Point) -> bool {
        self.cell_at(point)
            .map(|cell| cell.weight == OBSTACLE_WEIGHT)
            .unwrap_or(false)
    }

    /// Top-left corner of a cell.
    pub fn cell_origin(&self, col: usize, row: usize) -> Point {
        Point::new(
            self.bbox.min_x + col as f32 * self.step,
            self.bbox.min_y + row as f32 * self.step,
        )
    }

    pub fn obstacle_cells(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| cell.weight == OBSTACLE_WEIGHT)
            .count()
    }

    pub fn visited_cells(&self) -> usize {
        self.cells.iter().flatten().filter(|cell| cell.visited == 1).count()
    }

    /// Marks every cell intersected by `bbox` as non-traversable.
    pub fn add_obstacle(&mut self, bbox: &BoundingBox) {
        let start_x = ((bbox.min_x - self.bbox.min_x) / self.step).floor().max(0.0) as i32;
        let end_x = (((bbox.max_x - self.bbox.min_x) / self.step).ceil() as i32 - 1).min(self.cols - 1);
        let start_y = ((bbox.min_y - self.bbox.min_y) / self.step).floor().max(0.0) as i32;
        let end_y = (((bbox.max_y - self.bbox.min_y) / self.step).ceil() as i32 - 1).min(self.rows - 1);
        for ix in start_x..=end_x {
            for iy in start_y..=end_y {
                self.cells[ix as usize][iy as usize].weight = OBSTACLE_WEIGHT;
            }
        }
    }

    fn cell_for_point(&self, point: Point) -> Option<(i32, i32)> {
        let ix = ((point.x - self.bbox.min_x) / self.step).floor() as i32;
        let iy = ((point.y - self.bbox.min_y) / self.step).floor() as i32;
        if ix < 0 || iy < 0 || ix >= self.cols || iy >= self.rows {
            return None;
        }
        Some((ix, iy))
    }

    fn cell_center(&self, ix: i32, iy: i32) -> Point {
        Point::new(
            self.bbox.min_x + (ix as f32 + 0.5) * self.step,
            self.bbox.min_y + (iy as f32 + 0.5) * self.step,
        )
    }

    fn blocked(&self, ix: i32, iy: i32) -> bool {
        self.cells[ix as usize][iy as usize].weight == OBSTACLE_WEIGHT
    }

    fn state_index(&self, state: GridState) -> usize {
        ((state.x * self.rows + state.y) as usize) * 4 + state.dir.index()
    }

    /// Finds an orthogonal path between two connectors.
    ///
    /// `source_dir` is the side the link leaves from and `target_dir` the
    /// side it enters. The returned points start one step outside the
    /// source and end one step outside the target; the connector points
    /// themselves are not included. Falls back to a plain elbow when the
    /// grid offers no path.
    pub fn route(
        &mut self,
        source: Point,
        source_dir: Direction,
        target: Point,
        target_dir: Direction,
    ) -> Vec<Point> {
        let start = source.offset(source_dir, self.step);
        let end = target.offset(target_dir, self.step);

        if self.config.enable_grid_router
            && let Some(cells) = self.search(start, source_dir, end, target_dir)
        {
            for &(ix, iy) in &cells {
                self.cells[ix as usize][iy as usize].visited = 1;
            }
            tracing::trace!(cells = cells.len(), "routed link on grid");
            return self.cells_to_points(&cells, start, source_dir, end, target_dir);
        }

        tracing::warn!(
            from = ?source,
            to = ?target,
            "no obstacle-free route found, using direct elbow"
        );
        elbow(start, source_dir, end)
    }

    fn search(
        &self,
        start: Point,
        source_dir: Direction,
        end: Point,
        target_dir: Direction,
    ) -> Option<Vec<(i32, i32)>> {
        let (start_ix, start_iy) = self.cell_for_point(start)?;
        let (end_ix, end_iy) = self.cell_for_point(end)?;
        if start_ix == end_ix && start_iy == end_iy {
            return Some(vec![(start_ix, start_iy)]);
        }

        let turn_penalty = (self.config.turn_penalty.max(0.0) * STEP_COST as f32).round() as u32;
        let arrive_dir = target_dir.opposite();
        let states = (self.cols * self.rows * 4) as usize;
        let mut best_cost = vec![u32::MAX; states];
        let mut prev: Vec<Option<GridState>> = vec![None; states];
        let mut heap = BinaryHeap::new();

        let origin = GridState {
            x: start_ix,
            y: start_iy,
            dir: source_dir,
        };
        best_cost[self.state_index(origin)] = 0;
        heap.push(GridEntry {
            est: 0,
            cost: 0,
            state: origin,
        });

        let mut end_state = None;
        let mut steps = 0usize;
        while let Some(GridEntry { cost, state, .. }) = heap.pop() {
            steps += 1;
            if steps > self.config.max_steps {
                break;
            }
            if cost != best_cost[self.state_index(state)] {
                continue;
            }
            if state.x == end_ix && state.y == end_iy {
                end_state = Some(state);
                break;
            }
            for dir in Direction::ALL {
                let (dx, dy) = dir.delta();
                let nx = state.x + dx;
                let ny = state.y + dy;
                if nx < 0 || ny < 0 || nx >= self.cols || ny >= self.rows {
                    continue;
                }
                let is_goal = nx == end_ix && ny == end_iy;
                if !is_goal && self.blocked(nx, ny) {
                    continue;
                }
                let mut next_cost = cost.saturating_add(STEP_COST);
                if state.dir != dir {
                    next_cost = next_cost.saturating_add(turn_penalty);
                }
                if is_goal && dir != arrive_dir {
                    next_cost = next_cost.saturating_add(turn_penalty);
                }
                let next = GridState {
                    x: nx,
                    y: ny,
                    dir,
                };
                let next_idx = self.state_index(next);
                if next_cost >= best_cost[next_idx] {
                    continue;
                }
                best_cost[next_idx] = next_cost;
                prev[next_idx] = Some(state);
                let manhattan = (nx - end_ix).unsigned_abs() + (ny - end_iy).unsigned_abs();
                heap.push(GridEntry {
                    est: next_cost.saturating_add(manhattan.saturating_mul(STEP_COST)),
                    cost: next_cost,
                    state: next,
                });
            }
        }

        let mut cur = end_state?;
        let mut cells = vec![(cur.x, cur.y)];
        while let Some(prev_state) = prev[self.state_index(cur)] {
            cells.push((prev_state.x, prev_state.y));
            cur = prev_state;
        }
        cells.reverse();
        Some(cells)
    }

    fn cells_to_points(
        &self,
        cells: &[(i32, i32)],
        start: Point,
        source_dir: Direction,
        end: Point,
        target_dir: Direction,
    ) -> Vec<Point> {
        let centers: Vec<Point> = cells
            .iter()
            .map(|&(ix, iy)| self.cell_center(ix, iy))
            .collect();
        let mut bends = compress_path(&centers);
        let last = bends.len() - 1;
        if last == 0 {
            return elbow(start, source_dir, end);
        }
        // Runs stay inside their row/column, so sliding them onto the stub
        // axis never leaves the cells the search went through.
        snap_run(&mut bends, 0, 1, start, source_dir);
        if last > 1 {
            snap_run(&mut bends, last, last - 1, end, target_dir);
        }

        let mut points = Vec::with_capacity(bends.len() + 4);
        points.push(start);
        points.push(align(start, bends[0], source_dir));
        points.extend(bends.iter().copied());
        points.push(align(end, bends[last], target_dir));
        points.push(end);
        compress_path(&points)
    }
}

fn snap_run(bends: &mut [Point], at: usize, next: usize, anchor: Point, dir: Direction) {
    let horizontal_run = (bends[at].y - bends[next].y).abs() <= 1e-4;
    if dir.is_horizontal() && horizontal_run {
        bends[at].y = anchor.y;
        bends[next].y = anchor.y;
    } else if !dir.is_horizontal() && !horizontal_run {
        bends[at].x = anchor.x;
        bends[next].x = anchor.x;
    }
}

/// Projects `center` onto the axis leaving `anchor` along `dir`.
fn align(anchor: Point, center: Point, dir: Direction) -> Point {
    if dir.is_horizontal() {
        Point::new(center.x, anchor.y)
    } else {
        Point::new(anchor.x, center.y)
    }
}

fn elbow(start: Point, source_dir: Direction, end: Point) -> Vec<Point> {
    let corner = if source_dir.is_horizontal() {
        Point::new(end.x, start.y)
    } else {
        Point::new(start.x, end.y)
    };
    compress_path(&[start, corner, end])
}

pub fn compress_path(points: &[Point]) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let same = |a: Point, b: Point| (a.x - b.x).abs() <= 1e-4 && (a.y - b.y).abs() <= 1e-4;
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    out.push(points[0]);
    for idx in 1..points.len() - 1 {
        let prev = out[out.len() - 1];
        let curr = points[idx];
        if same(curr, prev) {
            continue;
        }
        let next = points[idx + 1];
        let dx1 = curr.x - prev.x;
        let dy1 = curr.y - prev.y;
        let dx2 = next.x - curr.x;
        let dy2 = next.y - curr.y;
        if (dx1.abs() <= 1e-4 && dx2.abs() <= 1e-4) || (dy1.abs() <= 1e-4 && dy2.abs() <= 1e-4) {
            continue;
        }
        out.push(curr);
    }
    let last = points[points.len() - 1];
    if !same(last, out[out.len() - 1]) {
        out.push(last);
    }
    out
}
