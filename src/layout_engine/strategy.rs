//! Grid shape selection for a single monitor.
//!
//! Every strategy answers the same question: how many rows should `n`
//! windows be split into on a `width × height` monitor so that the cells come
//! out as close to square as possible. Columns always follow from the row
//! count (`cols = ceil(n / rows)`) and cell sizes are floored to whole units.

use enum_dispatch::enum_dispatch;

use crate::common::config::LayoutMode;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
    pub cell_width: f64,
    pub cell_height: f64,
}

impl Grid {
    /// Builds the grid for an explicit row count. `rows` may exceed `n`, in
    /// which case the grid is a single column of short cells.
    pub fn with_rows(n: usize, rows: usize, width: f64, height: f64) -> Grid {
        let n = n.max(1);
        let rows = rows.max(1);
        let cols = n.div_ceil(rows);
        Grid {
            rows,
            cols,
            cell_width: (width / cols as f64).floor(),
            cell_height: (height / rows as f64).floor(),
        }
    }

    pub fn cell_area(&self) -> f64 { self.cell_width * self.cell_height }

    pub fn capacity(&self) -> usize { self.rows * self.cols }
}

/// `sqrt(cell width / cell height)` on the floored cells; 1 means perfectly
/// square cells. Falls back to the unfloored ratio when a floored side is 0.
fn squareness(n: usize, rows: usize, width: f64, height: f64) -> f64 {
    let grid = Grid::with_rows(n, rows, width, height);
    if grid.cell_width > 0.0 && grid.cell_height > 0.0 {
        return (grid.cell_width / grid.cell_height).sqrt();
    }
    ((width / grid.cols as f64) / (height / grid.rows as f64)).sqrt()
}

/// Real-valued row count giving square cells: `sqrt(height * n / width)`.
pub fn ideal_rows(n: usize, width: f64, height: f64) -> f64 {
    if width <= 0.0 || height <= 0.0 {
        return 1.0;
    }
    (height * n as f64 / width).sqrt()
}

fn floor_ceil_rows(n: usize, width: f64, height: f64) -> (usize, usize) {
    let target = ideal_rows(n, width, height);
    let floor = (target.floor() as usize).max(1);
    let ceil = (target.ceil() as usize).max(1);
    (floor, ceil)
}

#[enum_dispatch]
pub trait LayoutStrategy {
    fn grid(&self, n: usize, width: f64, height: f64) -> Grid;
}

/// Adds rows one at a time until cells stop being taller than wide, then
/// backs off one row if the previous count was closer to square.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GreedyRows;

impl LayoutStrategy for GreedyRows {
    fn grid(&self, n: usize, width: f64, height: f64) -> Grid {
        let n = n.max(1);
        if width <= 0.0 || height <= 0.0 {
            return Grid::with_rows(n, 1, width, height);
        }
        // Past `height / width` rows a single column is already square.
        let limit = n.max((height / width).ceil() as usize) + 1;
        let mut previous: Option<(usize, f64)> = None;
        for rows in 1..=limit {
            let s = squareness(n, rows, width, height);
            if s >= 1.0 {
                let rows = match previous {
                    Some((prev_rows, prev_s)) if (prev_s - 1.0).abs() < (s - 1.0).abs() => {
                        prev_rows
                    }
                    _ => rows,
                };
                return Grid::with_rows(n, rows, width, height);
            }
            previous = Some((rows, s));
        }
        Grid::with_rows(n, limit, width, height)
    }
}

/// Rounds the ideal row count, at least one row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundedRows;

impl LayoutStrategy for RoundedRows {
    fn grid(&self, n: usize, width: f64, height: f64) -> Grid {
        let rows = ideal_rows(n, width, height).round() as usize;
        Grid::with_rows(n, rows, width, height)
    }
}

/// Picks floor or ceil of the ideal row count, whichever has its square
/// nearer to the ideal squared row count. Ties go to the floor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NearestSquareRows;

impl LayoutStrategy for NearestSquareRows {
    fn grid(&self, n: usize, width: f64, height: f64) -> Grid {
        let target = ideal_rows(n, width, height).powi(2);
        let (floor, ceil) = floor_ceil_rows(n, width, height);
        let dist = |rows: usize| ((rows * rows) as f64 - target).powi(2);
        let rows = if dist(ceil) < dist(floor) { ceil } else { floor };
        Grid::with_rows(n, rows, width, height)
    }
}

/// Picks floor or ceil of the ideal row count, whichever gives cells closer
/// to square. Ties go to the floor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SquarestCells;

impl LayoutStrategy for SquarestCells {
    fn grid(&self, n: usize, width: f64, height: f64) -> Grid {
        let (floor, ceil) = floor_ceil_rows(n, width, height);
        let off = |rows: usize| (squareness(n, rows, width, height) - 1.0).abs();
        let rows = if off(ceil) < off(floor) { ceil } else { floor };
        Grid::with_rows(n, rows, width, height)
    }
}

#[enum_dispatch(LayoutStrategy)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutStrategyKind {
    Greedy(GreedyRows),
    Rounded(RoundedRows),
    NearestSquare(NearestSquareRows),
    Squarest(SquarestCells),
}

impl Default for LayoutStrategyKind {
    fn default() -> Self { LayoutStrategyKind::Squarest(SquarestCells) }
}

impl From<LayoutMode> for LayoutStrategyKind {
    fn from(mode: LayoutMode) -> Self {
        match mode {
            LayoutMode::Greedy => GreedyRows.into(),
            LayoutMode::Rounded => RoundedRows.into(),
            LayoutMode::NearestSquare => NearestSquareRows.into(),
            LayoutMode::Squarest => SquarestCells.into(),
        }
    }
}
