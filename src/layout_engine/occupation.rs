//! Enumeration of every way to deal the unpinned pool across monitors.
//!
//! For each feasible deal the search records how much of the screens the
//! resulting grids cover (the product of the per-monitor coverage ratios)
//! and the cell area every monitor ends up with. Monitor counts are small, so
//! the search is exhaustive; only infeasible branches are cut.

use tracing::{trace, warn};

use super::strategy::{LayoutStrategy, LayoutStrategyKind};
use crate::sys::geometry::Rect;

/// Coverage above 1 by more than this is an internal inconsistency.
const OCCUPATION_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct DealCandidate {
    /// Unpinned windows handed to each monitor.
    pub deal: Vec<usize>,
    /// Pinned plus dealt windows per monitor.
    pub windows: Vec<usize>,
    pub occupation: f64,
    /// Cell area per monitor, 0 for monitors left empty.
    pub areas: Vec<f64>,
}

impl DealCandidate {
    pub fn min_area(&self) -> f64 { self.areas.iter().copied().fold(f64::INFINITY, f64::min) }

    pub fn max_area(&self) -> f64 { self.areas.iter().copied().fold(0.0, f64::max) }

    /// Total screen area covered by windows across all monitors.
    pub fn covered_area(&self) -> f64 {
        self.areas.iter().zip(&self.windows).map(|(area, &count)| area * count as f64).sum()
    }
}

struct Search<'a> {
    pinned: &'a [usize],
    monitors: &'a [Rect],
    strategy: &'a LayoutStrategyKind,
    deal: Vec<usize>,
    windows: Vec<usize>,
    areas: Vec<f64>,
    out: Vec<DealCandidate>,
}

impl Search<'_> {
    fn visit(&mut self, monitor: usize, remaining: usize, occupation: f64) {
        let Some(rect) = self.monitors.get(monitor) else {
            let stranded = self.pinned.get(monitor..).is_some_and(|rest| rest.iter().any(|&c| c > 0));
            if remaining == 0 && !stranded {
                self.out.push(DealCandidate {
                    deal: self.deal.clone(),
                    windows: self.windows.clone(),
                    occupation,
                    areas: self.areas.clone(),
                });
            }
            return;
        };
        let pinned = self.pinned.get(monitor).copied().unwrap_or(0);

        for n in 0..=remaining {
            let total = n + pinned;
            let (area, ratio) = if total == 0 {
                (0.0, 1.0)
            } else {
                let grid = self.strategy.grid(total, rect.width, rect.height);
                let area = grid.cell_area();
                (area, monitor_occupation(monitor, area, total, rect))
            };

            self.deal.push(n);
            self.windows.push(total);
            self.areas.push(area);
            self.visit(monitor + 1, remaining - n, occupation * ratio);
            self.deal.pop();
            self.windows.pop();
            self.areas.pop();
        }
    }
}

fn monitor_occupation(monitor: usize, cell_area: f64, windows: usize, rect: &Rect) -> f64 {
    let screen = rect.area();
    if screen <= 0.0 {
        warn!(monitor, ?rect, "Monitor has no area; treating its occupation as 0");
        return 0.0;
    }
    let ratio = cell_area * windows as f64 / screen;
    if ratio > 1.0 + OCCUPATION_TOLERANCE {
        warn!(monitor, ratio, windows, "Grid covers more than its monitor; using 0 instead");
        return 0.0;
    }
    ratio
}

/// Lists every feasible deal of `unpinned` windows over `monitors`, given the
/// windows already pinned to each monitor.
///
/// Candidates come out ordered by the first monitor's share, then the
/// second's, and so on. The table is empty when no deal is feasible, e.g.
/// when windows are pinned past the end of the monitor list.
pub fn compute_occupation(
    unpinned: usize,
    pinned: &[usize],
    monitors: &[Rect],
    strategy: &LayoutStrategyKind,
) -> Vec<DealCandidate> {
    let mut search = Search {
        pinned,
        monitors,
        strategy,
        deal: Vec::with_capacity(monitors.len()),
        windows: Vec::with_capacity(monitors.len()),
        areas: Vec::with_capacity(monitors.len()),
        out: Vec::new(),
    };
    search.visit(0, unpinned, 1.0);
    trace!(unpinned, ?pinned, candidates = search.out.len(), "Occupation search done");
    search.out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn square(x: f64) -> Rect { Rect::new(x, 0.0, 1000.0, 1000.0) }

    #[test]
    fn pinned_only_leaves_second_monitor_empty() {
        let monitors = [square(0.0), square(1000.0)];
        let table = compute_occupation(0, &[2, 0], &monitors, &LayoutStrategyKind::default());

        assert_eq!(table, vec![DealCandidate {
            deal: vec![0, 0],
            windows: vec![2, 0],
            occupation: 1.0,
            areas: vec![500_000.0, 0.0],
        }]);
    }

    #[test]
    fn enumerates_every_split_in_order() {
        let monitors = [square(0.0), square(1000.0)];
        let table = compute_occupation(4, &[0, 0], &monitors, &LayoutStrategyKind::default());

        let deals: Vec<_> = table.iter().map(|c| c.deal.clone()).collect();
        assert_eq!(deals, vec![vec![0, 4], vec![1, 3], vec![2, 2], vec![3, 1], vec![4, 0]]);

        // Three windows on a square monitor form a 2x2 grid with one hole.
        assert_eq!(table[1].occupation, 0.75);
        assert_eq!(table[1].areas, vec![1_000_000.0, 250_000.0]);
        assert_eq!(table[2].occupation, 1.0);
        assert_eq!(table[2].areas, vec![500_000.0, 500_000.0]);
    }

    #[test]
    fn pinned_counts_add_to_dealt_windows() {
        let monitors = [square(0.0), square(1000.0)];
        let table = compute_occupation(1, &[1, 2], &monitors, &LayoutStrategyKind::default());

        assert_eq!(table.len(), 2);
        assert_eq!(table[0].windows, vec![1, 3]);
        assert_eq!(table[1].windows, vec![2, 2]);
    }

    #[test]
    fn stranded_pinned_windows_are_infeasible() {
        let monitors = [square(0.0)];
        let table = compute_occupation(1, &[0, 1], &monitors, &LayoutStrategyKind::default());
        assert!(table.is_empty());
    }

    #[test]
    fn no_monitors_and_no_windows_is_a_single_empty_deal() {
        let table = compute_occupation(0, &[], &[], &LayoutStrategyKind::default());
        assert_eq!(table.len(), 1);
        assert!(table[0].deal.is_empty());
        assert_eq!(table[0].occupation, 1.0);

        assert!(compute_occupation(2, &[], &[], &LayoutStrategyKind::default()).is_empty());
    }

    #[test]
    fn degenerate_monitor_contributes_zero_occupation() {
        let monitors = [Rect::new(0.0, 0.0, 0.0, 1000.0)];
        let table = compute_occupation(1, &[0], &monitors, &LayoutStrategyKind::default());
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].occupation, 0.0);
    }

    #[test]
    fn covered_area_weights_cells_by_window_count() {
        let candidate = DealCandidate {
            deal: vec![1, 3],
            windows: vec![1, 3],
            occupation: 0.75,
            areas: vec![1_000_000.0, 250_000.0],
        };
        assert_eq!(candidate.covered_area(), 1_750_000.0);
        assert_eq!(candidate.min_area(), 250_000.0);
        assert_eq!(candidate.max_area(), 1_000_000.0);
    }
}
