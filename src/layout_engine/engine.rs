use tracing::{debug, instrument, trace, warn};

use super::deal::{DealStrategy, DealStrategyKind};
use super::occupation::compute_occupation;
use super::strategy::{LayoutStrategy, LayoutStrategyKind};
use crate::common::config::Settings;
use crate::model::WindowEntry;
use crate::sys::geometry::{Rect, SameAs};
use crate::sys::window_server::{WindowHandle, WindowServer};

/// Where each window of a group goes, in assignment order.
pub type Placements = Vec<(WindowHandle, Rect)>;

/// Tiles one group's windows over every monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutEngine {
    strategy: LayoutStrategyKind,
    deal: DealStrategyKind,
}

impl LayoutEngine {
    pub fn new(strategy: LayoutStrategyKind, deal: DealStrategyKind) -> Self {
        LayoutEngine { strategy, deal }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.layout_mode.into(), settings.deal_mode.into())
    }

    pub fn strategy(&self) -> &LayoutStrategyKind { &self.strategy }

    pub fn deal_strategy(&self) -> &DealStrategyKind { &self.deal }

    /// Positions the visible windows of a group and optionally focuses them.
    ///
    /// Hidden windows are skipped entirely and docked ones keep their slot
    /// without being moved. Returns the full plan, docked windows included.
    #[instrument(level = "debug", skip_all, fields(windows = windows.len(), monitors = monitors.len()))]
    pub fn layout_group<W: WindowServer + ?Sized>(
        &self,
        windows: &[WindowEntry],
        monitors: &[Rect],
        activate: bool,
        server: &mut W,
    ) -> Placements {
        let visible: Vec<WindowEntry> =
            windows.iter().filter(|w| server.is_visible(w.handle)).cloned().collect();
        if visible.len() != windows.len() {
            debug!(hidden = windows.len() - visible.len(), "Skipping hidden windows");
        }
        let plan = self.plan_group(&visible, monitors);
        self.apply(&plan, activate, server);
        plan
    }

    /// Positions `windows` on one monitor, in order.
    pub fn layout_screen<W: WindowServer + ?Sized>(
        &self,
        windows: &[WindowHandle],
        monitor: Rect,
        activate: bool,
        server: &mut W,
    ) -> Placements {
        let plan = self.plan_screen(windows, monitor);
        self.apply(&plan, activate, server);
        plan
    }

    fn apply<W: WindowServer + ?Sized>(&self, plan: &Placements, activate: bool, server: &mut W) {
        let mut positioned = Vec::with_capacity(plan.len());
        for &(handle, frame) in plan {
            if server.is_docked(handle) {
                trace!(%handle, "Window is docked; leaving it in place");
                continue;
            }
            if server.frame(handle).is_some_and(|current| current.same_as(frame)) {
                positioned.push(handle);
                continue;
            }
            match server.set_frame(handle, frame) {
                Ok(()) => positioned.push(handle),
                Err(e) => warn!(%handle, "Failed to position window: {e}"),
            }
        }
        if activate {
            for handle in positioned {
                server.focus(handle);
            }
        }
    }

    /// Computes where every window of a group goes without touching any
    /// window.
    ///
    /// Windows pinned to a monitor that no longer exists join the unpinned
    /// pool for this layout only.
    pub fn plan_group(&self, windows: &[WindowEntry], monitors: &[Rect]) -> Placements {
        if windows.is_empty() {
            return Vec::new();
        }
        if monitors.is_empty() {
            warn!("No monitors to lay windows out on");
            return Vec::new();
        }

        let mut pinned: Vec<Vec<WindowHandle>> = vec![Vec::new(); monitors.len()];
        let mut unpinned: Vec<WindowHandle> = Vec::new();
        for window in windows {
            match window.pinned_monitor as usize {
                0 => unpinned.push(window.handle),
                m if m <= monitors.len() => pinned[m - 1].push(window.handle),
                m => {
                    debug!(handle = %window.handle, monitor = m, "Pinned monitor is gone; dealing window freely");
                    unpinned.push(window.handle);
                }
            }
        }

        let pinned_counts: Vec<usize> = pinned.iter().map(Vec::len).collect();
        let table = compute_occupation(unpinned.len(), &pinned_counts, monitors, &self.strategy);
        let Some(choice) = self.deal.select(&table) else {
            warn!(unpinned = unpinned.len(), ?pinned_counts, "No feasible deal");
            return Vec::new();
        };
        debug!(deal = ?choice.deal, occupation = choice.occupation, "Chose deal");

        let mut pool = unpinned.into_iter();
        let mut plan = Vec::with_capacity(windows.len());
        for ((monitor, mut assigned), &share) in monitors.iter().zip(pinned).zip(&choice.deal) {
            assigned.extend(pool.by_ref().take(share));
            plan.extend(self.plan_screen(&assigned, *monitor));
        }
        plan
    }

    /// Grid placement on one monitor.
    ///
    /// Window `k` lands in column `k mod cols`, row `k div cols`, so the last
    /// row may be short; columns with fewer windows split their height among
    /// fewer rows. Row 0 is the top of the monitor.
    pub fn plan_screen(&self, windows: &[WindowHandle], monitor: Rect) -> Placements {
        let n = windows.len();
        if n == 0 {
            return Vec::new();
        }
        let grid = self.strategy.grid(n, monitor.width, monitor.height);
        let cols = grid.cols;

        windows
            .iter()
            .enumerate()
            .map(|(k, &handle)| {
                let col = k % cols;
                let row = k / cols;
                let rows_in_col = (n - col).div_ceil(cols);

                let x0 = (col as f64 * monitor.width / cols as f64).floor();
                let x1 = ((col + 1) as f64 * monitor.width / cols as f64).floor();
                let band = |i: usize| (i as f64 * monitor.height / rows_in_col as f64).floor();
                let y0 = band(rows_in_col - row - 1);
                let y1 = band(rows_in_col - row);

                (handle, Rect::new(monitor.x + x0, monitor.y + y0, x1 - x0, y1 - y0))
            })
            .collect()
    }
}
