use tracing::debug;

use super::geometry::Rect;

/// Source of monitor geometry, already converted to the normalized frame.
///
/// Monitor numbers handed to users are 1-based positions in this list.
pub trait Display {
    fn monitors(&self) -> Vec<Rect>;

    fn monitor_count(&self) -> usize { self.monitors().len() }
}

/// A fixed monitor list, typically read from the config file.
#[derive(Debug, Clone, Default)]
pub struct StaticDisplay {
    monitors: Vec<Rect>,
}

impl StaticDisplay {
    pub fn new(monitors: Vec<Rect>) -> Self { StaticDisplay { monitors } }

    /// Replaces the monitor list, e.g. after a monitor was unplugged.
    pub fn set_monitors(&mut self, monitors: Vec<Rect>) {
        debug!(count = monitors.len(), "Monitor list replaced");
        self.monitors = monitors;
    }
}

impl Display for StaticDisplay {
    fn monitors(&self) -> Vec<Rect> { self.monitors.clone() }

    fn monitor_count(&self) -> usize { self.monitors.len() }
}
