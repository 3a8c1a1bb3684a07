pub mod deal;
pub mod engine;
pub mod occupation;
pub mod strategy;

pub use deal::{Balanced, DealStrategy, DealStrategyKind, FirstFit, MaxMinArea};
pub use engine::{LayoutEngine, Placements};
pub use occupation::{DealCandidate, compute_occupation};
pub use strategy::{
    GreedyRows, Grid, LayoutStrategy, LayoutStrategyKind, NearestSquareRows, RoundedRows,
    SquarestCells,
};

#[cfg(test)]
mod tests;
