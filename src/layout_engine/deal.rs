//! Choosing one deal out of the occupation table.
//!
//! All policies share the same dichotomy on an acceptability level in
//! `[0, 1]`. At a given level a candidate is acceptable when it covers at
//! least `level` of the screens and its area metric is within
//! `(1 - level)^2` of the best metric in the table. The level climbs while
//! several candidates remain acceptable and falls back when none do; the
//! policies differ in their area metric and in how they break the final tie.

use enum_dispatch::enum_dispatch;
use tracing::trace;

use super::occupation::DealCandidate;
use crate::common::config::DealMode;

const LEVEL_PRECISION: f64 = 0.005;

#[enum_dispatch]
pub trait DealStrategy {
    /// Area metric maximized by the dichotomy.
    fn metric(&self, candidate: &DealCandidate) -> f64;

    /// Picks among the candidates that survived the dichotomy. `survivors`
    /// is never empty and keeps table order.
    fn tie_break<'a>(&self, survivors: &[&'a DealCandidate]) -> &'a DealCandidate;

    fn select<'a>(&self, candidates: &'a [DealCandidate]) -> Option<&'a DealCandidate> {
        match candidates {
            [] => None,
            [only] => Some(only),
            _ => {
                let survivors = dichotomy(candidates, |c| self.metric(c));
                Some(self.tie_break(&survivors))
            }
        }
    }
}

fn dichotomy<'a>(
    candidates: &'a [DealCandidate],
    metric: impl Fn(&DealCandidate) -> f64,
) -> Vec<&'a DealCandidate> {
    let metrics: Vec<f64> = candidates.iter().map(&metric).collect();
    let best = metrics.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut survivors: Vec<&DealCandidate> = candidates.iter().collect();
    let (mut low, mut high) = (0.0_f64, 1.0_f64);
    loop {
        let level = (low + high) / 2.0;
        let slack = (1.0 - level).powi(2) * best;
        let acceptable: Vec<&DealCandidate> = candidates
            .iter()
            .zip(&metrics)
            .filter(|(c, m)| c.occupation >= level && best - **m < slack)
            .map(|(c, _)| c)
            .collect();
        trace!(level, acceptable = acceptable.len(), "Deal dichotomy step");

        let count = acceptable.len();
        if count > 0 {
            survivors = acceptable;
        }
        if count == 1 || high - low < LEVEL_PRECISION {
            break;
        }
        if count == 0 {
            high = level;
        } else {
            low = level;
        }
    }
    survivors
}

/// Picks the first `survivor` minimizing `key`; ties keep table order.
fn first_min_by<'a>(
    survivors: &[&'a DealCandidate],
    key: impl Fn(&DealCandidate) -> f64,
) -> &'a DealCandidate {
    let mut best = survivors[0];
    let mut best_key = key(best);
    for &candidate in &survivors[1..] {
        let k = key(candidate);
        if k < best_key {
            best = candidate;
            best_key = k;
        }
    }
    best
}

/// Smallest monitor cell area as the metric, first survivor wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FirstFit;

impl DealStrategy for FirstFit {
    fn metric(&self, candidate: &DealCandidate) -> f64 { candidate.min_area() }

    fn tie_break<'a>(&self, survivors: &[&'a DealCandidate]) -> &'a DealCandidate {
        survivors[0]
    }
}

/// Covered area as the metric, the survivor with the largest smallest cell
/// wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaxMinArea;

impl DealStrategy for MaxMinArea {
    fn metric(&self, candidate: &DealCandidate) -> f64 { candidate.covered_area() }

    fn tie_break<'a>(&self, survivors: &[&'a DealCandidate]) -> &'a DealCandidate {
        first_min_by(survivors, |c| -c.min_area())
    }
}

/// Covered area as the metric, the survivor whose cell areas are the most
/// even across monitors wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Balanced;

impl DealStrategy for Balanced {
    fn metric(&self, candidate: &DealCandidate) -> f64 { candidate.covered_area() }

    fn tie_break<'a>(&self, survivors: &[&'a DealCandidate]) -> &'a DealCandidate {
        first_min_by(survivors, |c| c.max_area() - c.min_area())
    }
}

#[enum_dispatch(DealStrategy)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealStrategyKind {
    FirstFit(FirstFit),
    MaxMinArea(MaxMinArea),
    Balanced(Balanced),
}

impl Default for DealStrategyKind {
    fn default() -> Self { DealStrategyKind::Balanced(Balanced) }
}

impl From<DealMode> for DealStrategyKind {
    fn from(mode: DealMode) -> Self {
        match mode {
            DealMode::FirstFit => FirstFit.into(),
            DealMode::MaxMinArea => MaxMinArea.into(),
            DealMode::Balanced => Balanced.into(),
        }
    }
}
