//! Time patterns: piecewise-constant multipliers that repeat.

use serde::{Deserialize, Serialize};
use wf_core::PatternId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: PatternId,
    pub name: String,
    pub multipliers: Vec<f64>,
}

impl Pattern {
    /// Multiplier in effect at `time_s`. An empty pattern is a constant 1.
    pub fn multiplier_at(&self, time_s: f64, step_s: f64) -> f64 {
        if self.multipliers.is_empty() {
            return 1.0;
        }
        let period = (time_s.max(0.0) / step_s).floor() as usize;
        self.multipliers[period % self.multipliers.len()]
    }
}

/// First pattern boundary strictly after `time_s`.
pub fn next_boundary(time_s: f64, step_s: f64) -> f64 {
    ((time_s / step_s).floor() + 1.0) * step_s
}
