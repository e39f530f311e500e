//! Run phases and reports.

use serde::{Deserialize, Serialize};
use wf_controls::ControlConflict;
use wf_results::RunStatus;

/// Where the simulation loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SimPhase {
    /// Nothing solved yet; the next step solves at t = 0.
    #[default]
    Initializing,
    Stepping,
    /// Last step converged and was committed.
    Converged,
    /// Last attempt failed and the timestep was halved.
    Backoff,
    /// A run budget ended before the duration; calling run again resumes.
    Paused,
    Finished,
    /// A step failed at the minimum timestep. Terminal until reset.
    Failed,
}

impl SimPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, SimPhase::Finished | SimPhase::Failed)
    }
}

/// Outcome of one `run`/`run_for` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub phase: SimPhase,
    /// Simulation time reached.
    pub time_s: f64,
    /// Committed steps since the start of the run, including t = 0.
    pub steps: u64,
    /// Timestep halvings since the start of the run.
    pub backoffs: u64,
    /// Control conflicts since the start of the run.
    pub conflicts: Vec<ControlConflict>,
}
