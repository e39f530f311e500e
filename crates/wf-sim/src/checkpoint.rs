//! Serializable snapshot of a paused simulator.

use serde::{Deserialize, Serialize};
use wf_controls::ControlConflict;
use wf_network::SimulationState;
use wf_results::HydraulicResults;

use crate::report::SimPhase;

/// Everything needed to continue a run later, tied to its inputs by a
/// content fingerprint of the network and controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub fingerprint: String,
    pub phase: SimPhase,
    pub state: SimulationState,
    pub results: HydraulicResults,
    pub backoffs: u64,
    pub conflicts: Vec<ControlConflict>,
    /// Set when the run failed: (time, reason).
    pub failure: Option<(f64, String)>,
}
