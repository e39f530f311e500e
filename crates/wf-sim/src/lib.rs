//! Extended-period simulation of pressurized networks.
//!
//! [`HydraulicSimulator`] steps a [`wf_network::Network`] through time. Each
//! step advances tank levels from the last committed flows, applies the
//! controls whose conditions hold, assembles and solves the hydraulic
//! equations, and re-solves while automatic statuses change. A step that
//! does not converge is retried with half the timestep; below the minimum
//! timestep the run stops and the report says so.
//!
//! Runs can be paused (`run_for`), reset, checkpointed and resumed.
//! [`run_ensemble`] runs independent scenarios in parallel.

pub mod checkpoint;
pub mod ensemble;
pub mod error;
pub mod report;
pub mod simulator;

pub use checkpoint::Checkpoint;
pub use ensemble::{Scenario, ScenarioReport, run_ensemble};
pub use error::{SimError, SimResult};
pub use report::{RunReport, SimPhase};
pub use simulator::HydraulicSimulator;
pub use wf_results::RunStatus;
