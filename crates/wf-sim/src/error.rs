//! Error types for simulation runs.

use thiserror::Error;
use wf_aml::AmlError;
use wf_controls::ControlError;
use wf_hydraulics::HydraulicsError;
use wf_results::ResultsError;
use wf_solver::SolverError;

/// Errors that stop a run immediately.
///
/// Convergence failures are not among them: those trigger timestep
/// back-off and, past the minimum timestep, end up in the run report.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Hydraulic assembly error: {0}")]
    Hydraulics(#[from] HydraulicsError),

    #[error("Model structure error: {0}")]
    Model(#[from] AmlError),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Control error: {0}")]
    Control(#[from] ControlError),

    #[error("Results error: {0}")]
    Results(#[from] ResultsError),

    #[error("Checkpoint belongs to another network (expected {expected}, found {found})")]
    FingerprintMismatch { expected: String, found: String },
}

pub type SimResult<T> = Result<T, SimError>;
