//! Damped Newton-Raphson solver for square nonlinear systems.
//!
//! The solver works against the [`NonlinearSystem`] interface, which the
//! algebraic [`wf_aml::Model`] implements. The simulation loop talks to it
//! through [`StepSolver`] so alternative solvers can be injected.

pub mod error;
pub mod newton;
pub mod system;

pub use error::{SolverError, SolverResult};
pub use newton::{NewtonConfig, NewtonResult, NewtonSolver, StepSolver, newton_solve};
pub use system::NonlinearSystem;
