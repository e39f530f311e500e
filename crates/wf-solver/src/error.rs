//! Error types for solver operations.

use thiserror::Error;
use wf_aml::AmlError;

/// Errors raised while solving a nonlinear system.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Newton did not converge in {iterations} iterations (residual {residual:e})")]
    MaxIterationsExceeded { iterations: usize, residual: f64 },

    #[error("Line search stalled at iteration {iteration} (residual {residual:e})")]
    LineSearchStalled { iteration: usize, residual: f64 },

    #[error("Singular Jacobian at iteration {iteration}")]
    SingularJacobian { iteration: usize },

    #[error("Non-finite residual at iteration {iteration}")]
    NonFiniteResidual { iteration: usize },

    #[error("Model error: {0}")]
    Model(#[from] AmlError),
}

impl SolverError {
    /// Convergence failures may succeed with a smaller timestep; structural
    /// model errors never do.
    pub fn is_convergence_failure(&self) -> bool {
        !matches!(self, SolverError::Model(_))
    }
}

pub type SolverResult<T> = Result<T, SolverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(SolverError::SingularJacobian { iteration: 0 }.is_convergence_failure());
        assert!(!SolverError::Model(AmlError::StructureNotSet).is_convergence_failure());
    }
}
