//! Newton solver with backtracking line search.

use nalgebra::{DMatrix, DVector};
use sprs::CsMat;
use tracing::{debug, trace};
use wf_aml::Model;
use wf_core::inf_norm;

use crate::error::{SolverError, SolverResult};
use crate::system::NonlinearSystem;

/// Newton solver configuration.
#[derive(Clone, Copy, Debug)]
pub struct NewtonConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Convergence threshold on max |F|
    pub tolerance: f64,
    /// Maximum step halvings per iteration
    pub max_backtracks: usize,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3000,
            tolerance: 1e-6,
            max_backtracks: 100,
        }
    }
}

/// Newton iteration summary. The converged state is left loaded in the system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewtonResult {
    pub iterations: usize,
    pub residual_inf_norm: f64,
}

fn to_dense(jac: &CsMat<f64>) -> DMatrix<f64> {
    let mut dense = DMatrix::zeros(jac.rows(), jac.cols());
    for (v, (r, c)) in jac.iter() {
        dense[(r, c)] += *v;
    }
    dense
}

/// Solve `F(x) = 0` starting from the system's current state.
///
/// Each iteration solves `J dx = -F` by direct LU and takes the step
/// `x + alpha dx`, halving `alpha` while the 2-norm of the residual does not
/// decrease. On failure the system holds the last accepted iterate.
pub fn newton_solve<S>(system: &mut S, config: &NewtonConfig) -> SolverResult<NewtonResult>
where
    S: NonlinearSystem + ?Sized,
{
    let mut x = system.get_x();
    let mut f = system.residuals()?;

    for iter in 0..config.max_iterations {
        if f.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::NonFiniteResidual { iteration: iter });
        }
        let f_inf = inf_norm(f.as_slice());
        if f_inf < config.tolerance {
            debug!(iterations = iter, residual = f_inf, "newton converged");
            return Ok(NewtonResult {
                iterations: iter,
                residual_inf_norm: f_inf,
            });
        }

        let jac = to_dense(&system.jacobian()?);
        let dx = jac
            .lu()
            .solve(&(-&f))
            .ok_or(SolverError::SingularJacobian { iteration: iter })?;
        if dx.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::SingularJacobian { iteration: iter });
        }

        let f_norm = f.norm();
        let mut alpha = 1.0;
        let mut accepted = None;
        for _ in 0..=config.max_backtracks {
            let x_new: DVector<f64> = &x + alpha * &dx;
            system.load_x(&x_new)?;
            let f_new = system.residuals()?;
            let new_norm = f_new.norm();
            if new_norm.is_finite() && new_norm < f_norm {
                accepted = Some((x_new, f_new));
                break;
            }
            alpha *= 0.5;
        }

        match accepted {
            Some((x_new, f_new)) => {
                trace!(iteration = iter, alpha, residual = f_new.norm(), "newton step");
                x = x_new;
                f = f_new;
            }
            None => {
                system.load_x(&x)?;
                return Err(SolverError::LineSearchStalled {
                    iteration: iter,
                    residual: f_inf,
                });
            }
        }
    }

    let f_inf = inf_norm(f.as_slice());
    if f_inf.is_finite() && f_inf < config.tolerance {
        return Ok(NewtonResult {
            iterations: config.max_iterations,
            residual_inf_norm: f_inf,
        });
    }
    Err(SolverError::MaxIterationsExceeded {
        iterations: config.max_iterations,
        residual: f_inf,
    })
}

/// A solver the simulation loop can drive once per timestep.
pub trait StepSolver: Send {
    /// Solve the model in place. The model's structure must be set.
    fn solve(&self, model: &mut Model) -> SolverResult<NewtonResult>;
}

/// Default [`StepSolver`]: damped Newton-Raphson.
#[derive(Clone, Debug, Default)]
pub struct NewtonSolver {
    pub config: NewtonConfig,
}

impl NewtonSolver {
    pub fn new(config: NewtonConfig) -> Self {
        Self { config }
    }
}

impl StepSolver for NewtonSolver {
    fn solve(&self, model: &mut Model) -> SolverResult<NewtonResult> {
        newton_solve(model, &self.config)
    }
}
