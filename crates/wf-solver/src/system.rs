//! The nonlinear system interface.

use nalgebra::DVector;
use sprs::CsMat;
use wf_aml::Model;

use crate::error::SolverResult;

/// A square system F(x) = 0 whose state lives inside the implementor.
pub trait NonlinearSystem {
    fn get_x(&self) -> DVector<f64>;
    fn load_x(&mut self, x: &DVector<f64>) -> SolverResult<()>;
    fn residuals(&self) -> SolverResult<DVector<f64>>;
    fn jacobian(&self) -> SolverResult<CsMat<f64>>;
}

impl NonlinearSystem for Model {
    fn get_x(&self) -> DVector<f64> {
        Model::get_x(self)
    }

    fn load_x(&mut self, x: &DVector<f64>) -> SolverResult<()> {
        Ok(self.load_var_values_from_x(x)?)
    }

    fn residuals(&self) -> SolverResult<DVector<f64>> {
        Ok(self.evaluate_residuals()?)
    }

    fn jacobian(&self) -> SolverResult<CsMat<f64>> {
        Ok(self.evaluate_jacobian()?)
    }
}
