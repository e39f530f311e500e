//! Algebraic modeling layer for waterflow.
//!
//! A [`Model`] owns named scalar variables, parameters and constraints. A
//! constraint is an [`Expr`] tree whose partial derivatives are computed
//! analytically, so the Jacobian is exact. After [`Model::set_structure`] the
//! constraint-to-variable incidence is frozen into a CSR pattern and the model
//! can be evaluated any number of times at different variable values:
//!
//! ```
//! use wf_aml::{Expr, Model};
//!
//! let mut model = Model::new();
//! let x = model.add_var("x", 1.0).unwrap();
//! let y = model.add_var("y", 1.0).unwrap();
//! model.add_constraint("parabola", Expr::var(y) - Expr::var(x).powf(2.0)).unwrap();
//! model.add_constraint("line", Expr::var(y) - Expr::var(x) - 1.0).unwrap();
//! model.set_structure().unwrap();
//!
//! let r = model.evaluate_residuals().unwrap();
//! assert_eq!(r.len(), 2);
//! let j = model.evaluate_jacobian().unwrap();
//! assert_eq!(j.nnz(), 4);
//! ```

pub mod error;
pub mod expr;
pub mod model;

pub use error::{AmlError, AmlResult};
pub use expr::{EvalContext, Expr, ParamId, ScalarFn, VarId};
pub use model::{Constraint, Model, Parameter, Variable};
