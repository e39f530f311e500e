//! Model container: variables, parameters, constraints and sparsity.

use std::collections::{BTreeSet, HashMap};

use nalgebra::DVector;
use sprs::{CsMat, TriMat};

use crate::error::{AmlError, AmlResult};
use crate::expr::{EvalContext, Expr, ParamId, VarId};

/// A named scalar unknown.
#[derive(Clone, Debug)]
pub struct Variable {
    pub name: String,
    pub value: f64,
}

/// A named scalar held constant during a solve.
#[derive(Clone, Debug)]
pub struct Parameter {
    pub name: String,
    pub value: f64,
}

/// A named residual expression. `vars` is the sorted set of variables the
/// expression references.
#[derive(Clone, Debug)]
pub struct Constraint {
    pub name: String,
    pub expr: Expr,
    vars: Vec<VarId>,
}

impl Constraint {
    /// Variables this constraint depends on, ascending.
    pub fn vars(&self) -> &[VarId] {
        &self.vars
    }
}

/// Frozen incidence pattern in CSR layout.
#[derive(Clone, Debug)]
struct Structure {
    revision: u64,
    indptr: Vec<usize>,
    indices: Vec<usize>,
}

/// Square nonlinear system F(x) = 0 built from expressions.
#[derive(Debug, Default)]
pub struct Model {
    vars: Vec<Variable>,
    params: Vec<Parameter>,
    constraints: Vec<Constraint>,
    var_by_name: HashMap<String, VarId>,
    param_by_name: HashMap<String, ParamId>,
    constraint_by_name: HashMap<String, usize>,
    revision: u64,
    structure: Option<Structure>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.vars
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Register a variable with its initial value.
    pub fn add_var(&mut self, name: impl Into<String>, value: f64) -> AmlResult<VarId> {
        let name = name.into();
        if self.var_by_name.contains_key(&name) {
            return Err(AmlError::DuplicateName {
                kind: "variable",
                name,
            });
        }
        let id = VarId(self.vars.len());
        self.var_by_name.insert(name.clone(), id);
        self.vars.push(Variable { name, value });
        self.revision += 1;
        Ok(id)
    }

    /// Register a parameter.
    pub fn add_param(&mut self, name: impl Into<String>, value: f64) -> AmlResult<ParamId> {
        let name = name.into();
        if self.param_by_name.contains_key(&name) {
            return Err(AmlError::DuplicateName {
                kind: "parameter",
                name,
            });
        }
        let id = ParamId(self.params.len());
        self.param_by_name.insert(name.clone(), id);
        self.params.push(Parameter { name, value });
        Ok(id)
    }

    /// Change a parameter value. Does not invalidate the structure.
    pub fn set_param(&mut self, id: ParamId, value: f64) -> AmlResult<()> {
        let p = self
            .params
            .get_mut(id.0)
            .ok_or(AmlError::UnknownParameterId { index: id.0 })?;
        p.value = value;
        Ok(())
    }

    pub fn param_value(&self, id: ParamId) -> Option<f64> {
        self.params.get(id.0).map(|p| p.value)
    }

    pub fn param_id(&self, name: &str) -> Option<ParamId> {
        self.param_by_name.get(name).copied()
    }

    /// Register a constraint. Its row index is its registration order.
    pub fn add_constraint(&mut self, name: impl Into<String>, expr: Expr) -> AmlResult<usize> {
        let name = name.into();
        if self.constraint_by_name.contains_key(&name) {
            return Err(AmlError::DuplicateName {
                kind: "constraint",
                name,
            });
        }

        let mut vars = BTreeSet::new();
        expr.collect_vars(&mut vars);
        if let Some(bad) = vars.iter().find(|v| v.0 >= self.vars.len()) {
            return Err(AmlError::UnknownVariable {
                constraint: name,
                index: bad.0,
            });
        }
        let mut params = BTreeSet::new();
        expr.collect_params(&mut params);
        if let Some(bad) = params.iter().find(|p| p.0 >= self.params.len()) {
            return Err(AmlError::UnknownParameter {
                constraint: name,
                index: bad.0,
            });
        }

        let row = self.constraints.len();
        self.constraint_by_name.insert(name.clone(), row);
        self.constraints.push(Constraint {
            name,
            expr,
            vars: vars.into_iter().collect(),
        });
        self.revision += 1;
        Ok(row)
    }

    /// Remove a constraint by name. Rows after it shift up by one.
    pub fn remove_constraint(&mut self, name: &str) -> AmlResult<Constraint> {
        let row = self
            .constraint_by_name
            .remove(name)
            .ok_or_else(|| AmlError::UnknownConstraint {
                name: name.to_string(),
            })?;
        let removed = self.constraints.remove(row);
        for idx in self.constraint_by_name.values_mut() {
            if *idx > row {
                *idx -= 1;
            }
        }
        self.revision += 1;
        Ok(removed)
    }

    /// Freeze column order and incidence pattern.
    ///
    /// Fails if the system is not square or a variable appears in no
    /// constraint.
    pub fn set_structure(&mut self) -> AmlResult<()> {
        let n_rows = self.constraints.len();
        let n_cols = self.vars.len();
        if n_rows != n_cols {
            return Err(AmlError::NotSquare {
                constraints: n_rows,
                variables: n_cols,
            });
        }

        let mut used = vec![false; n_cols];
        let mut indptr = Vec::with_capacity(n_rows + 1);
        let mut indices = Vec::new();
        indptr.push(0);
        for c in &self.constraints {
            for v in &c.vars {
                used[v.0] = true;
                indices.push(v.0);
            }
            indptr.push(indices.len());
        }
        if let Some(col) = used.iter().position(|u| !u) {
            return Err(AmlError::UnusedVariable {
                name: self.vars[col].name.clone(),
            });
        }

        self.structure = Some(Structure {
            revision: self.revision,
            indptr,
            indices,
        });
        Ok(())
    }

    fn structure(&self) -> AmlResult<&Structure> {
        let s = self.structure.as_ref().ok_or(AmlError::StructureNotSet)?;
        if s.revision != self.revision {
            return Err(AmlError::StaleStructure);
        }
        Ok(s)
    }

    pub fn has_current_structure(&self) -> bool {
        self.structure().is_ok()
    }

    fn values(&self) -> (Vec<f64>, Vec<f64>) {
        (
            self.vars.iter().map(|v| v.value).collect(),
            self.params.iter().map(|p| p.value).collect(),
        )
    }

    /// Residual vector F(x) at the current variable values.
    pub fn evaluate_residuals(&self) -> AmlResult<DVector<f64>> {
        self.structure()?;
        let (x, p) = self.values();
        let ctx = EvalContext {
            vars: &x,
            params: &p,
        };
        Ok(DVector::from_iterator(
            self.constraints.len(),
            self.constraints.iter().map(|c| c.expr.value(&ctx)),
        ))
    }

    /// Jacobian dF/dx in CSR layout with the frozen sparsity pattern.
    pub fn evaluate_jacobian(&self) -> AmlResult<CsMat<f64>> {
        let s = self.structure()?;
        let (x, p) = self.values();
        let ctx = EvalContext {
            vars: &x,
            params: &p,
        };
        let n = self.vars.len();
        let mut tri = TriMat::with_capacity((n, n), s.indices.len());
        for (row, c) in self.constraints.iter().enumerate() {
            for (k, v) in c.vars.iter().enumerate() {
                debug_assert_eq!(s.indices[s.indptr[row] + k], v.0);
                tri.add_triplet(row, v.0, c.expr.partial(*v, &ctx));
            }
        }
        Ok(tri.to_csr())
    }

    /// Current variable values in column order.
    pub fn get_x(&self) -> DVector<f64> {
        DVector::from_iterator(self.vars.len(), self.vars.iter().map(|v| v.value))
    }

    /// Overwrite every variable value from `x`.
    pub fn load_var_values_from_x(&mut self, x: &DVector<f64>) -> AmlResult<()> {
        if x.len() != self.vars.len() {
            return Err(AmlError::DimensionMismatch {
                expected: self.vars.len(),
                actual: x.len(),
            });
        }
        for (var, &xi) in self.vars.iter_mut().zip(x.iter()) {
            var.value = xi;
        }
        Ok(())
    }

    pub fn var_id(&self, name: &str) -> Option<VarId> {
        self.var_by_name.get(name).copied()
    }

    pub fn var_value(&self, id: VarId) -> Option<f64> {
        self.vars.get(id.0).map(|v| v.value)
    }

    pub fn set_var_value(&mut self, id: VarId, value: f64) -> AmlResult<()> {
        let len = self.vars.len();
        let v = self.vars.get_mut(id.0).ok_or(AmlError::DimensionMismatch {
            expected: len,
            actual: id.0,
        })?;
        v.value = value;
        Ok(())
    }

    pub fn constraint_index(&self, name: &str) -> Option<usize> {
        self.constraint_by_name.get(name).copied()
    }

    /// Residual of a single constraint at the current values.
    pub fn residual_of(&self, name: &str) -> AmlResult<f64> {
        let row = self
            .constraint_index(name)
            .ok_or_else(|| AmlError::UnknownConstraint {
                name: name.to_string(),
            })?;
        let (x, p) = self.values();
        let ctx = EvalContext {
            vars: &x,
            params: &p,
        };
        Ok(self.constraints[row].expr.value(&ctx))
    }
}
