//! Expression trees with analytic derivatives.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::sync::Arc;

/// Handle to a variable registered in a [`crate::Model`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) usize);

impl VarId {
    /// Column of this variable in the flattened state vector.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to a parameter registered in a [`crate::Model`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(pub(crate) usize);

impl ParamId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A smooth scalar function with a known first derivative.
///
/// Used to embed piecewise formulations (headloss, demand curves) into an
/// expression; the chain rule is applied by [`Expr::partial`].
pub trait ScalarFn: Send + Sync + fmt::Debug {
    fn value(&self, x: f64) -> f64;
    fn derivative(&self, x: f64) -> f64;
}

/// Values an expression is evaluated against.
#[derive(Clone, Copy, Debug)]
pub struct EvalContext<'a> {
    pub vars: &'a [f64],
    pub params: &'a [f64],
}

/// Symbolic expression over variables, parameters and constants.
#[derive(Clone, Debug)]
pub enum Expr {
    Const(f64),
    Var(VarId),
    Param(ParamId),
    Sum(Vec<Expr>),
    Product(Box<Expr>, Box<Expr>),
    Quotient(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    /// `base^exponent` with a constant exponent.
    Powf(Box<Expr>, f64),
    Func(Arc<dyn ScalarFn>, Box<Expr>),
}

impl Expr {
    pub fn constant(v: f64) -> Self {
        Expr::Const(v)
    }

    pub fn var(id: VarId) -> Self {
        Expr::Var(id)
    }

    pub fn param(id: ParamId) -> Self {
        Expr::Param(id)
    }

    /// Apply a smooth function to an argument expression.
    pub fn func(f: Arc<dyn ScalarFn>, arg: impl Into<Expr>) -> Self {
        Expr::Func(f, Box::new(arg.into()))
    }

    pub fn powf(self, exponent: f64) -> Self {
        Expr::Powf(Box::new(self), exponent)
    }

    /// Sum of an arbitrary number of terms (empty sum is zero).
    pub fn sum(terms: impl IntoIterator<Item = Expr>) -> Self {
        let terms: Vec<Expr> = terms.into_iter().collect();
        if terms.is_empty() {
            Expr::Const(0.0)
        } else {
            Expr::Sum(terms)
        }
    }

    /// Evaluate the expression.
    pub fn value(&self, ctx: &EvalContext<'_>) -> f64 {
        match self {
            Expr::Const(c) => *c,
            Expr::Var(v) => ctx.vars[v.0],
            Expr::Param(p) => ctx.params[p.0],
            Expr::Sum(terms) => terms.iter().map(|t| t.value(ctx)).sum(),
            Expr::Product(a, b) => a.value(ctx) * b.value(ctx),
            Expr::Quotient(a, b) => a.value(ctx) / b.value(ctx),
            Expr::Neg(a) => -a.value(ctx),
            Expr::Powf(a, e) => a.value(ctx).powf(*e),
            Expr::Func(f, a) => f.value(a.value(ctx)),
        }
    }

    /// Partial derivative with respect to `var`.
    pub fn partial(&self, var: VarId, ctx: &EvalContext<'_>) -> f64 {
        match self {
            Expr::Const(_) | Expr::Param(_) => 0.0,
            Expr::Var(v) => {
                if *v == var {
                    1.0
                } else {
                    0.0
                }
            }
            Expr::Sum(terms) => terms.iter().map(|t| t.partial(var, ctx)).sum(),
            Expr::Product(a, b) => {
                let da = a.partial(var, ctx);
                let db = b.partial(var, ctx);
                let mut d = 0.0;
                if da != 0.0 {
                    d += da * b.value(ctx);
                }
                if db != 0.0 {
                    d += a.value(ctx) * db;
                }
                d
            }
            Expr::Quotient(a, b) => {
                let da = a.partial(var, ctx);
                let db = b.partial(var, ctx);
                if da == 0.0 && db == 0.0 {
                    return 0.0;
                }
                let bv = b.value(ctx);
                (da * bv - a.value(ctx) * db) / (bv * bv)
            }
            Expr::Neg(a) => -a.partial(var, ctx),
            Expr::Powf(a, e) => {
                let da = a.partial(var, ctx);
                if da == 0.0 {
                    0.0
                } else {
                    e * a.value(ctx).powf(e - 1.0) * da
                }
            }
            Expr::Func(f, a) => {
                let da = a.partial(var, ctx);
                if da == 0.0 {
                    0.0
                } else {
                    f.derivative(a.value(ctx)) * da
                }
            }
        }
    }

    /// Collect every variable referenced by the expression.
    pub fn collect_vars(&self, out: &mut BTreeSet<VarId>) {
        self.visit(&mut |e| {
            if let Expr::Var(v) = e {
                out.insert(*v);
            }
        });
    }

    /// Collect every parameter referenced by the expression.
    pub fn collect_params(&self, out: &mut BTreeSet<ParamId>) {
        self.visit(&mut |e| {
            if let Expr::Param(p) = e {
                out.insert(*p);
            }
        });
    }

    fn visit(&self, f: &mut dyn FnMut(&Expr)) {
        f(self);
        match self {
            Expr::Const(_) | Expr::Var(_) | Expr::Param(_) => {}
            Expr::Sum(terms) => terms.iter().for_each(|t| t.visit(f)),
            Expr::Product(a, b) | Expr::Quotient(a, b) => {
                a.visit(f);
                b.visit(f);
            }
            Expr::Neg(a) | Expr::Powf(a, _) | Expr::Func(_, a) => a.visit(f),
        }
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        Expr::Const(v)
    }
}

impl From<VarId> for Expr {
    fn from(v: VarId) -> Self {
        Expr::Var(v)
    }
}

impl From<ParamId> for Expr {
    fn from(p: ParamId) -> Self {
        Expr::Param(p)
    }
}

impl<T: Into<Expr>> Add<T> for Expr {
    type Output = Expr;

    fn add(self, rhs: T) -> Expr {
        match self {
            Expr::Sum(mut terms) => {
                terms.push(rhs.into());
                Expr::Sum(terms)
            }
            lhs => Expr::Sum(vec![lhs, rhs.into()]),
        }
    }
}

impl<T: Into<Expr>> Sub<T> for Expr {
    type Output = Expr;

    fn sub(self, rhs: T) -> Expr {
        self + Expr::Neg(Box::new(rhs.into()))
    }
}

impl<T: Into<Expr>> Mul<T> for Expr {
    type Output = Expr;

    fn mul(self, rhs: T) -> Expr {
        Expr::Product(Box::new(self), Box::new(rhs.into()))
    }
}

impl<T: Into<Expr>> Div<T> for Expr {
    type Output = Expr;

    fn div(self, rhs: T) -> Expr {
        Expr::Quotient(Box::new(self), Box::new(rhs.into()))
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}
