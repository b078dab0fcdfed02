//! Affine/linear/nonlinear decomposition with respect to a set of unknowns.

use super::{Expr, Symbol};
use crate::{Error, Result};

use std::fmt;

/// $e = a + sum_i v_i c_i + r$
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
  pub affine: Expr,
  pub linear: Vec<Expr>,
  pub nonlinear: Expr,
}

/// Single variable version of [`Split`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOne {
  pub affine: Expr,
  pub linear: Expr,
  pub nonlinear: Expr,
}

pub fn split(expr: &Expr, vars: &[Symbol]) -> Split {
  let expanded = expr.expand();

  let affine = independent_of_all(&expanded, vars);
  let linear: Vec<Expr> = vars
    .iter()
    .map(|v| independent_of_all(&expanded.diff(v), vars))
    .collect();

  let captured = Expr::add(
    vars
      .iter()
      .zip(&linear)
      .map(|(v, c)| Expr::from(v.clone()) * c.clone()),
  );
  let nonlinear = (expanded - affine.clone() - captured).expand();

  Split {
    affine,
    linear,
    nonlinear,
  }
}

pub fn split_one(expr: &Expr, var: &Symbol) -> SplitOne {
  let Split {
    affine,
    mut linear,
    nonlinear,
  } = split(expr, std::slice::from_ref(var));
  SplitOne {
    affine,
    linear: linear.pop().unwrap_or_else(Expr::zero),
    nonlinear,
  }
}

/// Takes the coefficient of $v^0$ for every `v` in turn.
fn independent_of_all(expr: &Expr, vars: &[Symbol]) -> Expr {
  vars
    .iter()
    .fold(expr.clone(), |acc, v| acc.coeff_independent(v))
}

impl Split {
  pub fn is_linear(&self) -> bool {
    self.nonlinear.is_zero()
  }

  /// Rejects the split if a nonlinear residual remains.
  pub fn into_linear(self, context: impl fmt::Display) -> Result<Self> {
    if self.is_linear() {
      Ok(self)
    } else {
      Err(Error::NonLinear {
        context: context.to_string(),
        residual: self.nonlinear.to_string(),
      })
    }
  }
}

impl SplitOne {
  pub fn is_linear(&self) -> bool {
    self.nonlinear.is_zero()
  }

  pub fn into_linear(self, context: impl fmt::Display) -> Result<Self> {
    if self.is_linear() {
      Ok(self)
    } else {
      Err(Error::NonLinear {
        context: context.to_string(),
        residual: self.nonlinear.to_string(),
      })
    }
  }
}
