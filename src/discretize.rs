//! Discretization of control volume surface integrals along mesh edges.
//!
//! An integrand over the facet between two control volumes is rewritten
//! into an expression of the two edge endpoints $x_0, x_1$,
//! the edge length and the covolume/edge ratio.
//! Field samples are taken at the endpoints, the midpoint rule covers the rest.

use crate::{
  context::SymbolContext,
  form::{Field, Point},
  symbolic::{Expr, Func, Symbol},
  Error, Result,
};

pub struct EdgeIntegralDiscretizer<'c> {
  ctx: &'c SymbolContext,
  x0: Expr,
  x1: Expr,
  edge_length: Expr,
  edge_ce_ratio: Expr,
}

impl<'c> EdgeIntegralDiscretizer<'c> {
  pub fn new(ctx: &'c SymbolContext) -> Self {
    Self {
      ctx,
      x0: ctx.endpoint(0),
      x1: ctx.endpoint(1),
      edge_length: ctx.edge_length().into(),
      edge_ce_ratio: ctx.edge_ce_ratio().into(),
    }
  }

  /// Discretizes `integrand` on a generic edge.
  ///
  /// Returns the edge local expression together with the
  /// endpoint value symbols $(f_(k_0), f_(k_1))$ of every index function.
  pub fn generate(
    &self,
    integrand: impl Fn(&Point) -> Expr,
    index_functions: &[Field],
  ) -> Result<(Expr, Vec<(Symbol, Symbol)>)> {
    let point = self.ctx.point();
    let x = point.x();
    let expr = integrand(&point);
    point.check_access()?;

    let mut out = self.edge_length.clone() * self.edge_ce_ratio.clone() * self.visit(&expr)?;

    let mut index_vars = Vec::with_capacity(index_functions.len());
    for f in index_functions {
      let (fk0, fk1) = self.ctx.edge_values(f);
      let (fk0e, fk1e): (Expr, Expr) = (fk0.clone().into(), fk1.clone().into());

      // endpoints strictly before the midpoint
      out = out.subs(&[(f.at(self.x0.clone()), fk0e.clone())]);
      out = out.subs(&[(f.at(self.x1.clone()), fk1e.clone())]);
      out = out.subs(&[(f.at(x.clone()), (fk0e + fk1e) / 2)]);

      if let Some(application) = find_application(&out, f) {
        return Err(Error::unsupported(
          application,
          "field must be sampled at the integration point",
        ));
      }
      index_vars.push((fk0, fk1));
    }

    out = out.subs(&self.midpoint_rules());
    out = out.subs(&self.normal_rules());

    Ok((out, index_vars))
  }

  /// $x_i -> (x_(0,i) + x_(1,i))/2$
  fn midpoint_rules(&self) -> Vec<(Expr, Expr)> {
    let x0 = self.ctx.endpoint_symbols(0);
    let x1 = self.ctx.endpoint_symbols(1);
    itertools::izip!(self.ctx.coord_symbols(), x0, x1)
      .map(|(x, a, b)| (x.into(), (Expr::from(a) + Expr::from(b)) / 2))
      .collect()
  }

  /// $n_i -> (x_(1,i) - x_(0,i)) / l$
  fn normal_rules(&self) -> Vec<(Expr, Expr)> {
    let x0 = self.ctx.endpoint_symbols(0);
    let x1 = self.ctx.endpoint_symbols(1);
    itertools::izip!(self.ctx.normal_symbols(), x0, x1)
      .map(|(n, a, b)| {
        (
          n.into(),
          (Expr::from(b) - Expr::from(a)) / self.edge_length.clone(),
        )
      })
      .collect()
  }

  /// Rewrites a node of the integrand tree.
  pub fn visit(&self, node: &Expr) -> Result<Expr> {
    match node {
      Expr::Num(_) | Expr::Sym(_) => Ok(node.clone()),
      Expr::Add(terms) => self.visit_chain(terms, |a, b| a + b),
      Expr::Mul(factors) => self.visit_chain(factors, |a, b| a * b),
      Expr::Pow(base, exp) => Ok(Expr::pow(self.visit(base)?, *exp)),
      Expr::Vector(components) => Ok(Expr::vector(
        components
          .iter()
          .map(|c| self.visit(c))
          .collect::<Result<_>>()?,
      )),
      Expr::Call(func, args) => self.visit_call(node, func, args),
    }
  }

  /// Operators `dot` and `n_dot_grad`, and pointwise functions.
  fn visit_call(&self, node: &Expr, func: &Func, args: &[Expr]) -> Result<Expr> {
    match func {
      Func::Dot => match args {
        [a @ Expr::Vector(_), b @ Expr::Vector(_)] => Ok(Expr::apply(
          Func::Dot,
          vec![self.visit(a)?, self.visit(b)?],
        )),
        _ => Err(Error::unsupported(node, "`dot` takes exactly two vectors")),
      },
      Func::NDotGrad => match args {
        [Expr::Call(Func::Named(f), fargs)] => match fargs.as_slice() {
          [p] if *p == self.ctx.x() => {
            let f = Field::new(f.clone());
            Ok((f.at(self.x1.clone()) - f.at(self.x0.clone())) / self.edge_length.clone())
          }
          _ => Err(Error::unsupported(
            node,
            "`n_dot_grad` needs a field sampled at the integration point",
          )),
        },
        _ => Err(Error::unsupported(
          node,
          "`n_dot_grad` takes exactly one field sample",
        )),
      },
      Func::Named(_) => match args {
        [arg] => Ok(Expr::apply(func.clone(), vec![self.visit(arg)?])),
        _ => Err(Error::unsupported(
          node,
          format!("pointwise function takes one argument, got {}", args.len()),
        )),
      },
    }
  }

  fn visit_chain(&self, operands: &[Expr], op: impl Fn(Expr, Expr) -> Expr) -> Result<Expr> {
    let mut visited = operands.iter().map(|o| self.visit(o));
    let first = match visited.next() {
      Some(first) => first?,
      None => return Err(Error::unsupported(Expr::Add(Vec::new()), "empty chain")),
    };
    visited.try_fold(first, |acc, o| Ok(op(acc, o?)))
  }
}

/// First application of `f` in `expr`, if any.
pub fn find_application<'e>(expr: &'e Expr, f: &Field) -> Option<&'e Expr> {
  if f.is_applied_in(expr) {
    return Some(expr);
  }
  expr.args().iter().find_map(|a| find_application(a, f))
}
