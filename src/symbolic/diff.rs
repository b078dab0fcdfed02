//! Exact symbolic differentiation.

use super::{builtins, Expr, Func, Symbol};

impl Expr {
  /// Exact derivative with respect to `var`.
  ///
  /// Known pointwise functions use the chain rule.
  /// An unknown function `f` differentiates to the derivative head `D[f]`
  /// (or `D{i}[f]` for the i-th argument of a multi-argument function).
  pub fn diff(&self, var: &Symbol) -> Expr {
    if !self.has_symbol(var) {
      return match self {
        Expr::Vector(c) => Expr::Vector(vec![Expr::zero(); c.len()]),
        _ => Expr::zero(),
      };
    }

    match self {
      Expr::Num(_) => Expr::zero(),
      Expr::Sym(s) => {
        if s == var {
          Expr::one()
        } else {
          Expr::zero()
        }
      }
      Expr::Add(terms) => Expr::add(terms.iter().map(|t| t.diff(var))),
      Expr::Mul(factors) => Expr::add((0..factors.len()).map(|i| {
        let df = factors[i].diff(var);
        let rest = factors
          .iter()
          .enumerate()
          .filter(|&(j, _)| j != i)
          .map(|(_, f)| f.clone());
        Expr::mul(std::iter::once(df).chain(rest))
      })),
      Expr::Pow(base, exp) => {
        Expr::int(*exp) * Expr::pow(base.as_ref().clone(), exp - 1) * base.diff(var)
      }
      Expr::Vector(components) => Expr::Vector(components.iter().map(|c| c.diff(var)).collect()),
      Expr::Call(Func::Dot, args) => match args.as_slice() {
        [a, b] => {
          let (da, db) = (a.diff(var), b.diff(var));
          let mut terms = Vec::with_capacity(2);
          if !vanishes(&da) {
            terms.push(Expr::apply(Func::Dot, vec![da, b.clone()]));
          }
          if !vanishes(&db) {
            terms.push(Expr::apply(Func::Dot, vec![a.clone(), db]));
          }
          Expr::add(terms)
        }
        _ => derivative_head(self, var),
      },
      Expr::Call(Func::NDotGrad, args) => {
        let dargs: Vec<Expr> = args.iter().map(|a| a.diff(var)).collect();
        if dargs.iter().all(vanishes) {
          Expr::zero()
        } else {
          Expr::apply(Func::NDotGrad, dargs)
        }
      }
      Expr::Call(Func::Named(name), args) => match (builtins::lookup(name), args.as_slice()) {
        (Some(builtin), [a]) => (builtin.derivative)(a) * a.diff(var),
        _ => derivative_head(self, var),
      },
    }
  }
}

/// Chain rule through an unknown function head.
fn derivative_head(call: &Expr, var: &Symbol) -> Expr {
  let Expr::Call(func, args) = call else {
    return Expr::zero();
  };
  let name = func.name();
  if args.len() == 1 {
    return Expr::call(format!("D[{name}]"), args.clone()) * args[0].diff(var);
  }
  Expr::add(args.iter().enumerate().map(|(i, a)| {
    Expr::call(format!("D{i}[{name}]"), args.clone()) * a.diff(var)
  }))
}

fn vanishes(e: &Expr) -> bool {
  match e {
    Expr::Vector(components) => components.iter().all(Expr::is_zero),
    e => e.is_zero(),
  }
}

#[cfg(test)]
mod test {
  use crate::symbolic::{Expr, Symbol};

  #[test]
  fn polynomial() {
    let x = Symbol::new("x");
    let xe = Expr::from(x.clone());
    let e = 3 * xe.clone().powi(3) - 2 * xe.clone() + 7;
    assert_eq!(e.diff(&x), 9 * xe.powi(2) - 2);
  }

  #[test]
  fn product_rule() {
    let x = Symbol::new("x");
    let xe = Expr::from(x.clone());
    let y = Expr::sym("y");
    let e = xe.clone() * y.clone() * Expr::call("sin", [xe.clone()]);
    let expected =
      y.clone() * Expr::call("sin", [xe.clone()]) + xe.clone() * y * Expr::call("cos", [xe]);
    assert_eq!(e.diff(&x), expected);
  }

  #[test]
  fn quotient() {
    let x = Symbol::new("x");
    let xe = Expr::from(x.clone());
    let e = Expr::one() / xe.clone();
    assert_eq!(e.diff(&x), -xe.powi(-2));
  }

  #[test]
  fn chain_rule_through_unknown_function() {
    let x = Symbol::new("x");
    let xe = Expr::from(x.clone());
    let e = Expr::call("k", [xe.clone().powi(2)]);
    assert_eq!(
      e.diff(&x),
      2 * xe.clone() * Expr::call("D[k]", [xe.powi(2)])
    );
  }

  #[test]
  fn independent_is_zero() {
    let x = Symbol::new("x");
    let e = Expr::call("exp", [Expr::sym("y")]) * Expr::sym("z");
    assert!(e.diff(&x).is_zero());
  }
}
