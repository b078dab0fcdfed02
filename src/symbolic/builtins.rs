//! Known pointwise functions of one argument.

use super::Expr;

use once_cell::sync::Lazy;
use std::collections::HashMap;

pub struct Builtin {
  pub eval: fn(f64) -> f64,
  /// Derivative with respect to the argument, evaluated at `a`.
  pub derivative: fn(&Expr) -> Expr,
}

static BUILTINS: Lazy<HashMap<&'static str, Builtin>> = Lazy::new(|| {
  let mut m = HashMap::new();
  m.insert(
    "sin",
    Builtin {
      eval: f64::sin,
      derivative: |a| Expr::call("cos", [a.clone()]),
    },
  );
  m.insert(
    "cos",
    Builtin {
      eval: f64::cos,
      derivative: |a| -Expr::call("sin", [a.clone()]),
    },
  );
  m.insert(
    "tan",
    Builtin {
      eval: f64::tan,
      derivative: |a| Expr::call("cos", [a.clone()]).powi(-2),
    },
  );
  m.insert(
    "exp",
    Builtin {
      eval: f64::exp,
      derivative: |a| Expr::call("exp", [a.clone()]),
    },
  );
  m.insert(
    "log",
    Builtin {
      eval: f64::ln,
      derivative: |a| a.clone().powi(-1),
    },
  );
  m.insert(
    "sqrt",
    Builtin {
      eval: f64::sqrt,
      derivative: |a| Expr::call("sqrt", [a.clone()]).powi(-1) / 2,
    },
  );
  m.insert(
    "sinh",
    Builtin {
      eval: f64::sinh,
      derivative: |a| Expr::call("cosh", [a.clone()]),
    },
  );
  m.insert(
    "cosh",
    Builtin {
      eval: f64::cosh,
      derivative: |a| Expr::call("sinh", [a.clone()]),
    },
  );
  m.insert(
    "tanh",
    Builtin {
      eval: f64::tanh,
      derivative: |a| Expr::call("cosh", [a.clone()]).powi(-2),
    },
  );
  m.insert(
    "abs",
    Builtin {
      eval: f64::abs,
      derivative: |a| Expr::call("sign", [a.clone()]),
    },
  );
  // derivative vanishes almost everywhere
  m.insert(
    "sign",
    Builtin {
      eval: f64::signum,
      derivative: |_| Expr::zero(),
    },
  );
  m
});

pub fn lookup(name: &str) -> Option<&'static Builtin> {
  BUILTINS.get(name)
}
