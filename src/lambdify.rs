//! Compilation of symbolic coefficients into batch evaluable numeric functions.
//!
//! A [`NumericFn`] binds every free symbol of an expression to a parameter slot.
//! Arguments are either constants or batches over mesh entities,
//! constants broadcast against batches.

use crate::{
  symbolic::{builtins, Expr, Func, Rational, Symbol},
  Error, Result,
};

use num_traits::ToPrimitive;
use std::fmt;

/// Numeric value: a constant or a batch over entities.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Const(f64),
  Batch(na::DVector<f64>),
}

impl Value {
  pub fn map(self, f: impl Fn(f64) -> f64) -> Value {
    match self {
      Value::Const(c) => Value::Const(f(c)),
      Value::Batch(b) => Value::Batch(b.map(f)),
    }
  }

  /// Elementwise combination with broadcasting of constants.
  pub fn zip_map(self, other: Value, f: impl Fn(f64, f64) -> f64) -> Result<Value> {
    Ok(match (self, other) {
      (Value::Const(a), Value::Const(b)) => Value::Const(f(a, b)),
      (Value::Const(a), Value::Batch(b)) => Value::Batch(b.map(|b| f(a, b))),
      (Value::Batch(a), Value::Const(b)) => Value::Batch(a.map(|a| f(a, b))),
      (Value::Batch(a), Value::Batch(b)) => {
        if a.len() != b.len() {
          return Err(Error::Shape(format!(
            "batches of length {} and {} do not match",
            a.len(),
            b.len()
          )));
        }
        Value::Batch(a.zip_map(&b, f))
      }
    })
  }

  /// Values for a batch of `n` entities.
  pub fn broadcast(self, n: usize) -> Result<na::DVector<f64>> {
    match self {
      Value::Const(c) => Ok(na::DVector::from_element(n, c)),
      Value::Batch(b) if b.len() == n => Ok(b),
      Value::Batch(b) => Err(Error::Shape(format!(
        "expected batch of length {n}, got {}",
        b.len()
      ))),
    }
  }
}

impl From<f64> for Value {
  fn from(c: f64) -> Self {
    Value::Const(c)
  }
}
impl From<na::DVector<f64>> for Value {
  fn from(b: na::DVector<f64>) -> Self {
    Value::Batch(b)
  }
}

#[derive(Debug, Clone)]
enum Node {
  Const(f64),
  Param(usize),
  Add(Vec<Node>),
  Mul(Vec<Node>),
  Powi(Box<Node>, i32),
  Unary(fn(f64) -> f64, Box<Node>),
}

impl Node {
  fn eval(&self, args: &[Value]) -> Result<Value> {
    match self {
      Node::Const(c) => Ok(Value::Const(*c)),
      Node::Param(i) => Ok(args[*i].clone()),
      Node::Add(terms) => terms.iter().try_fold(Value::Const(0.0), |acc, t| {
        acc.zip_map(t.eval(args)?, |a, b| a + b)
      }),
      Node::Mul(factors) => factors.iter().try_fold(Value::Const(1.0), |acc, f| {
        acc.zip_map(f.eval(args)?, |a, b| a * b)
      }),
      Node::Powi(base, exp) => {
        let exp = *exp;
        Ok(base.eval(args)?.map(|v| v.powi(exp)))
      }
      Node::Unary(f, arg) => Ok(arg.eval(args)?.map(f)),
    }
  }
}

/// Compiled numeric function of named parameters.
#[derive(Clone)]
pub struct NumericFn {
  params: Vec<Symbol>,
  root: Node,
  source: Expr,
}

impl NumericFn {
  /// Compiles `expr` as a function of `params`.
  ///
  /// Inner products of vector literals are evaluated,
  /// every other vector is a shape error.
  pub fn compile(expr: &Expr, params: &[Symbol]) -> Result<Self> {
    if let Some(unbound) = expr.free_symbols().into_iter().find(|s| !params.contains(s)) {
      return Err(Error::UnboundSymbol(unbound.to_string()));
    }
    let root = compile_node(expr, params)?;
    Ok(Self {
      params: params.to_vec(),
      root,
      source: expr.clone(),
    })
  }

  /// The value if the function does not depend on its parameters.
  pub fn as_const(&self) -> Option<f64> {
    match self.root {
      Node::Const(c) => Some(c),
      _ => None,
    }
  }

  pub fn eval(&self, args: &[Value]) -> Result<Value> {
    if args.len() != self.params.len() {
      return Err(Error::Shape(format!(
        "`{}` takes {} arguments, got {}",
        self.source,
        self.params.len(),
        args.len()
      )));
    }
    self.root.eval(args)
  }

  /// Evaluates and broadcasts to a batch of `n` entities.
  pub fn eval_batch(&self, args: &[Value], n: usize) -> Result<na::DVector<f64>> {
    self.eval(args)?.broadcast(n)
  }
}

impl fmt::Debug for NumericFn {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NumericFn")
      .field("params", &self.params)
      .field("source", &self.source.to_string())
      .finish()
  }
}

fn compile_node(expr: &Expr, params: &[Symbol]) -> Result<Node> {
  let node = match expr {
    Expr::Num(c) => Node::Const(to_f64(c, expr)?),
    Expr::Sym(s) => match params.iter().position(|p| p == s) {
      Some(i) => Node::Param(i),
      None => return Err(Error::UnboundSymbol(s.to_string())),
    },
    Expr::Add(terms) => Node::Add(compile_all(terms, params)?),
    Expr::Mul(factors) => Node::Mul(compile_all(factors, params)?),
    Expr::Pow(base, exp) if base.is_zero() && *exp < 0 => {
      return Err(Error::unsupported(expr, "division by zero"))
    }
    Expr::Pow(base, exp) => {
      let exp = i32::try_from(*exp)
        .map_err(|_| Error::unsupported(expr, "exponent out of range"))?;
      Node::Powi(Box::new(compile_node(base, params)?), exp)
    }
    Expr::Vector(_) => {
      return Err(Error::Shape(format!(
        "vector `{expr}` where a scalar coefficient was expected"
      )))
    }
    Expr::Call(Func::Dot, args) => match args.as_slice() {
      [Expr::Vector(a), Expr::Vector(b)] if a.len() == b.len() => Node::Add(
        a.iter()
          .zip(b)
          .map(|(a, b)| {
            Ok(Node::Mul(vec![
              compile_node(a, params)?,
              compile_node(b, params)?,
            ]))
          })
          .collect::<Result<_>>()?,
      ),
      _ => {
        return Err(Error::Shape(format!(
          "`{expr}` needs two vectors of equal length"
        )))
      }
    },
    Expr::Call(Func::NDotGrad, _) => {
      return Err(Error::unsupported(
        expr,
        "normal derivative is only defined on edge integrals",
      ))
    }
    Expr::Call(Func::Named(name), args) => match (builtins::lookup(name), args.as_slice()) {
      (Some(builtin), [arg]) => Node::Unary(builtin.eval, Box::new(compile_node(arg, params)?)),
      _ => return Err(Error::UnknownFunction(name.clone())),
    },
  };
  Ok(fold_constants(node))
}

fn to_f64(c: &Rational, expr: &Expr) -> Result<f64> {
  let value = match (c.numer().to_f64(), c.denom().to_f64()) {
    (Some(numer), Some(denom)) => numer / denom,
    _ => f64::NAN,
  };
  if value.is_finite() {
    Ok(value)
  } else {
    Err(Error::unsupported(expr, "constant out of floating point range"))
  }
}

fn compile_all(exprs: &[Expr], params: &[Symbol]) -> Result<Vec<Node>> {
  exprs.iter().map(|e| compile_node(e, params)).collect()
}

/// Collapses nodes whose operands are all constant.
fn fold_constants(node: Node) -> Node {
  let consts = |nodes: &[Node]| -> Option<Vec<f64>> {
    nodes
      .iter()
      .map(|n| match n {
        Node::Const(c) => Some(*c),
        _ => None,
      })
      .collect()
  };
  match node {
    Node::Add(terms) => match consts(&terms) {
      Some(cs) => Node::Const(cs.iter().sum()),
      None => Node::Add(terms),
    },
    Node::Mul(factors) => match consts(&factors) {
      Some(cs) => Node::Const(cs.iter().product()),
      None => Node::Mul(factors),
    },
    Node::Powi(base, exp) => match *base {
      Node::Const(c) => Node::Const(c.powi(exp)),
      base => Node::Powi(Box::new(base), exp),
    },
    Node::Unary(f, arg) => match *arg {
      Node::Const(c) => Node::Const(f(c)),
      arg => Node::Unary(f, Box::new(arg)),
    },
    node => node,
  }
}
