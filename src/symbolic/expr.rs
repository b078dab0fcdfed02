//! The expression tree and its canonicalizing constructors.
//!
//! Every constructor returns a tree in canonical form:
//! sums and products are flat, numeric constants are folded,
//! like terms and like factors are combined and operands are sorted.
//! Structural equality therefore coincides with equality up to
//! commutativity, associativity and constant folding.

use super::Rational;

use num_traits::{One, Signed, Zero};
use std::{collections::BTreeMap, fmt, ops};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(String);

impl Symbol {
  pub fn new(name: impl Into<String>) -> Self {
    Self(name.into())
  }
  pub fn name(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Callable heads.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Func {
  /// Inner product of two vector operands.
  Dot,
  /// Derivative in direction of the unit normal of a field sample $f(x)$.
  NDotGrad,
  /// Pointwise function, builtin (`sin`, `exp`, ...) or field (`u`).
  Named(String),
}

impl Func {
  pub fn name(&self) -> &str {
    match self {
      Func::Dot => "dot",
      Func::NDotGrad => "n_dot_grad",
      Func::Named(name) => name,
    }
  }
}

/// Symbolic expression.
///
/// The variant order defines the canonical operand order,
/// which places numeric coefficients first in a product.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Expr {
  Num(Rational),
  Sym(Symbol),
  Add(Vec<Expr>),
  Mul(Vec<Expr>),
  Pow(Box<Expr>, i64),
  Vector(Vec<Expr>),
  Call(Func, Vec<Expr>),
}

// leaf constructors and queries
impl Expr {
  pub fn zero() -> Self {
    Self::Num(Rational::zero())
  }
  pub fn one() -> Self {
    Self::Num(Rational::one())
  }
  pub fn int(n: i64) -> Self {
    Self::Num(Rational::from_integer(n.into()))
  }
  /// $p/q$. A zero denominator stays a symbolic division by zero.
  pub fn ratio(numer: i64, denom: i64) -> Self {
    Self::int(numer) / Self::int(denom)
  }
  pub fn sym(name: impl Into<String>) -> Self {
    Self::Sym(Symbol::new(name))
  }
  pub fn vector(components: Vec<Expr>) -> Self {
    Self::Vector(components)
  }

  pub fn as_num(&self) -> Option<&Rational> {
    match self {
      Self::Num(c) => Some(c),
      _ => None,
    }
  }
  pub fn is_zero(&self) -> bool {
    self.as_num().is_some_and(|c| c.is_zero())
  }
  pub fn is_one(&self) -> bool {
    self.as_num().is_some_and(|c| c.is_one())
  }

  /// Whether a subtree is $0^(-k)$.
  pub fn divides_by_zero(&self) -> bool {
    match self {
      Self::Pow(base, exp) if base.is_zero() && *exp < 0 => true,
      _ => self.args().iter().any(Expr::divides_by_zero),
    }
  }

  /// Direct children of this node.
  pub fn args(&self) -> &[Expr] {
    match self {
      Self::Num(_) | Self::Sym(_) => &[],
      Self::Add(args) | Self::Mul(args) | Self::Vector(args) | Self::Call(_, args) => args,
      Self::Pow(base, _) => std::slice::from_ref(base.as_ref()),
    }
  }
}

// canonicalizing constructors
impl Expr {
  /// Canonical sum of canonical terms.
  pub fn add(terms: impl IntoIterator<Item = Expr>) -> Self {
    let mut constant = Rational::zero();
    let mut collected: BTreeMap<Expr, Rational> = BTreeMap::new();

    let mut stack: Vec<Expr> = terms.into_iter().collect();
    while let Some(term) = stack.pop() {
      match term {
        Self::Num(c) => constant += c,
        Self::Add(inner) => stack.extend(inner),
        term => {
          let (coeff, monomial) = term.into_coeff_monomial();
          *collected.entry(monomial).or_insert_with(Rational::zero) += coeff;
        }
      }
    }

    let mut terms: Vec<Expr> = collected
      .into_iter()
      .filter(|(monomial, coeff)| !coeff.is_zero() || monomial.divides_by_zero())
      .map(|(monomial, coeff)| Self::scaled(coeff, monomial))
      .collect();
    if !constant.is_zero() {
      terms.push(Self::Num(constant));
    }
    terms.sort();

    match terms.len() {
      0 => Self::zero(),
      1 => terms.pop().unwrap_or_else(Self::zero),
      _ => Self::Add(terms),
    }
  }

  /// Canonical product of canonical factors.
  ///
  /// A purely numeric coefficient times a sum is distributed.
  pub fn mul(factors: impl IntoIterator<Item = Expr>) -> Self {
    let mut coeff = Rational::one();
    let mut powers: BTreeMap<Expr, i64> = BTreeMap::new();

    let mut stack: Vec<Expr> = factors.into_iter().collect();
    while let Some(factor) = stack.pop() {
      match factor {
        Self::Num(c) => coeff *= c,
        Self::Mul(inner) => stack.extend(inner),
        Self::Pow(base, exp) => *powers.entry(*base).or_insert(0) += exp,
        factor => *powers.entry(factor).or_insert(0) += 1,
      }
    }
    // $0 dot 0^(-1)$ is not zero
    let singular = powers
      .iter()
      .any(|(base, &exp)| (base.is_zero() && exp < 0) || base.divides_by_zero());
    if coeff.is_zero() && !singular {
      return Self::zero();
    }

    let mut factors = Vec::with_capacity(powers.len());
    for (base, exp) in powers {
      match Self::pow(base, exp) {
        Self::Num(c) => coeff *= c,
        Self::Mul(inner) => {
          for factor in inner {
            match factor {
              Self::Num(c) => coeff *= c,
              factor => factors.push(factor),
            }
          }
        }
        factor => factors.push(factor),
      }
    }
    if coeff.is_zero() && !singular {
      return Self::zero();
    }
    factors.sort();

    if factors.is_empty() {
      return Self::Num(coeff);
    }
    if factors.len() == 1 {
      let factor = factors.pop().unwrap_or_else(Self::one);
      return match factor {
        Self::Add(terms) if !coeff.is_one() => Self::add(
          terms
            .into_iter()
            .map(|t| Self::mul([Self::Num(coeff.clone()), t])),
        ),
        factor => Self::scaled(coeff, factor),
      };
    }
    if !coeff.is_one() {
      factors.insert(0, Self::Num(coeff));
    }
    Self::Mul(factors)
  }

  /// Canonical integer power.
  pub fn pow(base: Expr, exp: i64) -> Self {
    if exp == 0 {
      return Self::one();
    }
    if exp == 1 {
      return base;
    }
    match base {
      Self::Num(c) if c.is_zero() && exp < 0 => Self::Pow(Box::new(Self::Num(c)), exp),
      Self::Num(c) => Self::Num(rational_powi(c, exp)),
      Self::Pow(inner, inner_exp) => Self::pow(*inner, inner_exp * exp),
      Self::Mul(factors) => Self::mul(factors.into_iter().map(|f| Self::pow(f, exp))),
      base => Self::Pow(Box::new(base), exp),
    }
  }

  /// Applies a callable head, evaluating nothing.
  pub fn apply(func: Func, args: Vec<Expr>) -> Self {
    Self::Call(func, args)
  }

  /// Pointwise function call, e.g. `Expr::call("exp", [x])`.
  pub fn call(name: impl Into<String>, args: impl IntoIterator<Item = Expr>) -> Self {
    Self::apply(Func::Named(name.into()), args.into_iter().collect())
  }

  pub fn powi(self, exp: i64) -> Self {
    Self::pow(self, exp)
  }

  /// Splits a canonical non-numeric term into numeric coefficient and monomial.
  fn into_coeff_monomial(self) -> (Rational, Expr) {
    match self {
      Self::Mul(mut factors) => match factors.first() {
        Some(Self::Num(c)) => {
          let c = c.clone();
          factors.remove(0);
          let monomial = if factors.len() == 1 {
            factors.pop().unwrap_or_else(Self::one)
          } else {
            Self::Mul(factors)
          };
          (c, monomial)
        }
        _ => (Rational::one(), Self::Mul(factors)),
      },
      term => (Rational::one(), term),
    }
  }

  /// `coeff * monomial` for a canonical monomial without numeric factor.
  fn scaled(coeff: Rational, monomial: Expr) -> Self {
    if coeff.is_one() {
      return monomial;
    }
    match monomial {
      Self::Mul(mut factors) => {
        factors.insert(0, Self::Num(coeff));
        Self::Mul(factors)
      }
      monomial => Self::Mul(vec![Self::Num(coeff), monomial]),
    }
  }
}

fn rational_powi(base: Rational, exp: i64) -> Rational {
  let mut acc = Rational::one();
  for _ in 0..exp.unsigned_abs() {
    acc *= base.clone();
  }
  if exp < 0 {
    acc.recip()
  } else {
    acc
  }
}

impl From<i64> for Expr {
  fn from(n: i64) -> Self {
    Self::int(n)
  }
}
impl From<i32> for Expr {
  fn from(n: i32) -> Self {
    Self::int(n as i64)
  }
}
impl From<Rational> for Expr {
  fn from(c: Rational) -> Self {
    Self::Num(c)
  }
}
impl From<Symbol> for Expr {
  fn from(s: Symbol) -> Self {
    Self::Sym(s)
  }
}

impl ops::Add for Expr {
  type Output = Expr;
  fn add(self, rhs: Expr) -> Expr {
    Expr::add([self, rhs])
  }
}
impl ops::Sub for Expr {
  type Output = Expr;
  fn sub(self, rhs: Expr) -> Expr {
    Expr::add([self, -rhs])
  }
}
impl ops::Mul for Expr {
  type Output = Expr;
  fn mul(self, rhs: Expr) -> Expr {
    Expr::mul([self, rhs])
  }
}
impl ops::Div for Expr {
  type Output = Expr;
  fn div(self, rhs: Expr) -> Expr {
    Expr::mul([self, Expr::pow(rhs, -1)])
  }
}
impl ops::Neg for Expr {
  type Output = Expr;
  fn neg(self) -> Expr {
    Expr::mul([Expr::int(-1), self])
  }
}

impl ops::Add<i64> for Expr {
  type Output = Expr;
  fn add(self, rhs: i64) -> Expr {
    self + Expr::int(rhs)
  }
}
impl ops::Sub<i64> for Expr {
  type Output = Expr;
  fn sub(self, rhs: i64) -> Expr {
    self + Expr::int(-rhs)
  }
}
impl ops::Mul<i64> for Expr {
  type Output = Expr;
  fn mul(self, rhs: i64) -> Expr {
    self * Expr::int(rhs)
  }
}
impl ops::Mul<Expr> for i64 {
  type Output = Expr;
  fn mul(self, rhs: Expr) -> Expr {
    Expr::int(self) * rhs
  }
}
impl ops::Div<i64> for Expr {
  type Output = Expr;
  fn div(self, rhs: i64) -> Expr {
    self / Expr::int(rhs)
  }
}

impl std::iter::Sum<Expr> for Expr {
  fn sum<I: Iterator<Item = Expr>>(iter: I) -> Self {
    Expr::add(iter)
  }
}

impl fmt::Display for Expr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Num(c) => write!(f, "{c}"),
      Self::Sym(s) => write!(f, "{s}"),
      Self::Add(terms) => {
        for (i, term) in terms.iter().enumerate() {
          let negated = match term {
            Self::Num(c) if c.is_negative() => Some(Self::Num(-c.clone())),
            Self::Mul(factors) => match factors.first() {
              Some(Self::Num(c)) if c.is_negative() => Some(Self::scaled(-c.clone(), Self::mul(factors[1..].to_vec()))),
              _ => None,
            },
            _ => None,
          };
          match (i, negated) {
            (0, Some(t)) => write!(f, "-{}", Paren(&t, Prec::Mul))?,
            (0, None) => write!(f, "{term}")?,
            (_, Some(t)) => write!(f, " - {}", Paren(&t, Prec::Mul))?,
            (_, None) => write!(f, " + {term}")?,
          }
        }
        Ok(())
      }
      Self::Mul(factors) => {
        for (i, factor) in factors.iter().enumerate() {
          if i > 0 {
            f.write_str("*")?;
          }
          write!(f, "{}", Paren(factor, Prec::Mul))?;
        }
        Ok(())
      }
      Self::Pow(base, exp) => write!(f, "{}^{exp}", Paren(base, Prec::Pow)),
      Self::Vector(components) => {
        f.write_str("[")?;
        for (i, c) in components.iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{c}")?;
        }
        f.write_str("]")
      }
      Self::Call(func, args) => {
        write!(f, "{}(", func.name())?;
        for (i, a) in args.iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{a}")?;
        }
        f.write_str(")")
      }
    }
  }
}

#[derive(PartialEq, PartialOrd)]
enum Prec {
  Mul,
  Pow,
}

struct Paren<'a>(&'a Expr, Prec);
impl fmt::Display for Paren<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let needs = match self.0 {
      Expr::Add(_) => true,
      Expr::Num(c) => !c.is_integer() || (self.1 == Prec::Pow && c.is_negative()),
      Expr::Mul(_) | Expr::Pow(..) => self.1 >= Prec::Pow,
      _ => false,
    };
    if needs {
      write!(f, "({})", self.0)
    } else {
      write!(f, "{}", self.0)
    }
  }
}

#[cfg(test)]
mod test {
  use super::Expr;

  #[test]
  fn like_terms_combine() {
    let x = Expr::sym("x");
    let y = Expr::sym("y");
    let e = x.clone() + y.clone() + x.clone() - y.clone();
    assert_eq!(e, Expr::int(2) * x);
  }

  #[test]
  fn like_factors_combine() {
    let x = Expr::sym("x");
    assert_eq!(x.clone() * x.clone(), x.clone().powi(2));
    assert_eq!(x.clone() / x.clone(), Expr::one());
    assert_eq!(x.clone().powi(3) / x.clone().powi(2), x);
  }

  #[test]
  fn order_independent() {
    let a = Expr::sym("a");
    let b = Expr::sym("b");
    let c = Expr::sym("c");
    assert_eq!(
      a.clone() * (b.clone() + c.clone()),
      (c.clone() + b.clone()) * a.clone()
    );
    assert_eq!(a.clone() + b.clone() + c.clone(), c + a + b);
  }

  #[test]
  fn numeric_coefficient_distributes() {
    let a = Expr::sym("a");
    let b = Expr::sym("b");
    let e = Expr::ratio(1, 2) * (a.clone() + b.clone());
    assert_eq!(e, a / 2 + b / 2);
  }

  #[test]
  fn constants_fold_exactly() {
    let e = Expr::ratio(1, 3) + Expr::ratio(1, 6);
    assert_eq!(e, Expr::ratio(1, 2));
    assert_eq!(Expr::ratio(2, 3).powi(-2), Expr::ratio(9, 4));
  }

  #[test]
  fn large_constants_stay_exact() {
    let big = Expr::int(10).powi(20);
    assert_eq!(big.clone() * big.clone(), Expr::int(10).powi(40));
    assert_eq!(big.clone() / big.clone() - 1, Expr::zero());
    assert_eq!(Expr::int(i64::MAX) + 1 - Expr::int(i64::MAX), Expr::one());
  }

  #[test]
  fn division_by_zero_stays_symbolic() {
    let x = Expr::sym("x");
    let inf = Expr::ratio(1, 0);
    assert!(inf.divides_by_zero());
    assert!((x.clone() / 0).divides_by_zero());
    assert!((Expr::zero() * inf.clone()).divides_by_zero());
    assert!((inf.clone() - inf.clone() + x.clone()).divides_by_zero());
    assert!(!(x.clone() / 2).divides_by_zero());
  }

  #[test]
  fn display() {
    let x = Expr::sym("x");
    let y = Expr::sym("y");
    assert_eq!((x.clone() - y.clone()).to_string(), "x - y");
    assert_eq!((x.clone() * y.powi(2)).to_string(), "x*y^2");
    assert_eq!(Expr::call("sin", [x]).to_string(), "sin(x)");
  }
}
