//! Tree rewrites: normalization, expansion, substitution and dependence queries.
//!
//! None of these mutate. Each returns a new canonical tree.

use super::{Expr, Func, Symbol};

use std::collections::BTreeSet;

impl Expr {
  /// Rebuilds the tree bottom-up through the canonical constructors.
  pub fn normalize(&self) -> Expr {
    self.rebuild(|e| e.normalize())
  }

  /// Rebuilds this node from rewritten children.
  fn rebuild(&self, mut child: impl FnMut(&Expr) -> Expr) -> Expr {
    match self {
      Expr::Num(_) | Expr::Sym(_) => self.clone(),
      Expr::Add(terms) => Expr::add(terms.iter().map(&mut child)),
      Expr::Mul(factors) => Expr::mul(factors.iter().map(&mut child)),
      Expr::Pow(base, exp) => Expr::pow(child(base.as_ref()), *exp),
      Expr::Vector(components) => Expr::Vector(components.iter().map(&mut child).collect()),
      Expr::Call(func, args) => Expr::apply(func.clone(), args.iter().map(&mut child).collect()),
    }
  }

  /// Fully distributes products over sums and positive integer powers of sums.
  ///
  /// Inner products of two vector literals are evaluated.
  /// The result is a canonical sum of monomials.
  pub fn expand(&self) -> Expr {
    match self {
      Expr::Num(_) | Expr::Sym(_) => self.clone(),
      Expr::Add(terms) => Expr::add(terms.iter().map(Expr::expand)),
      Expr::Mul(factors) => factors
        .iter()
        .map(Expr::expand)
        .fold(Expr::one(), |acc, factor| distribute(&acc, &factor)),
      Expr::Pow(base, exp) => {
        let base = base.expand();
        if *exp > 1 && matches!(base, Expr::Add(_)) {
          (0..*exp).fold(Expr::one(), |acc, _| distribute(&acc, &base))
        } else {
          Expr::pow(base, *exp)
        }
      }
      Expr::Vector(components) => Expr::Vector(components.iter().map(Expr::expand).collect()),
      Expr::Call(Func::Dot, args) => match args.as_slice() {
        [Expr::Vector(a), Expr::Vector(b)] if a.len() == b.len() => {
          let products = a.iter().zip(b).map(|(a, b)| a.clone() * b.clone());
          Expr::add(products).expand()
        }
        _ => self.rebuild(Expr::expand),
      },
      Expr::Call(..) => self.rebuild(Expr::expand),
    }
  }

  /// Simultaneous structural substitution.
  ///
  /// A node equal to some `from` is replaced by its `to`,
  /// and the replacement is not visited again.
  pub fn subs(&self, rules: &[(Expr, Expr)]) -> Expr {
    if let Some((_, to)) = rules.iter().find(|(from, _)| from == self) {
      return to.clone();
    }
    self.rebuild(|e| e.subs(rules))
  }

  /// Whether `target` occurs as a subtree.
  pub fn contains(&self, target: &Expr) -> bool {
    self == target || self.args().iter().any(|a| a.contains(target))
  }

  pub fn has_symbol(&self, symbol: &Symbol) -> bool {
    match self {
      Expr::Sym(s) => s == symbol,
      _ => self.args().iter().any(|a| a.has_symbol(symbol)),
    }
  }

  pub fn free_symbols(&self) -> BTreeSet<Symbol> {
    let mut symbols = BTreeSet::new();
    self.collect_symbols(&mut symbols);
    symbols
  }
  fn collect_symbols(&self, symbols: &mut BTreeSet<Symbol>) {
    match self {
      Expr::Sym(s) => {
        symbols.insert(s.clone());
      }
      _ => self.args().iter().for_each(|a| a.collect_symbols(symbols)),
    }
  }

  /// Terms of an expanded sum.
  pub fn terms(&self) -> &[Expr] {
    match self {
      Expr::Add(terms) => terms,
      _ => std::slice::from_ref(self),
    }
  }

  /// Coefficient of $v^0$: the terms of the expansion that do not depend on `var`.
  pub fn coeff_independent(&self, var: &Symbol) -> Expr {
    let expanded = self.expand();
    Expr::add(
      expanded
        .terms()
        .iter()
        .filter(|t| !t.has_symbol(var))
        .cloned(),
    )
  }
}

fn distribute(a: &Expr, b: &Expr) -> Expr {
  let products = a
    .terms()
    .iter()
    .flat_map(|ta| b.terms().iter().map(move |tb| ta.clone() * tb.clone()));
  Expr::add(products)
}
