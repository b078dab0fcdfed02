//! Embedded builder API for weak forms.
//!
//! A PDE is given as a list of [`Integral`]s, each pairing an integrand
//! (a function from a symbolic [`Point`] to an expression) with a [`Measure`],
//! plus optional [`DirichletCondition`]s.

use crate::{
  symbolic::{Expr, Func},
  Error,
};

use std::{cell::Cell, fmt, rc::Rc, str::FromStr, sync::Arc};

/// Integration measure of an integral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measure {
  /// `dS`: surface of a control volume, one contribution per edge.
  ControlVolumeSurface,
  /// `dV`: a control volume, one contribution per vertex.
  ControlVolume,
  /// `dGamma`: the boundary, one contribution per boundary face.
  BoundarySurface,
}

impl Measure {
  pub fn tag(&self) -> &'static str {
    match self {
      Measure::ControlVolumeSurface => "dS",
      Measure::ControlVolume => "dV",
      Measure::BoundarySurface => "dGamma",
    }
  }
}

impl FromStr for Measure {
  type Err = Error;
  fn from_str(tag: &str) -> Result<Self, Self::Err> {
    match tag {
      "dS" => Ok(Measure::ControlVolumeSurface),
      "dV" => Ok(Measure::ControlVolume),
      "dGamma" => Ok(Measure::BoundarySurface),
      other => Err(Error::UnknownMeasure(other.to_string())),
    }
  }
}

impl fmt::Display for Measure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.tag())
  }
}

/// Subset of mesh entities an integral or a boundary condition applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Subdomain {
  #[default]
  Everywhere,
  Boundary,
  Named(String),
}

impl Subdomain {
  pub fn named(name: impl Into<String>) -> Self {
    Self::Named(name.into())
  }
}

impl fmt::Display for Subdomain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Subdomain::Everywhere => f.write_str("everywhere"),
      Subdomain::Boundary => f.write_str("boundary"),
      Subdomain::Named(name) => f.write_str(name),
    }
  }
}

/// Symbolic point an integrand is evaluated at.
///
/// Carries the coordinate vector and the outward unit normal,
/// both as vector literals of symbols.
/// Coordinates asked for beyond the dimension are recorded
/// and reported by [`Point::check_access`].
#[derive(Debug, Clone)]
pub struct Point {
  coords: Vec<Expr>,
  normal: Vec<Expr>,
  out_of_range: Rc<Cell<Option<usize>>>,
}

impl Point {
  /// Point from pairs of coordinate and normal components.
  pub fn new(components: impl IntoIterator<Item = (Expr, Expr)>) -> Self {
    let (coords, normal) = components.into_iter().unzip();
    Self {
      coords,
      normal,
      out_of_range: Rc::default(),
    }
  }
  /// The position vector.
  pub fn x(&self) -> Expr {
    Expr::vector(self.coords.clone())
  }
  /// $x_i$, or zero after recording the access if `i` is out of range.
  pub fn coord(&self, i: usize) -> Expr {
    match self.coords.get(i) {
      Some(c) => c.clone(),
      None => {
        if self.out_of_range.get().is_none() {
          self.out_of_range.set(Some(i));
        }
        Expr::zero()
      }
    }
  }
  /// Fails if a coordinate beyond the dimension was asked for.
  pub fn check_access(&self) -> crate::Result<()> {
    match self.out_of_range.get() {
      Some(i) => Err(Error::Shape(format!(
        "coordinate {i} of a {}-dimensional point",
        self.coords.len()
      ))),
      None => Ok(()),
    }
  }
  /// The unit normal vector.
  pub fn normal(&self) -> Expr {
    Expr::vector(self.normal.clone())
  }
  /// The same point with opposite normal.
  pub fn flipped(&self) -> Point {
    Point {
      coords: self.coords.clone(),
      normal: self.normal.iter().map(|n| -n.clone()).collect(),
      out_of_range: Rc::clone(&self.out_of_range),
    }
  }
}

/// Handle to a scalar field, such as the unknown.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
  name: String,
}

impl Field {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into() }
  }
  pub fn name(&self) -> &str {
    &self.name
  }
  /// $f(p)$
  pub fn at(&self, p: Expr) -> Expr {
    Expr::call(self.name.clone(), [p])
  }
  /// $f(x)$ for the position of `p`.
  pub fn sample(&self, p: &Point) -> Expr {
    self.at(p.x())
  }
  /// Whether `e` is an application of this field.
  pub fn is_applied_in(&self, e: &Expr) -> bool {
    matches!(e, Expr::Call(Func::Named(name), _) if *name == self.name)
  }
}

impl fmt::Display for Field {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.name)
  }
}

/// Inner product.
pub fn dot(a: Expr, b: Expr) -> Expr {
  Expr::apply(Func::Dot, vec![a, b])
}

/// Normal derivative $n dot nabla f$ of a field sample $f(x)$.
pub fn n_dot_grad(f: Expr) -> Expr {
  Expr::apply(Func::NDotGrad, vec![f])
}

pub type Integrand = Arc<dyn Fn(&Point) -> Expr + Send + Sync>;

#[derive(Clone)]
pub struct Integral {
  integrand: Integrand,
  measure: Measure,
  subdomains: Vec<Subdomain>,
}

impl Integral {
  pub fn new(integrand: Integrand, measure: Measure) -> Self {
    Self {
      integrand,
      measure,
      subdomains: vec![Subdomain::Everywhere],
    }
  }

  /// Restricts the integral to the given subdomains.
  pub fn on(mut self, subdomains: impl IntoIterator<Item = Subdomain>) -> Self {
    self.subdomains = subdomains.into_iter().collect();
    if self.subdomains.is_empty() {
      self.subdomains.push(Subdomain::Everywhere);
    }
    self
  }

  pub fn measure(&self) -> Measure {
    self.measure
  }
  pub fn subdomains(&self) -> &[Subdomain] {
    &self.subdomains
  }
  pub fn eval(&self, p: &Point) -> Expr {
    (self.integrand)(p)
  }
}

impl fmt::Debug for Integral {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Integral")
      .field("measure", &self.measure)
      .field("subdomains", &self.subdomains)
      .finish_non_exhaustive()
  }
}

/// $integral f(x) dif mu$
pub fn integrate<F>(f: F, measure: Measure) -> Integral
where
  F: Fn(&Point) -> Expr + Send + Sync + 'static,
{
  Integral::new(Arc::new(f), measure)
}

/// Like [`integrate`], with the measure given by its tag (`dS`, `dV`, `dGamma`).
pub fn integrate_tagged<F>(f: F, tag: &str) -> crate::Result<Integral>
where
  F: Fn(&Point) -> Expr + Send + Sync + 'static,
{
  Ok(integrate(f, tag.parse()?))
}

/// Essential boundary condition $g(u(x), x) = 0$ on a subdomain.
///
/// The condition is linear in the field sample.
/// It fixes the vertex value to `-affine / linear`.
#[derive(Clone)]
pub struct DirichletCondition {
  condition: Integrand,
  subdomain: Subdomain,
}

impl DirichletCondition {
  pub fn new<F>(condition: F, subdomain: Subdomain) -> Self
  where
    F: Fn(&Point) -> Expr + Send + Sync + 'static,
  {
    Self {
      condition: Arc::new(condition),
      subdomain,
    }
  }
  pub fn subdomain(&self) -> &Subdomain {
    &self.subdomain
  }
  pub fn eval(&self, p: &Point) -> Expr {
    (self.condition)(p)
  }
}

impl fmt::Debug for DirichletCondition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DirichletCondition")
      .field("subdomain", &self.subdomain)
      .finish_non_exhaustive()
  }
}

/// A linear PDE in weak form.
pub trait PdeProblem: Sync {
  fn apply(&self, u: &Field) -> Vec<Integral>;
  fn dirichlet(&self, _u: &Field) -> Vec<DirichletCondition> {
    Vec::new()
  }
}

impl<F> PdeProblem for F
where
  F: Fn(&Field) -> Vec<Integral> + Sync,
{
  fn apply(&self, u: &Field) -> Vec<Integral> {
    self(u)
  }
}
