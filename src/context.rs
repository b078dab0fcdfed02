//! Names of the symbols shared between discretization, compilation and evaluation.
//!
//! One context is threaded through a whole compilation.

use crate::{
  form::{Field, Point},
  symbolic::{Expr, Symbol},
};

#[derive(Debug, Clone)]
pub struct SymbolContext {
  dim: usize,
  field: Field,
}

impl SymbolContext {
  pub fn new(dim: usize, field: Field) -> Self {
    Self { dim, field }
  }

  /// The unknown.
  pub fn field(&self) -> &Field {
    &self.field
  }

  fn components(&self, prefix: &str) -> Vec<Symbol> {
    (0..self.dim)
      .map(|i| Symbol::new(format!("{prefix}_{i}")))
      .collect()
  }
  fn vector(&self, prefix: &str) -> Expr {
    Expr::vector(self.components(prefix).into_iter().map(Expr::from).collect())
  }

  /// Generic point with abstract normal.
  pub fn point(&self) -> Point {
    let coords = self.components("x").into_iter().map(Expr::from);
    let normal = self.components("n").into_iter().map(Expr::from);
    Point::new(coords.zip(normal))
  }
  pub fn x(&self) -> Expr {
    self.vector("x")
  }
  pub fn normal(&self) -> Expr {
    self.vector("n")
  }
  pub fn coord_symbols(&self) -> Vec<Symbol> {
    self.components("x")
  }
  pub fn normal_symbols(&self) -> Vec<Symbol> {
    self.components("n")
  }

  /// Position of edge endpoint `k`, for `k` in `{0, 1}`.
  pub fn endpoint(&self, k: usize) -> Expr {
    self.vector(&format!("x{k}"))
  }
  pub fn endpoint_symbols(&self, k: usize) -> Vec<Symbol> {
    self.components(&format!("x{k}"))
  }

  pub fn edge_length(&self) -> Symbol {
    Symbol::new("edge_length")
  }
  pub fn edge_ce_ratio(&self) -> Symbol {
    Symbol::new("edge_ce_ratio")
  }
  pub fn control_volume(&self) -> Symbol {
    Symbol::new("control_volume")
  }
  pub fn surface_area(&self) -> Symbol {
    Symbol::new("surface_area")
  }

  /// Value symbols of `f` at the two edge endpoints.
  pub fn edge_values(&self, f: &Field) -> (Symbol, Symbol) {
    (
      Symbol::new(format!("{f}_k0")),
      Symbol::new(format!("{f}_k1")),
    )
  }
  /// Value symbol of `f` at a single vertex.
  pub fn vertex_value(&self, f: &Field) -> Symbol {
    Symbol::new(format!("{f}_k0"))
  }

  /// Arguments of edge coefficient functions.
  pub fn edge_params(&self) -> Vec<Symbol> {
    let mut params = self.endpoint_symbols(0);
    params.extend(self.endpoint_symbols(1));
    params.push(self.edge_ce_ratio());
    params.push(self.edge_length());
    params
  }
  /// Arguments of vertex coefficient functions.
  pub fn vertex_params(&self) -> Vec<Symbol> {
    let mut params = vec![self.control_volume()];
    params.extend(self.coord_symbols());
    params
  }
  /// Arguments of face coefficient functions.
  pub fn face_params(&self) -> Vec<Symbol> {
    let mut params = vec![self.surface_area()];
    params.extend(self.coord_symbols());
    params
  }
  /// Arguments of Dirichlet coefficient functions.
  pub fn dirichlet_params(&self) -> Vec<Symbol> {
    self.coord_symbols()
  }
}
