//! Compilation of a linear PDE into kernels.
//!
//! Each integral is discretized according to its measure,
//! split into affine and linear parts with respect to the unknown
//! and rejected if any nonlinear residual remains.
//! Identical symbolic kernels are merged before numeric compilation.

use crate::{
  context::SymbolContext,
  discretize::{find_application, EdgeIntegralDiscretizer},
  form::{DirichletCondition, Field, Integral, Measure, PdeProblem, Point, Subdomain},
  kernel::{
    DirichletKernel, DirichletKernelExpr, EdgeKernel, EdgeKernelExpr, EdgeMatrixKernel, FaceKernel,
    PointKernelExpr, VertexKernel,
  },
  symbolic::{split, split_one, Expr, Symbol},
  Error, Result,
};

use indexmap::IndexSet;
use rayon::prelude::*;

use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CompileOptions {
  /// Spatial dimension of the mesh.
  pub dim: usize,
  /// Name of the unknown field.
  pub field: String,
  /// Discretize integrals on the rayon thread pool.
  pub parallel: bool,
}

impl Default for CompileOptions {
  fn default() -> Self {
    Self {
      dim: 2,
      field: "u".to_string(),
      parallel: true,
    }
  }
}

impl CompileOptions {
  pub fn new(dim: usize) -> Self {
    Self {
      dim,
      ..Default::default()
    }
  }
  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = field.into();
    self
  }
  pub fn with_parallel(mut self, parallel: bool) -> Self {
    self.parallel = parallel;
    self
  }
  pub fn context(&self) -> SymbolContext {
    SymbolContext::new(self.dim, Field::new(self.field.clone()))
  }
}

/// Deduplicated symbolic kernels, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct SymbolicKernels {
  pub edge: IndexSet<EdgeKernelExpr>,
  pub vertex: IndexSet<PointKernelExpr>,
  pub face: IndexSet<PointKernelExpr>,
  pub dirichlet: IndexSet<DirichletKernelExpr>,
}

/// Compiled kernels ready for assembly.
#[derive(Debug, Clone, Default)]
pub struct LinearKernels {
  pub edge: Vec<Arc<dyn EdgeMatrixKernel>>,
  pub vertex: Vec<VertexKernel>,
  pub face: Vec<FaceKernel>,
  pub dirichlet: Vec<DirichletKernel>,
}

impl LinearKernels {
  /// Adds a hand-written edge kernel after the compiled ones.
  pub fn with_edge_kernel(mut self, kernel: impl EdgeMatrixKernel + 'static) -> Self {
    self.edge.push(Arc::new(kernel));
    self
  }
}

enum SymbolicKernel {
  Edge(EdgeKernelExpr),
  Vertex(PointKernelExpr),
  Face(PointKernelExpr),
}

/// Discretizes and compiles `problem` into numeric kernels.
pub fn discretize_linear(
  problem: &impl PdeProblem,
  options: &CompileOptions,
) -> Result<LinearKernels> {
  let ctx = options.context();
  discretize_symbolic(problem, options)?.compile(&ctx)
}

/// Discretizes `problem` into deduplicated symbolic kernels.
pub fn discretize_symbolic(
  problem: &impl PdeProblem,
  options: &CompileOptions,
) -> Result<SymbolicKernels> {
  let ctx = options.context();
  let u = ctx.field().clone();

  let integrals = problem.apply(&u);
  let conditions = problem.dirichlet(&u);
  tracing::debug!(
    "compiling {} integrals and {} dirichlet conditions",
    integrals.len(),
    conditions.len()
  );

  let compiled: Vec<SymbolicKernel> = if options.parallel {
    integrals
      .par_iter()
      .map(|integral| integral_kernel(&ctx, integral))
      .collect::<Result<_>>()?
  } else {
    integrals
      .iter()
      .map(|integral| integral_kernel(&ctx, integral))
      .collect::<Result<_>>()?
  };

  let mut kernels = SymbolicKernels::default();
  for kernel in compiled {
    match kernel {
      SymbolicKernel::Edge(k) => kernels.edge.insert(k),
      SymbolicKernel::Vertex(k) => kernels.vertex.insert(k),
      SymbolicKernel::Face(k) => kernels.face.insert(k),
    };
  }
  for condition in &conditions {
    kernels.dirichlet.insert(dirichlet_kernel(&ctx, condition)?);
  }

  let total = kernels.edge.len() + kernels.vertex.len() + kernels.face.len();
  if total < integrals.len() {
    tracing::debug!("merged {} duplicate kernels", integrals.len() - total);
  }
  Ok(kernels)
}

impl SymbolicKernels {
  pub fn compile(&self, ctx: &SymbolContext) -> Result<LinearKernels> {
    Ok(LinearKernels {
      edge: self
        .edge
        .iter()
        .map(|k| EdgeKernel::compile(k, ctx).map(|k| Arc::new(k) as Arc<dyn EdgeMatrixKernel>))
        .collect::<Result<_>>()?,
      vertex: self
        .vertex
        .iter()
        .map(|k| VertexKernel::compile(k, ctx))
        .collect::<Result<_>>()?,
      face: self
        .face
        .iter()
        .map(|k| FaceKernel::compile(k, ctx))
        .collect::<Result<_>>()?,
      dirichlet: self
        .dirichlet
        .iter()
        .map(|k| DirichletKernel::compile(k, ctx))
        .collect::<Result<_>>()?,
    })
  }
}

fn integral_kernel(ctx: &SymbolContext, integral: &Integral) -> Result<SymbolicKernel> {
  let subdomains = integral.subdomains().to_vec();
  Ok(match integral.measure() {
    Measure::ControlVolumeSurface => SymbolicKernel::Edge(edge_kernel(ctx, integral, subdomains)?),
    Measure::ControlVolume => {
      let (linear, affine) = point_kernel(ctx, integral, ctx.control_volume())?;
      SymbolicKernel::Vertex(PointKernelExpr {
        linear,
        affine,
        subdomains,
      })
    }
    Measure::BoundarySurface => {
      let (linear, affine) = point_kernel(ctx, integral, ctx.surface_area())?;
      SymbolicKernel::Face(PointKernelExpr {
        linear,
        affine,
        subdomains,
      })
    }
  })
}

/// Both orientations of an edge contribution.
fn edge_kernel(
  ctx: &SymbolContext,
  integral: &Integral,
  subdomains: Vec<Subdomain>,
) -> Result<EdgeKernelExpr> {
  let u = ctx.field();
  let (expr, index_vars) =
    EdgeIntegralDiscretizer::new(ctx).generate(|x| integral.eval(x), std::slice::from_ref(u))?;
  let expr = expr.normalize();
  reject_division_by_zero(&expr)?;
  let (uk0, uk1) = index_vars
    .into_iter()
    .next()
    .unwrap_or_else(|| ctx.edge_values(u));
  let vars = [uk0.clone(), uk1.clone()];

  let forward = split(&expr, &vars).into_linear(&expr)?;

  let mut swap: Vec<(Expr, Expr)> = vec![
    (uk0.clone().into(), uk1.clone().into()),
    (uk1.into(), uk0.into()),
  ];
  for (a, b) in ctx.endpoint_symbols(0).into_iter().zip(ctx.endpoint_symbols(1)) {
    swap.push((a.clone().into(), b.clone().into()));
    swap.push((b.into(), a.into()));
  }
  let turned = expr.subs(&swap);
  let backward = split(&turned, &vars).into_linear(&turned)?;

  tracing::trace!("edge integral discretized to {expr}");
  if forward.linear.iter().all(Expr::is_zero) {
    tracing::debug!("edge integral does not depend on `{u}`");
  }

  let [l00, l01]: [Expr; 2] = forward
    .linear
    .try_into()
    .map_err(|_| Error::Shape("edge split needs two coefficients".into()))?;
  let [l10, l11]: [Expr; 2] = backward
    .linear
    .try_into()
    .map_err(|_| Error::Shape("edge split needs two coefficients".into()))?;

  Ok(EdgeKernelExpr {
    linear: [[l00, l01], [l10, l11]],
    affine: [forward.affine, backward.affine],
    subdomains,
  })
}

/// Integrand at the generic point with the field sample replaced by `u_k0`.
fn sample_at_vertex(
  ctx: &SymbolContext,
  integrand: impl Fn(&Point) -> Expr,
) -> Result<(Expr, Symbol)> {
  let u = ctx.field();
  let point = ctx.point();
  let fx = integrand(&point);
  point.check_access()?;
  let uk0 = ctx.vertex_value(u);

  let sample = u.sample(&point);
  let expr = if fx.contains(&sample) {
    fx.subs(&[(sample, uk0.clone().into())])
  } else {
    tracing::debug!("integrand `{fx}` does not depend on `{u}`");
    fx
  };
  if let Some(application) = find_application(&expr, u) {
    return Err(Error::unsupported(
      application,
      "field must be sampled at the integration point",
    ));
  }
  reject_division_by_zero(&expr)?;
  Ok((expr, uk0))
}

/// Singular terms survive cancellation and would be misreported as nonlinear.
fn reject_division_by_zero(expr: &Expr) -> Result<()> {
  if expr.divides_by_zero() {
    return Err(Error::unsupported(expr, "division by zero"));
  }
  Ok(())
}

/// `(linear, affine)` of a control volume or boundary integral scaled by `weight`.
fn point_kernel(ctx: &SymbolContext, integral: &Integral, weight: Symbol) -> Result<(Expr, Expr)> {
  let (expr, uk0) = sample_at_vertex(ctx, |x| integral.eval(x))?;
  let expr = expr * Expr::from(weight);
  let split = split_one(&expr, &uk0).into_linear(&expr)?;
  tracing::trace!(
    "{} integral: linear {}, affine {}",
    integral.measure(),
    split.linear,
    split.affine
  );
  Ok((split.linear, split.affine))
}

fn dirichlet_kernel(ctx: &SymbolContext, condition: &DirichletCondition) -> Result<DirichletKernelExpr> {
  let (expr, uk0) = sample_at_vertex(ctx, |x| condition.eval(x))?;
  let split = split_one(&expr, &uk0).into_linear(&expr)?;
  if split.linear.is_zero() {
    tracing::warn!(
      "dirichlet condition on {} does not constrain `{}`",
      condition.subdomain(),
      ctx.field()
    );
  }
  Ok(DirichletKernelExpr {
    coeff: split.linear,
    rhs: -split.affine,
    subdomain: condition.subdomain().clone(),
  })
}
