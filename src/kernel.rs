//! Kernel objects.
//!
//! Every integral yields one kernel, first in symbolic form,
//! where structurally identical kernels are merged,
//! then compiled to numeric functions evaluated over batches of mesh entities.

use crate::{
  context::SymbolContext,
  form::Subdomain,
  lambdify::{NumericFn, Value},
  mesh::{EdgeIdx, FaceIdx, FvmMesh, VertexIdx},
  symbolic::{Expr, Symbol},
  Result,
};

use std::fmt;

/// Symbolic edge kernel.
///
/// Row `i` of `linear` holds the coefficients of $(u_(k_0), u_(k_1))$
/// in the contribution to endpoint `i`, `affine[i]` its constant part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeKernelExpr {
  pub linear: [[Expr; 2]; 2],
  pub affine: [Expr; 2],
  pub subdomains: Vec<Subdomain>,
}

/// Symbolic vertex or face kernel: `linear * u_k0 + affine`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PointKernelExpr {
  pub linear: Expr,
  pub affine: Expr,
  pub subdomains: Vec<Subdomain>,
}

/// Symbolic Dirichlet kernel: `coeff * u_k0 = rhs`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirichletKernelExpr {
  pub coeff: Expr,
  pub rhs: Expr,
  pub subdomain: Subdomain,
}

fn compile_fn(e: &Expr, params: &[Symbol]) -> Result<NumericFn> {
  NumericFn::compile(e, params)
}

/// Evaluated edge kernel for a batch of edges.
#[derive(Debug, Clone)]
pub struct EdgeEval {
  pub linear: [[na::DVector<f64>; 2]; 2],
  pub affine: [na::DVector<f64>; 2],
  pub vertices: Vec<[VertexIdx; 2]>,
}

/// Matrix contribution of every edge in a subdomain.
///
/// Compiled edge integrals implement it. So can hand-written kernels,
/// which are assembled next to them through [`LinearKernels::with_edge_kernel`].
///
/// [`LinearKernels::with_edge_kernel`]: crate::compiler::LinearKernels::with_edge_kernel
pub trait EdgeMatrixKernel: fmt::Debug + Send + Sync {
  fn subdomains(&self) -> &[Subdomain];
  /// The 2x2 blocks and affine parts of `edges`, in order.
  fn eval(&self, mesh: &dyn FvmMesh, edges: &[EdgeIdx]) -> Result<EdgeEval>;
}

#[derive(Debug, Clone)]
pub struct EdgeKernel {
  linear: [[NumericFn; 2]; 2],
  affine: [NumericFn; 2],
  subdomains: Vec<Subdomain>,
}

impl EdgeKernel {
  pub fn compile(expr: &EdgeKernelExpr, ctx: &SymbolContext) -> Result<Self> {
    let params = ctx.edge_params();
    let [[l00, l01], [l10, l11]] = &expr.linear;
    let [a0, a1] = &expr.affine;
    Ok(Self {
      linear: [
        [compile_fn(l00, &params)?, compile_fn(l01, &params)?],
        [compile_fn(l10, &params)?, compile_fn(l11, &params)?],
      ],
      affine: [compile_fn(a0, &params)?, compile_fn(a1, &params)?],
      subdomains: expr.subdomains.clone(),
    })
  }
}

impl EdgeMatrixKernel for EdgeKernel {
  fn subdomains(&self) -> &[Subdomain] {
    &self.subdomains
  }

  fn eval(&self, mesh: &dyn FvmMesh, edges: &[EdgeIdx]) -> Result<EdgeEval> {
    let n = edges.len();
    let vertices: Vec<[VertexIdx; 2]> = edges.iter().map(|&e| mesh.edge_vertices()[e]).collect();
    let v0: Vec<VertexIdx> = vertices.iter().map(|v| v[0]).collect();
    let v1: Vec<VertexIdx> = vertices.iter().map(|v| v[1]).collect();

    let ce_ratios = mesh.ce_ratios();
    let edge_lengths = mesh.edge_lengths();

    let mut args: Vec<Value> = Vec::with_capacity(2 * mesh.dim() + 2);
    args.extend(mesh.coords_of(&v0).into_iter().map(Value::Batch));
    args.extend(mesh.coords_of(&v1).into_iter().map(Value::Batch));
    args.push(Value::Batch(na::DVector::from_iterator(
      n,
      edges.iter().map(|&e| ce_ratios[e]),
    )));
    args.push(Value::Batch(na::DVector::from_iterator(
      n,
      edges.iter().map(|&e| edge_lengths[e]),
    )));

    let eval = |f: &NumericFn| f.eval_batch(&args, n);
    let [[l00, l01], [l10, l11]] = &self.linear;
    let [a0, a1] = &self.affine;
    Ok(EdgeEval {
      linear: [[eval(l00)?, eval(l01)?], [eval(l10)?, eval(l11)?]],
      affine: [eval(a0)?, eval(a1)?],
      vertices,
    })
  }
}

/// Evaluated vertex or face kernel: one diagonal entry per entity.
#[derive(Debug, Clone)]
pub struct PointEval {
  pub linear: na::DVector<f64>,
  pub affine: na::DVector<f64>,
  pub vertices: Vec<VertexIdx>,
}

#[derive(Debug, Clone)]
struct PointKernel {
  linear: NumericFn,
  affine: NumericFn,
  subdomains: Vec<Subdomain>,
}

impl PointKernel {
  fn compile(expr: &PointKernelExpr, params: &[Symbol]) -> Result<Self> {
    Ok(Self {
      linear: compile_fn(&expr.linear, params)?,
      affine: compile_fn(&expr.affine, params)?,
      subdomains: expr.subdomains.clone(),
    })
  }

  /// `weights` are control volumes or face areas.
  fn eval(
    &self,
    mesh: &dyn FvmMesh,
    weights: na::DVector<f64>,
    vertices: Vec<VertexIdx>,
  ) -> Result<PointEval> {
    let n = vertices.len();
    let mut args = vec![Value::Batch(weights)];
    args.extend(mesh.coords_of(&vertices).into_iter().map(Value::Batch));
    Ok(PointEval {
      linear: self.linear.eval_batch(&args, n)?,
      affine: self.affine.eval_batch(&args, n)?,
      vertices,
    })
  }
}

/// Kernel of a control volume integral.
#[derive(Debug, Clone)]
pub struct VertexKernel(PointKernel);

impl VertexKernel {
  pub fn compile(expr: &PointKernelExpr, ctx: &SymbolContext) -> Result<Self> {
    PointKernel::compile(expr, &ctx.vertex_params()).map(Self)
  }
  pub fn subdomains(&self) -> &[Subdomain] {
    &self.0.subdomains
  }
  pub fn eval(&self, mesh: &dyn FvmMesh, vertices: &[VertexIdx]) -> Result<PointEval> {
    let control_volumes = mesh.control_volumes();
    let weights = na::DVector::from_iterator(
      vertices.len(),
      vertices.iter().map(|&v| control_volumes[v]),
    );
    self.0.eval(mesh, weights, vertices.to_vec())
  }
}

/// Kernel of a boundary integral, evaluated at the owning vertex of each face.
#[derive(Debug, Clone)]
pub struct FaceKernel(PointKernel);

impl FaceKernel {
  pub fn compile(expr: &PointKernelExpr, ctx: &SymbolContext) -> Result<Self> {
    PointKernel::compile(expr, &ctx.face_params()).map(Self)
  }
  pub fn subdomains(&self) -> &[Subdomain] {
    &self.0.subdomains
  }
  pub fn eval(&self, mesh: &dyn FvmMesh, faces: &[FaceIdx]) -> Result<PointEval> {
    let weights = mesh.face_areas(faces);
    let vertices = faces.iter().map(|&f| mesh.face_vertices()[f]).collect();
    self.0.eval(mesh, weights, vertices)
  }
}

#[derive(Debug, Clone)]
pub struct DirichletEval {
  pub coeff: na::DVector<f64>,
  pub rhs: na::DVector<f64>,
}

#[derive(Debug, Clone)]
pub struct DirichletKernel {
  coeff: NumericFn,
  rhs: NumericFn,
  subdomain: Subdomain,
}

impl DirichletKernel {
  pub fn compile(expr: &DirichletKernelExpr, ctx: &SymbolContext) -> Result<Self> {
    let params = ctx.dirichlet_params();
    Ok(Self {
      coeff: compile_fn(&expr.coeff, &params)?,
      rhs: compile_fn(&expr.rhs, &params)?,
      subdomain: expr.subdomain.clone(),
    })
  }
  pub fn subdomain(&self) -> &Subdomain {
    &self.subdomain
  }
  pub fn eval(&self, mesh: &dyn FvmMesh, vertices: &[VertexIdx]) -> Result<DirichletEval> {
    let n = vertices.len();
    let args: Vec<Value> = mesh
      .coords_of(vertices)
      .into_iter()
      .map(Value::Batch)
      .collect();
    Ok(DirichletEval {
      coeff: self.coeff.eval_batch(&args, n)?,
      rhs: self.rhs.eval_batch(&args, n)?,
    })
  }
}
