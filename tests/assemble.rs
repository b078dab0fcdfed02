//! Assembly of kernels on small hand-checked meshes.

extern crate nalgebra as na;
extern crate nalgebra_sparse as nas;

mod common;

use common::{assert_mat_eq, init_tracing, laplacian, line_mesh, to_dense};
use covolume::{
  assemble::enforce_dirichlet,
  assemble_linear_problem, assemble_matrix,
  compiler::{discretize_symbolic, CompileOptions},
  discretize_linear,
  form::{integrate, DirichletCondition, Field, Integral, Measure, PdeProblem, Subdomain},
  kernel::{EdgeEval, EdgeMatrixKernel},
  mesh::{EdgeIdx, FvmMesh, MeshData},
  symbolic::Expr,
  Error, Result,
};

fn options() -> CompileOptions {
  CompileOptions::new(1)
}

#[test]
fn two_vertex_laplacian() {
  init_tracing();
  let mesh = line_mesh(&[0.0, 1.0]);
  let kernels = discretize_linear(&|u: &Field| vec![laplacian(u)], &options()).unwrap();
  let matrix = to_dense(&assemble_matrix(&mesh, &kernels).unwrap());

  #[rustfmt::skip]
  let expected = na::DMatrix::from_row_slice(2, 2, &[
     1.0,-1.0,
    -1.0, 1.0,
  ]);
  assert_mat_eq(&matrix, &expected);
}

#[test]
fn identical_integrals_count_once() {
  let mesh = line_mesh(&[0.0, 1.0]);
  let problem = |u: &Field| vec![laplacian(u), laplacian(u)];

  let symbolic = discretize_symbolic(&problem, &options()).unwrap();
  assert_eq!(symbolic.edge.len(), 1);

  let kernels = discretize_linear(&problem, &options()).unwrap();
  assert_eq!(kernels.edge.len(), 1);
  let matrix = to_dense(&assemble_matrix(&mesh, &kernels).unwrap());
  assert_mat_eq(&matrix, &na::dmatrix![1.0, -1.0; -1.0, 1.0]);
}

#[test]
fn control_volume_scaling() {
  let mesh = MeshData::new(
    na::DMatrix::from_row_slice(1, 3, &[0.0, 1.0, 2.0]),
    vec![[0, 1], [1, 2]],
    na::dvector![1.0, 1.0],
    na::dvector![1.0, 1.0],
    na::dvector![1.0, 2.0, 3.0],
  )
  .unwrap();

  let problem = |u: &Field| {
    let u = u.clone();
    vec![integrate(move |x| u.sample(x), Measure::ControlVolume)]
  };
  let kernels = discretize_linear(&problem, &options()).unwrap();
  assert_eq!(kernels.vertex.len(), 1);

  let eval = kernels.vertex[0].eval(&mesh, &[0, 1, 2]).unwrap();
  assert_eq!(eval.linear, na::dvector![1.0, 2.0, 3.0]);
  assert_eq!(eval.affine, na::dvector![0.0, 0.0, 0.0]);

  let system = assemble_linear_problem(&mesh, &kernels).unwrap();
  assert_mat_eq(
    &to_dense(&system.matrix),
    &na::DMatrix::from_diagonal(&na::dvector![1.0, 2.0, 3.0]),
  );
  assert_eq!(system.rhs, na::dvector![0.0, 0.0, 0.0]);
}

#[test]
fn source_term_moves_to_rhs() {
  let mesh = line_mesh(&[0.0, 0.5, 1.0]);
  let problem = |u: &Field| {
    vec![
      laplacian(u),
      integrate(|_| Expr::int(-1), Measure::ControlVolume),
    ]
  };
  let kernels = discretize_linear(&problem, &options()).unwrap();
  let system = assemble_linear_problem(&mesh, &kernels).unwrap();
  assert_eq!(system.rhs, na::dvector![0.25, 0.5, 0.25]);

  #[rustfmt::skip]
  let expected = na::DMatrix::from_row_slice(3, 3, &[
     2.0,-2.0, 0.0,
    -2.0, 4.0,-2.0,
     0.0,-2.0, 2.0,
  ]);
  assert_mat_eq(&to_dense(&system.matrix), &expected);
}

#[test]
fn boundary_faces_land_on_their_vertex() {
  let mesh = line_mesh(&[0.0, 1.0, 2.0]);
  let problem = |u: &Field| {
    let u = u.clone();
    vec![integrate(
      move |x| 2 * u.sample(x) + 3,
      Measure::BoundarySurface,
    )]
  };
  let kernels = discretize_linear(&problem, &options()).unwrap();
  let system = assemble_linear_problem(&mesh, &kernels).unwrap();
  assert_mat_eq(
    &to_dense(&system.matrix),
    &na::DMatrix::from_diagonal(&na::dvector![2.0, 0.0, 2.0]),
  );
  assert_eq!(system.rhs, na::dvector![-3.0, 0.0, -3.0]);
}

#[test]
fn integrals_restricted_to_subdomains() {
  let mesh = line_mesh(&[0.0, 1.0, 2.0, 3.0])
    .with_subdomain("left", vec![0, 1])
    .unwrap();
  let problem = |u: &Field| vec![laplacian(u).on([Subdomain::named("left")])];
  let kernels = discretize_linear(&problem, &options()).unwrap();
  let matrix = to_dense(&assemble_matrix(&mesh, &kernels).unwrap());

  let mut expected = na::DMatrix::zeros(4, 4);
  expected
    .view_mut((0, 0), (2, 2))
    .copy_from(&na::dmatrix![1.0, -1.0; -1.0, 1.0]);
  assert_mat_eq(&matrix, &expected);

  let problem = |u: &Field| vec![laplacian(u).on([Subdomain::named("right")])];
  let kernels = discretize_linear(&problem, &options()).unwrap();
  let err = assemble_matrix(&mesh, &kernels).unwrap_err();
  assert!(matches!(err, Error::UnknownSubdomain(ref s) if s == "right"));
}

struct FixedEnds {
  value: i64,
}
impl PdeProblem for FixedEnds {
  fn apply(&self, u: &Field) -> Vec<Integral> {
    vec![laplacian(u)]
  }
  fn dirichlet(&self, u: &Field) -> Vec<DirichletCondition> {
    let u = u.clone();
    let value = self.value;
    vec![DirichletCondition::new(
      move |x| u.sample(x) - value,
      Subdomain::Boundary,
    )]
  }
}

#[test]
fn dirichlet_rows() {
  let mesh = line_mesh(&[0.0, 1.0, 2.0]);
  let kernels = discretize_linear(&FixedEnds { value: 2 }, &options()).unwrap();
  let system = assemble_linear_problem(&mesh, &kernels).unwrap();

  #[rustfmt::skip]
  let expected = na::DMatrix::from_row_slice(3, 3, &[
     1.0, 0.0, 0.0,
    -1.0, 2.0,-1.0,
     0.0, 0.0, 1.0,
  ]);
  assert_mat_eq(&to_dense(&system.matrix), &expected);
  assert_eq!(system.rhs, na::dvector![2.0, 0.0, 2.0]);
}

#[test]
fn dirichlet_is_idempotent() {
  let mesh = line_mesh(&[0.0, 0.5, 1.5, 2.0]);
  let kernels = discretize_linear(&FixedEnds { value: -1 }, &options()).unwrap();
  let system = assemble_linear_problem(&mesh, &kernels).unwrap();

  let mut matrix = system.matrix.clone();
  let mut rhs = system.rhs.clone();
  enforce_dirichlet(&mesh, &kernels.dirichlet[0], &mut matrix, &mut rhs).unwrap();

  assert_eq!(matrix, system.matrix);
  assert_eq!(rhs, system.rhs);
}

#[test]
fn nonlinear_edge_term_is_rejected() {
  let problem = |u: &Field| {
    let u = u.clone();
    vec![integrate(
      move |x| u.sample(x).powi(2),
      Measure::ControlVolumeSurface,
    )]
  };
  let err = discretize_linear(&problem, &options()).unwrap_err();
  assert!(matches!(err, Error::NonLinear { .. }), "{err}");
}

#[test]
fn mesh_of_wrong_dimension() {
  let mesh = line_mesh(&[0.0, 1.0]);
  let problem = |u: &Field| {
    let u = u.clone();
    vec![integrate(move |x| x.coord(0) * u.sample(x), Measure::ControlVolume)]
  };
  let kernels = discretize_linear(&problem, &CompileOptions::new(2)).unwrap();
  let err = assemble_matrix(&mesh, &kernels).unwrap_err();
  assert!(matches!(err, Error::Shape(_)), "{err}");
}

#[test]
fn coordinate_beyond_dimension() {
  let problem = |u: &Field| {
    let u = u.clone();
    vec![integrate(move |x| x.coord(1) * u.sample(x), Measure::ControlVolume)]
  };
  let err = discretize_linear(&problem, &options()).unwrap_err();
  assert!(matches!(err, Error::Shape(_)), "{err}");

  let problem = |u: &Field| {
    let u = u.clone();
    vec![integrate(
      move |x| x.coord(3) * covolume::form::n_dot_grad(u.sample(x)),
      Measure::ControlVolumeSurface,
    )]
  };
  let err = discretize_linear(&problem, &options()).unwrap_err();
  assert!(matches!(err, Error::Shape(_)), "{err}");
}

#[test]
fn large_coefficients_stay_exact() {
  let mesh = line_mesh(&[0.0, 1.0]);
  let problem = |u: &Field| {
    let u = u.clone();
    vec![integrate(
      move |x| Expr::int(10).powi(20) * u.sample(x) - Expr::int(10).powi(20) * u.sample(x) + u.sample(x),
      Measure::ControlVolume,
    )]
  };
  let kernels = discretize_linear(&problem, &options()).unwrap();
  let matrix = to_dense(&assemble_matrix(&mesh, &kernels).unwrap());
  assert_mat_eq(&matrix, &na::dmatrix![0.5, 0.0; 0.0, 0.5]);
}

#[test]
fn division_by_zero_is_rejected() {
  let problem = |u: &Field| {
    let u = u.clone();
    vec![integrate(move |x| u.sample(x) / 0, Measure::ControlVolume)]
  };
  let err = discretize_linear(&problem, &options()).unwrap_err();
  assert!(matches!(err, Error::Unsupported { .. }), "{err}");
}

/// $integral_(partial Omega_k) (-nabla u) dot n + l$ written by hand.
#[derive(Debug)]
struct HandLaplacian {
  subdomains: Vec<Subdomain>,
}
impl EdgeMatrixKernel for HandLaplacian {
  fn subdomains(&self) -> &[Subdomain] {
    &self.subdomains
  }
  fn eval(&self, mesh: &dyn FvmMesh, edges: &[EdgeIdx]) -> Result<EdgeEval> {
    let n = edges.len();
    let ce = na::DVector::from_iterator(n, edges.iter().map(|&e| mesh.ce_ratios()[e]));
    let l = na::DVector::from_iterator(n, edges.iter().map(|&e| mesh.edge_lengths()[e]));
    Ok(EdgeEval {
      linear: [[ce.clone(), -ce.clone()], [-ce.clone(), ce]],
      affine: [l.clone(), l],
      vertices: edges.iter().map(|&e| mesh.edge_vertices()[e]).collect(),
    })
  }
}

#[test]
fn hand_written_edge_kernel() {
  let mesh = line_mesh(&[0.0, 1.0, 2.0]);
  let kernels = discretize_linear(&|u: &Field| vec![laplacian(u)], &options())
    .unwrap()
    .with_edge_kernel(HandLaplacian {
      subdomains: vec![Subdomain::Everywhere],
    });
  assert_eq!(kernels.edge.len(), 2);
  let system = assemble_linear_problem(&mesh, &kernels).unwrap();

  #[rustfmt::skip]
  let expected = na::DMatrix::from_row_slice(3, 3, &[
     2.0,-2.0, 0.0,
    -2.0, 4.0,-2.0,
     0.0,-2.0, 2.0,
  ]);
  assert_mat_eq(&to_dense(&system.matrix), &expected);
  assert_eq!(system.rhs, na::dvector![-1.0, -2.0, -1.0]);
}
