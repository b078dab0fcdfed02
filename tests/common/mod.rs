#![allow(dead_code)]

use covolume::{
  form::{Field, Integral},
  mesh::MeshData,
};

pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_test_writer()
    .try_init();
}

pub fn assert_mat_eq(a: &na::DMatrix<f64>, b: &na::DMatrix<f64>) {
  const TOL: f64 = 10e-12;
  let diff = a - b;
  let error = diff.norm();
  let equal = error <= TOL;
  if !equal {
    println!("Matrix a={a:.3}");
    println!("Matrix b={b:.3}");
    println!("a-b={diff:.3}");
    panic!("Matrices not equal.");
  }
}

pub fn to_dense(csr: &nas::CsrMatrix<f64>) -> na::DMatrix<f64> {
  na::DMatrix::from(csr)
}

/// Vertices on a line at the given coordinates.
///
/// In 1D the covolume of an edge is a point, so the ce-ratio is $1/h$.
/// The two end vertices each own a boundary face of unit area.
pub fn line_mesh(xs: &[f64]) -> MeshData {
  let nvertices = xs.len();
  let edges: Vec<[usize; 2]> = (0..nvertices - 1).map(|i| [i, i + 1]).collect();
  let lengths = na::DVector::from_iterator(edges.len(), edges.iter().map(|[a, b]| xs[*b] - xs[*a]));
  let ce_ratios = lengths.map(|h| 1.0 / h);

  let mut control_volumes = na::DVector::zeros(nvertices);
  for (&[a, b], &h) in edges.iter().zip(lengths.iter()) {
    control_volumes[a] += h / 2.0;
    control_volumes[b] += h / 2.0;
  }

  MeshData::new(
    na::DMatrix::from_row_slice(1, nvertices, xs),
    edges,
    ce_ratios,
    lengths,
    control_volumes,
  )
  .unwrap()
  .with_faces(vec![0, nvertices - 1], na::dvector![1.0, 1.0])
  .unwrap()
}

/// $-Delta u$ as a control volume surface integral.
pub fn laplacian(u: &Field) -> Integral {
  let u = u.clone();
  covolume::form::integrate(
    move |x| -covolume::form::n_dot_grad(u.sample(x)),
    covolume::form::Measure::ControlVolumeSurface,
  )
}
