//! Assembly of the global linear system.
//!
//! One unknown per vertex. Kernel contributions are collected as triplets,
//! summed in coordinate format and converted to CSR,
//! on which Dirichlet rows are overwritten.

use crate::{
  compiler::LinearKernels,
  form::Subdomain,
  kernel::{DirichletKernel, EdgeMatrixKernel, FaceKernel, VertexKernel},
  mesh::{FvmMesh, VertexIdx},
  Error, Result,
};

use itertools::Itertools;
use rayon::prelude::*;

pub type FvmMat = nas::CsrMatrix<f64>;
pub type FvmVec = na::DVector<f64>;

/// $A u = b$
#[derive(Debug, Clone)]
pub struct LinearFvmProblem {
  pub matrix: FvmMat,
  pub rhs: FvmVec,
}

/// Triplets and right-hand side entries of one kernel on one subdomain.
#[derive(Default)]
struct Contribution {
  triplets: Vec<(usize, usize, f64)>,
  rhs: Vec<(usize, f64)>,
}

enum Job<'k> {
  Edge(&'k dyn EdgeMatrixKernel, &'k Subdomain),
  Vertex(&'k VertexKernel, &'k Subdomain),
  Face(&'k FaceKernel, &'k Subdomain),
}

impl Job<'_> {
  fn contribute(&self, mesh: &dyn FvmMesh) -> Result<Contribution> {
    let mut contrib = Contribution::default();
    match *self {
      Job::Edge(kernel, subdomain) => {
        let edges = mesh.edges(subdomain)?;
        let eval = kernel.eval(mesh, &edges)?;
        if eval.vertices.len() != edges.len() {
          return Err(Error::Shape(format!(
            "edge kernel returned {} blocks for {} edges",
            eval.vertices.len(),
            edges.len()
          )));
        }
        for (i, &[k0, k1]) in eval.vertices.iter().enumerate() {
          let k = [k0, k1];
          for (a, b) in (0..2).cartesian_product(0..2) {
            let val = eval.linear[a][b][i];
            if val != 0.0 {
              contrib.triplets.push((k[a], k[b], val));
            }
          }
          contrib.rhs.push((k0, -eval.affine[0][i]));
          contrib.rhs.push((k1, -eval.affine[1][i]));
        }
      }
      Job::Vertex(kernel, subdomain) => {
        let vertices = mesh.vertices(subdomain)?;
        let eval = kernel.eval(mesh, &vertices)?;
        push_diagonal(&mut contrib, &eval.vertices, &eval.linear, &eval.affine);
      }
      Job::Face(kernel, subdomain) => {
        let faces = mesh.faces(subdomain)?;
        let eval = kernel.eval(mesh, &faces)?;
        push_diagonal(&mut contrib, &eval.vertices, &eval.linear, &eval.affine);
      }
    }
    Ok(contrib)
  }
}

fn push_diagonal(contrib: &mut Contribution, vertices: &[VertexIdx], linear: &FvmVec, affine: &FvmVec) {
  for (&v, &l, &a) in itertools::izip!(vertices, linear.iter(), affine.iter()) {
    if l != 0.0 {
      contrib.triplets.push((v, v, l));
    }
    contrib.rhs.push((v, -a));
  }
}

/// Assembles the matrix and right-hand side of all kernels and enforces Dirichlet conditions.
pub fn assemble_linear_problem(
  mesh: &impl FvmMesh,
  kernels: &LinearKernels,
) -> Result<LinearFvmProblem> {
  let nvertices = mesh.num_vertices();

  let jobs: Vec<Job> = kernels
    .edge
    .iter()
    .flat_map(|k| k.subdomains().iter().map(move |s| Job::Edge(k.as_ref(), s)))
    .chain(
      kernels
        .vertex
        .iter()
        .flat_map(|k| k.subdomains().iter().map(move |s| Job::Vertex(k, s))),
    )
    .chain(
      kernels
        .face
        .iter()
        .flat_map(|k| k.subdomains().iter().map(move |s| Job::Face(k, s))),
    )
    .collect();

  let contribs: Vec<Contribution> = jobs
    .par_iter()
    .map(|job| job.contribute(mesh))
    .collect::<Result<_>>()?;

  let mut rhs = FvmVec::zeros(nvertices);
  let mut triplets: Vec<(usize, usize, f64)> = Vec::new();
  for contrib in contribs {
    triplets.extend(contrib.triplets);
    for (v, val) in contrib.rhs {
      rhs[v] += val;
    }
  }
  // every diagonal entry is stored, Dirichlet rows overwrite it in place
  triplets.extend((0..nvertices).map(|v| (v, v, 0.0)));
  tracing::debug!(
    "assembling {} triplets from {} kernel evaluations",
    triplets.len(),
    jobs.len()
  );

  let (rows, cols, values) = triplets.into_iter().multiunzip();
  let coo = nas::CooMatrix::try_from_triplets(nvertices, nvertices, rows, cols, values)?;
  let mut matrix = FvmMat::from(&coo);

  for kernel in &kernels.dirichlet {
    enforce_dirichlet(mesh, kernel, &mut matrix, &mut rhs)?;
  }

  Ok(LinearFvmProblem { matrix, rhs })
}

/// Assembles only the matrix.
pub fn assemble_matrix(mesh: &impl FvmMesh, kernels: &LinearKernels) -> Result<FvmMat> {
  assemble_linear_problem(mesh, kernels).map(|problem| problem.matrix)
}

/// Overwrites the rows of the kernel's vertices with `coeff * u_v = rhs`.
///
/// Rows are zeroed before the diagonal is set. Applying a kernel twice
/// gives the same result as applying it once.
pub fn enforce_dirichlet(
  mesh: &impl FvmMesh,
  kernel: &DirichletKernel,
  matrix: &mut FvmMat,
  rhs: &mut FvmVec,
) -> Result<()> {
  let vertices = mesh.vertices(kernel.subdomain())?;
  if let Some(&v) = vertices.iter().find(|&&v| v >= matrix.nrows() || v >= rhs.len()) {
    return Err(Error::Shape(format!(
      "dirichlet vertex {v} out of range for system of size {}",
      matrix.nrows()
    )));
  }
  tracing::debug!(
    "fixing {} dirichlet rows on {}",
    vertices.len(),
    kernel.subdomain()
  );

  for &v in &vertices {
    matrix.row_mut(v).values_mut().fill(0.0);
  }

  let eval = kernel.eval(mesh, &vertices)?;
  for (i, &v) in vertices.iter().enumerate() {
    set_diagonal(matrix, v, eval.coeff[i]);
    rhs[v] = eval.rhs[i];
  }
  Ok(())
}

/// Sets $A_(i i)$, inserting the entry if it is not stored.
pub fn set_diagonal(matrix: &mut FvmMat, i: usize, value: f64) {
  let stored = {
    let mut row = matrix.row_mut(i);
    let (cols, values) = row.cols_and_values_mut();
    match cols.binary_search(&i) {
      Ok(k) => {
        values[k] = value;
        true
      }
      Err(_) => false,
    }
  };
  if !stored {
    tracing::warn!("diagonal entry ({i},{i}) not stored, rebuilding sparsity pattern");
    let mut coo = nas::CooMatrix::from(&*matrix);
    coo.push(i, i, value);
    *matrix = FvmMat::from(&coo);
  }
}

#[cfg(test)]
mod test {
  use super::set_diagonal;

  #[test]
  fn set_missing_diagonal() {
    let coo = nas::CooMatrix::try_from_triplets(2, 2, vec![0, 1], vec![1, 0], vec![3.0, 4.0]).unwrap();
    let mut mat = nas::CsrMatrix::from(&coo);
    set_diagonal(&mut mat, 1, 2.0);
    set_diagonal(&mut mat, 0, 5.0);
    let dense = na::DMatrix::from(&mat);
    assert_eq!(dense, na::dmatrix![5.0, 3.0; 4.0, 2.0]);
  }
}
