//! The mesh as seen by kernel evaluation and assembly.
//!
//! Geometry is precomputed elsewhere. Kernels only query it.

use crate::{form::Subdomain, Error, Result};

use std::collections::HashMap;

pub type VertexIdx = usize;
pub type EdgeIdx = usize;
pub type FaceIdx = usize;

/// Read only queries of a covolume mesh.
///
/// One unknown lives on every vertex. Edges carry the covolume/length ratio,
/// vertices their control volume and boundary faces their area.
/// Every boundary face belongs to exactly one vertex.
pub trait FvmMesh: Sync {
  fn dim(&self) -> usize;
  fn num_vertices(&self) -> usize;
  /// Vertex coordinates, one column per vertex.
  fn node_coords(&self) -> &na::DMatrix<f64>;

  fn edge_vertices(&self) -> &[[VertexIdx; 2]];
  fn ce_ratios(&self) -> &na::DVector<f64>;
  fn edge_lengths(&self) -> &na::DVector<f64>;

  fn control_volumes(&self) -> &na::DVector<f64>;

  /// Owning vertex of every boundary face.
  fn face_vertices(&self) -> &[VertexIdx];
  fn face_areas(&self, faces: &[FaceIdx]) -> na::DVector<f64>;

  fn edges(&self, subdomain: &Subdomain) -> Result<Vec<EdgeIdx>>;
  fn vertices(&self, subdomain: &Subdomain) -> Result<Vec<VertexIdx>>;
  fn faces(&self, subdomain: &Subdomain) -> Result<Vec<FaceIdx>>;

  /// Coordinates of the given vertices, one row per dimension.
  fn coords_of(&self, vertices: &[VertexIdx]) -> Vec<na::DVector<f64>> {
    let coords = self.node_coords();
    (0..self.dim())
      .map(|i| na::DVector::from_iterator(vertices.len(), vertices.iter().map(|&v| coords[(i, v)])))
      .collect()
  }
}

/// Mesh given by its precomputed geometry.
#[derive(Debug, Clone)]
pub struct MeshData {
  node_coords: na::DMatrix<f64>,
  edge_vertices: Vec<[VertexIdx; 2]>,
  ce_ratios: na::DVector<f64>,
  edge_lengths: na::DVector<f64>,
  control_volumes: na::DVector<f64>,
  face_vertices: Vec<VertexIdx>,
  face_areas: na::DVector<f64>,
  boundary_vertices: Option<Vec<VertexIdx>>,
  subdomains: HashMap<String, Vec<VertexIdx>>,
}

impl MeshData {
  pub fn new(
    node_coords: na::DMatrix<f64>,
    edge_vertices: Vec<[VertexIdx; 2]>,
    ce_ratios: na::DVector<f64>,
    edge_lengths: na::DVector<f64>,
    control_volumes: na::DVector<f64>,
  ) -> Result<Self> {
    let nvertices = node_coords.ncols();
    let nedges = edge_vertices.len();
    if ce_ratios.len() != nedges || edge_lengths.len() != nedges {
      return Err(Error::Shape(format!(
        "{nedges} edges, but {} ce-ratios and {} edge lengths",
        ce_ratios.len(),
        edge_lengths.len()
      )));
    }
    if control_volumes.len() != nvertices {
      return Err(Error::Shape(format!(
        "{nvertices} vertices, but {} control volumes",
        control_volumes.len()
      )));
    }
    check_vertices(edge_vertices.iter().flatten(), nvertices)?;
    if let Some(e) = edge_vertices.iter().position(|[a, b]| a == b) {
      return Err(Error::Shape(format!("edge {e} is degenerate")));
    }

    Ok(Self {
      node_coords,
      edge_vertices,
      ce_ratios,
      edge_lengths,
      control_volumes,
      face_vertices: Vec::new(),
      face_areas: na::DVector::zeros(0),
      boundary_vertices: None,
      subdomains: HashMap::new(),
    })
  }

  /// Boundary faces by owning vertex and area.
  pub fn with_faces(mut self, face_vertices: Vec<VertexIdx>, face_areas: na::DVector<f64>) -> Result<Self> {
    if face_vertices.len() != face_areas.len() {
      return Err(Error::Shape(format!(
        "{} faces, but {} face areas",
        face_vertices.len(),
        face_areas.len()
      )));
    }
    check_vertices(&face_vertices, self.num_vertices())?;
    self.face_vertices = face_vertices;
    self.face_areas = face_areas;
    Ok(self)
  }

  /// Overrides the boundary vertices, which default to the face owners.
  pub fn with_boundary_vertices(mut self, vertices: Vec<VertexIdx>) -> Result<Self> {
    check_vertices(&vertices, self.num_vertices())?;
    self.boundary_vertices = Some(vertices);
    Ok(self)
  }

  /// Names a set of vertices.
  ///
  /// The edges of a named subdomain are those with both endpoints in it,
  /// its faces those owned by one of its vertices.
  pub fn with_subdomain(mut self, name: impl Into<String>, vertices: Vec<VertexIdx>) -> Result<Self> {
    check_vertices(&vertices, self.num_vertices())?;
    self.subdomains.insert(name.into(), vertices);
    Ok(self)
  }

  fn boundary_vertex_list(&self) -> Vec<VertexIdx> {
    match &self.boundary_vertices {
      Some(vertices) => vertices.clone(),
      None => {
        let mut vertices = self.face_vertices.clone();
        vertices.sort_unstable();
        vertices.dedup();
        vertices
      }
    }
  }

  fn vertex_flags(&self, subdomain: &Subdomain) -> Result<Option<Vec<bool>>> {
    let vertices = match subdomain {
      Subdomain::Everywhere => return Ok(None),
      Subdomain::Boundary => self.boundary_vertex_list(),
      Subdomain::Named(name) => self
        .subdomains
        .get(name)
        .ok_or_else(|| Error::UnknownSubdomain(name.clone()))?
        .clone(),
    };
    let mut flags = vec![false; self.num_vertices()];
    vertices.iter().for_each(|&v| flags[v] = true);
    Ok(Some(flags))
  }
}

fn check_vertices<'a>(vertices: impl IntoIterator<Item = &'a VertexIdx>, nvertices: usize) -> Result<()> {
  match vertices.into_iter().find(|&&v| v >= nvertices) {
    Some(v) => Err(Error::Shape(format!(
      "vertex {v} out of range for {nvertices} vertices"
    ))),
    None => Ok(()),
  }
}

impl FvmMesh for MeshData {
  fn dim(&self) -> usize {
    self.node_coords.nrows()
  }
  fn num_vertices(&self) -> usize {
    self.node_coords.ncols()
  }
  fn node_coords(&self) -> &na::DMatrix<f64> {
    &self.node_coords
  }
  fn edge_vertices(&self) -> &[[VertexIdx; 2]] {
    &self.edge_vertices
  }
  fn ce_ratios(&self) -> &na::DVector<f64> {
    &self.ce_ratios
  }
  fn edge_lengths(&self) -> &na::DVector<f64> {
    &self.edge_lengths
  }
  fn control_volumes(&self) -> &na::DVector<f64> {
    &self.control_volumes
  }
  fn face_vertices(&self) -> &[VertexIdx] {
    &self.face_vertices
  }
  fn face_areas(&self, faces: &[FaceIdx]) -> na::DVector<f64> {
    na::DVector::from_iterator(faces.len(), faces.iter().map(|&f| self.face_areas[f]))
  }

  fn edges(&self, subdomain: &Subdomain) -> Result<Vec<EdgeIdx>> {
    Ok(match self.vertex_flags(subdomain)? {
      None => (0..self.edge_vertices.len()).collect(),
      Some(flags) => self
        .edge_vertices
        .iter()
        .enumerate()
        .filter(|(_, [a, b])| flags[*a] && flags[*b])
        .map(|(e, _)| e)
        .collect(),
    })
  }

  fn vertices(&self, subdomain: &Subdomain) -> Result<Vec<VertexIdx>> {
    Ok(match self.vertex_flags(subdomain)? {
      None => (0..self.num_vertices()).collect(),
      Some(flags) => flags
        .iter()
        .enumerate()
        .filter_map(|(v, &flag)| flag.then_some(v))
        .collect(),
    })
  }

  fn faces(&self, subdomain: &Subdomain) -> Result<Vec<FaceIdx>> {
    Ok(match subdomain {
      // every face is a boundary face
      Subdomain::Everywhere | Subdomain::Boundary => (0..self.face_vertices.len()).collect(),
      named => {
        let flags = self.vertex_flags(named)?.unwrap_or_default();
        self
          .face_vertices
          .iter()
          .enumerate()
          .filter(|&(_, &v)| flags[v])
          .map(|(f, _)| f)
          .collect()
      }
    })
  }
}

#[cfg(test)]
mod test {
  use super::{FvmMesh, MeshData};
  use crate::{form::Subdomain, Error};

  fn path() -> MeshData {
    MeshData::new(
      na::DMatrix::from_row_slice(1, 4, &[0.0, 1.0, 2.0, 3.0]),
      vec![[0, 1], [1, 2], [2, 3]],
      na::DVector::from_element(3, 1.0),
      na::DVector::from_element(3, 1.0),
      na::dvector![0.5, 1.0, 1.0, 0.5],
    )
    .unwrap()
    .with_faces(vec![0, 3], na::dvector![1.0, 1.0])
    .unwrap()
    .with_subdomain("left", vec![0, 1])
    .unwrap()
  }

  #[test]
  fn subdomains() {
    let mesh = path();
    assert_eq!(mesh.vertices(&Subdomain::Everywhere).unwrap(), vec![0, 1, 2, 3]);
    assert_eq!(mesh.vertices(&Subdomain::Boundary).unwrap(), vec![0, 3]);
    assert_eq!(mesh.edges(&Subdomain::named("left")).unwrap(), vec![0]);
    assert_eq!(mesh.faces(&Subdomain::named("left")).unwrap(), vec![0]);
    assert!(matches!(
      mesh.vertices(&Subdomain::named("right")),
      Err(Error::UnknownSubdomain(_))
    ));
  }

  #[test]
  fn shape_validation() {
    let res = MeshData::new(
      na::DMatrix::zeros(1, 2),
      vec![[0, 2]],
      na::dvector![1.0],
      na::dvector![1.0],
      na::dvector![1.0, 1.0],
    );
    assert!(matches!(res, Err(Error::Shape(_))));
  }

  #[test]
  fn coords_of_vertices() {
    let mesh = path();
    let coords = mesh.coords_of(&[3, 1]);
    assert_eq!(coords, vec![na::dvector![3.0, 1.0]]);
  }
}
