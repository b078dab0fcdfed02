//! Finite volume discretization of linear weak forms.
//!
//! Integrals over control volumes, their surfaces and the boundary
//! are discretized symbolically, split into affine and linear parts,
//! compiled into batch kernels and assembled into a sparse system.

extern crate nalgebra as na;
extern crate nalgebra_sparse as nas;

pub mod assemble;
pub mod compiler;
pub mod context;
pub mod discretize;
pub mod error;
pub mod form;
pub mod kernel;
pub mod lambdify;
pub mod mesh;
pub mod symbolic;

pub use assemble::{assemble_linear_problem, assemble_matrix, LinearFvmProblem};
pub use compiler::{discretize_linear, CompileOptions, LinearKernels};
pub use error::{Error, Result};
