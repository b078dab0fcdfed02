use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// An expression node outside of the grammar the discretizer understands.
  #[error("unsupported construct `{construct}`: {reason}")]
  Unsupported { construct: String, reason: String },

  /// The split left a nonzero nonlinear residual.
  #[error("{context} is not linear in the unknown, nonlinear residual: {residual}")]
  NonLinear { context: String, residual: String },

  #[error("unknown integration measure `{0}`")]
  UnknownMeasure(String),

  #[error("unknown function `{0}` in compiled expression")]
  UnknownFunction(String),

  #[error("symbol `{0}` is not bound to any kernel argument")]
  UnboundSymbol(String),

  #[error("shape mismatch: {0}")]
  Shape(String),

  #[error("unknown subdomain `{0}`")]
  UnknownSubdomain(String),

  /// Invalid sparse matrix data.
  #[error("sparse format: {0}")]
  Sparse(String),
}

// `SparseFormatError` is not `Send`, kernels are compiled on the thread pool.
impl From<nas::SparseFormatError> for Error {
  fn from(err: nas::SparseFormatError) -> Self {
    Self::Sparse(err.to_string())
  }
}

impl Error {
  pub fn unsupported(construct: impl fmt::Display, reason: impl Into<String>) -> Self {
    Self::Unsupported {
      construct: construct.to_string(),
      reason: reason.into(),
    }
  }
}

pub type Result<T> = std::result::Result<T, Error>;
