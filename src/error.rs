use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("tree must have at least 1 piece of data")]
  EmptyInput,

  #[error("data not found")]
  DataNotFound,

  #[error("leaf index {index} is out of range for {len} items")]
  IndexOutOfRange { index: u64, len: u64 },

  /// The proof is structurally unusable, as opposed to well-formed but not matching the root.
  #[error("invalid proof: {0}")]
  InvalidProof(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}
