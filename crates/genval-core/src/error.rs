//! Error types for `genval-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("missing required field: {0}")]
  MissingField(&'static str),

  #[error("unknown variant type: {0:?} (expected \"snv\" or \"sv\")")]
  UnknownVariantType(String),

  #[error("unknown date filter: {0:?}")]
  UnknownDateFilter(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
