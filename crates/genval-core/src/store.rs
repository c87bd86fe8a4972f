//! The `ValidationStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `genval-store-tsv`).
//! Higher layers (`genval-cli`, the dashboard) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use serde::Serialize;

use crate::{
  pedigree::Parents,
  record::{NewValidation, ValidationRecord, VariantType},
};

/// What a single append wrote, in file order.
#[derive(Debug, Clone, Serialize)]
pub struct AppendOutcome {
  pub record:     ValidationRecord,
  /// Parent records synthesized from the record's inheritance.
  pub companions: Vec<ValidationRecord>,
}

/// Abstraction over a validation log backend.
///
/// Writes are append-only: a record is never rewritten or removed. All
/// methods return `Send` futures so the trait can be used from a
/// multi-threaded async runtime.
pub trait ValidationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Append `input` to the log for `kind`, stamping it with the current time.
  ///
  /// If the record is `present` with a maternal, paternal or either
  /// inheritance, companion records are appended for the implicated entries
  /// of `parents` that have no record for the same family and variant yet.
  /// The whole operation is atomic with respect to other appenders.
  fn append(
    &self,
    kind: VariantType,
    input: NewValidation,
    parents: Parents,
  ) -> impl Future<Output = Result<AppendOutcome, Self::Error>> + Send + '_;

  /// Every well-formed record in the log for `kind`, in file order.
  ///
  /// A missing log is empty, not an error. Filtering by family is left to
  /// [`crate::consensus::index`].
  fn load(
    &self,
    kind: VariantType,
  ) -> impl Future<Output = Result<Vec<ValidationRecord>, Self::Error>> + Send + '_;
}
