//! TSV-file backend for the genval validation log.
//!
//! One tab-separated file per variant type under `<data_dir>/validations/`.
//! Appends are serialized with an OS advisory lock; blocking file work runs
//! on tokio's blocking pool so callers never stall the async runtime.

mod encode;
mod lock;
mod schema;
mod store;

pub mod error;
pub mod pedigree;

pub use error::{Error, Result};
pub use pedigree::Pedigree;
pub use store::TsvStore;
