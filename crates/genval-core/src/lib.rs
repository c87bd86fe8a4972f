//! Core types and trait definitions for the genval validation log.
//!
//! This crate does no file I/O. It defines the record model,
//! the [`store::ValidationStore`] abstraction, and the pure reductions
//! (consensus, summaries, statistics) that every consumer shares.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod consensus;
pub mod error;
pub mod pedigree;
pub mod record;
pub mod store;
pub mod summary;
pub mod variant;

pub use error::{Error, Result};
