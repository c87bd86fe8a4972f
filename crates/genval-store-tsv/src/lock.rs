//! Exclusive advisory lock on an open log file.
//!
//! The lock is held for the lifetime of [`LockedFile`] and released in
//! `Drop`, so every exit path out of a critical section unlocks, including
//! early returns through `?` and unwinding panics.

use std::{fs::File, ops::Deref, path::PathBuf};

use fs2::FileExt;

use crate::{Error, Result};

pub struct LockedFile {
  file: File,
  path: PathBuf,
}

impl LockedFile {
  /// Block until the exclusive lock on `file` is granted.
  pub fn acquire(file: File, path: PathBuf) -> Result<Self> {
    file.lock_exclusive().map_err(Error::io(&path))?;
    tracing::trace!(path = %path.display(), "acquired log lock");
    Ok(Self { file, path })
  }
}

impl Deref for LockedFile {
  type Target = File;

  fn deref(&self) -> &File { &self.file }
}

impl Drop for LockedFile {
  fn drop(&mut self) {
    if let Err(e) = FileExt::unlock(&self.file) {
      tracing::warn!(path = %self.path.display(), error = %e, "failed to release log lock");
    } else {
      tracing::trace!(path = %self.path.display(), "released log lock");
    }
  }
}
