//! [`TsvStore`] — the TSV-file implementation of [`ValidationStore`].

use std::{
  fs::{self, File, OpenOptions},
  io::{BufReader, Read as _, Seek as _, SeekFrom, Write as _},
  path::{Path, PathBuf},
};

use genval_core::{
  pedigree::{Parents, plan_companions},
  record::{NewValidation, ValidationRecord, VariantType, now_timestamp},
  store::{AppendOutcome, ValidationStore},
  summary::ValidationLog,
};

use crate::{
  Error, Result,
  encode::{decode_records, encode_header, encode_records},
  lock::LockedFile,
  schema::VALIDATIONS_DIR,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A validation log stored as `snvs.tsv` and `svs.tsv` in one directory.
///
/// Holds no state beyond the directory path: every load re-reads the files
/// and nothing is cached between calls. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct TsvStore {
  dir: PathBuf,
}

impl TsvStore {
  /// A store rooted at `<data_dir>/validations`. Nothing is created until
  /// the first append.
  pub fn open(data_dir: impl AsRef<Path>) -> Self {
    Self {
      dir: data_dir.as_ref().join(VALIDATIONS_DIR),
    }
  }

  pub fn dir(&self) -> &Path { &self.dir }

  pub fn path(&self, kind: VariantType) -> PathBuf { self.dir.join(kind.file_name()) }

  /// Load both logs.
  pub async fn load_log(&self) -> Result<ValidationLog> {
    Ok(ValidationLog {
      snvs: self.load(VariantType::Snv).await?,
      svs:  self.load(VariantType::Sv).await?,
    })
  }
}

// ─── Blocking operations ─────────────────────────────────────────────────────

fn load_blocking(path: &Path) -> Result<Vec<ValidationRecord>> {
  let file = match File::open(path) {
    Ok(f) => f,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
    Err(e) => return Err(Error::io(path)(e)),
  };
  decode_records(BufReader::new(file), path)
}

/// Header check, parent pre-check, and every line written happen under one
/// exclusive lock, so concurrent appenders cannot both write a header or
/// both synthesize the same companion.
fn append_blocking(
  path: &Path,
  record: ValidationRecord,
  parents: &Parents,
) -> Result<AppendOutcome> {
  if let Some(dir) = path.parent() {
    fs::create_dir_all(dir).map_err(Error::io(dir))?;
  }

  let file = OpenOptions::new()
    .read(true)
    .append(true)
    .create(true)
    .open(path)
    .map_err(Error::io(path))?;
  let locked = LockedFile::acquire(file, path.to_path_buf())?;

  let is_new = locked.metadata().map_err(Error::io(path))?.len() == 0;

  let companions = if record.implicates_parents() {
    let existing = if is_new {
      Vec::new()
    } else {
      (&*locked).seek(SeekFrom::Start(0)).map_err(Error::io(path))?;
      decode_records(BufReader::new(&*locked), path)?
    };
    plan_companions(&record, parents, &existing)
  } else {
    Vec::new()
  };

  let mut buf = if is_new {
    encode_header()?
  } else if ends_with_newline(&locked, path)? {
    Vec::new()
  } else {
    // An interrupted write left a partial last line; keep it off ours.
    tracing::warn!(path = %path.display(), "log does not end in a newline; terminating it");
    b"\n".to_vec()
  };
  buf.extend(encode_records(std::iter::once(&record).chain(&companions))?);

  (&*locked).write_all(&buf).map_err(Error::io(path))?;
  (&*locked).flush().map_err(Error::io(path))?;
  drop(locked);

  tracing::debug!(
    path = %path.display(),
    family = %record.family_id,
    variant = %record.variant_key,
    sample = %record.sample_id,
    status = %record.status,
    companions = companions.len(),
    "appended validation"
  );

  Ok(AppendOutcome { record, companions })
}

fn ends_with_newline(mut file: &File, path: &Path) -> Result<bool> {
  file.seek(SeekFrom::End(-1)).map_err(Error::io(path))?;
  let mut last = [0u8; 1];
  file.read_exact(&mut last).map_err(Error::io(path))?;
  Ok(last[0] == b'\n')
}

// ─── ValidationStore impl ────────────────────────────────────────────────────

impl ValidationStore for TsvStore {
  type Error = Error;

  async fn append(
    &self,
    kind:    VariantType,
    input:   NewValidation,
    parents: Parents,
  ) -> Result<AppendOutcome> {
    input.check()?;
    let record = input.into_record(now_timestamp());
    let path = self.path(kind);

    tokio::task::spawn_blocking(move || append_blocking(&path, record, &parents)).await?
  }

  async fn load(&self, kind: VariantType) -> Result<Vec<ValidationRecord>> {
    let path = self.path(kind);
    tokio::task::spawn_blocking(move || load_blocking(&path)).await?
  }
}
