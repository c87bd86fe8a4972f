//! Encoding and decoding between [`ValidationRecord`] and TSV rows.
//!
//! Fields are written raw: tabs and newlines inside values are not escaped,
//! so such input corrupts its own row (which the reader then skips). Unset
//! optional fields are empty strings; `Ignore` is `0` or `1`.

use std::{io::Read, path::Path};

use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use genval_core::record::{Inheritance, Status, ValidationRecord};

use crate::{Result, schema};

// ─── Writing ─────────────────────────────────────────────────────────────────

fn writer() -> csv::Writer<Vec<u8>> {
  WriterBuilder::new()
    .delimiter(b'\t')
    .quote_style(QuoteStyle::Never)
    .terminator(Terminator::Any(b'\n'))
    .has_headers(false)
    .from_writer(Vec::new())
}

fn finish(w: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
  w.into_inner()
    .map_err(|e| csv::Error::from(e.into_error()).into())
}

/// The header row, terminated.
pub fn encode_header() -> Result<Vec<u8>> {
  let mut w = writer();
  w.write_record(schema::COLUMNS)?;
  finish(w)
}

/// One terminated row per record, in order.
pub fn encode_records<'a, I>(records: I) -> Result<Vec<u8>>
where
  I: IntoIterator<Item = &'a ValidationRecord>,
{
  let mut w = writer();
  for r in records {
    w.write_record([
      r.family_id.as_str(),
      r.variant_key.as_str(),
      r.sample_id.as_str(),
      r.user.as_str(),
      r.inheritance.as_str(),
      r.status.as_str(),
      r.curated_start.as_deref().unwrap_or_default(),
      r.curated_end.as_deref().unwrap_or_default(),
      r.comment.as_deref().unwrap_or_default(),
      if r.ignore { "1" } else { "0" },
      r.timestamp.as_str(),
    ])?;
  }
  finish(w)
}

// ─── Reading ─────────────────────────────────────────────────────────────────

/// Column positions resolved from a file's header row.
struct ColumnMap {
  width:         usize,
  fid:           Option<usize>,
  variant:       Option<usize>,
  sample:        Option<usize>,
  user:          Option<usize>,
  inheritance:   Option<usize>,
  validation:    Option<usize>,
  curated_start: Option<usize>,
  curated_end:   Option<usize>,
  comment:       Option<usize>,
  ignore:        Option<usize>,
  timestamp:     Option<usize>,
}

impl ColumnMap {
  /// `None` when a column every row needs is missing from the header.
  fn from_header(header: &StringRecord) -> Option<Self> {
    let find = |name: &str| header.iter().position(|h| h.trim() == name);
    let map = Self {
      width:         header.len(),
      fid:           find(schema::FID),
      variant:       find(schema::VARIANT),
      sample:        find(schema::SAMPLE),
      user:          find(schema::USER),
      inheritance:   find(schema::INHERITANCE),
      validation:    find(schema::VALIDATION),
      curated_start: find(schema::CURATED_START),
      curated_end:   find(schema::CURATED_END),
      comment:       find(schema::COMMENT),
      ignore:        find(schema::IGNORE),
      timestamp:     find(schema::TIMESTAMP),
    };
    let required = [map.fid, map.variant, map.sample, map.validation, map.timestamp];
    required.iter().all(Option::is_some).then_some(map)
  }

  /// The fixed layout of [`schema::COLUMNS`], for logs written without a
  /// header row.
  fn positional() -> Self {
    Self {
      width:         schema::COLUMNS.len(),
      fid:           Some(0),
      variant:       Some(1),
      sample:        Some(2),
      user:          Some(3),
      inheritance:   Some(4),
      validation:    Some(5),
      curated_start: Some(6),
      curated_end:   Some(7),
      comment:       Some(8),
      ignore:        Some(9),
      timestamp:     Some(10),
    }
  }

  fn decode(&self, row: &StringRecord) -> ValidationRecord {
    let field = |idx: Option<usize>| idx.and_then(|i| row.get(i)).unwrap_or_default();
    let optional = |idx: Option<usize>| {
      let v = field(idx);
      (!v.is_empty()).then(|| v.to_owned())
    };
    ValidationRecord {
      family_id:     field(self.fid).to_owned(),
      variant_key:   field(self.variant).to_owned(),
      sample_id:     field(self.sample).to_owned(),
      user:          field(self.user).to_owned(),
      inheritance:   Inheritance::from(field(self.inheritance)),
      status:        Status::from(field(self.validation)),
      curated_start: optional(self.curated_start),
      curated_end:   optional(self.curated_end),
      comment:       optional(self.comment),
      ignore:        field(self.ignore) == "1",
      timestamp:     field(self.timestamp).to_owned(),
    }
  }
}

/// Parse a whole log. Rows that do not match the header's width, or that are
/// not valid UTF-8, are skipped with a warning; `source` only labels those
/// warnings.
///
/// A first row without the required column names is read as data when it
/// has the full fixed width. Otherwise the file yields no records.
pub fn decode_records<R: Read>(
  reader: R,
  source: &Path,
) -> Result<Vec<ValidationRecord>> {
  let mut rdr = ReaderBuilder::new()
    .delimiter(b'\t')
    .quoting(false)
    .flexible(true)
    .has_headers(true)
    .from_reader(reader);

  let header = rdr.headers()?.clone();
  if header.iter().all(|h| h.trim().is_empty()) {
    return Ok(Vec::new());
  }

  let mut records = Vec::new();
  let mut skipped = 0usize;
  let columns = match ColumnMap::from_header(&header) {
    Some(columns) => columns,
    None if header.len() == schema::COLUMNS.len() => {
      tracing::warn!(
        path = %source.display(),
        "log has no header row; reading columns by position"
      );
      let columns = ColumnMap::positional();
      records.push(columns.decode(&header));
      columns
    }
    None => {
      tracing::warn!(
        path = %source.display(),
        found = header.len(),
        "log header is missing required columns; no rows loaded"
      );
      return Ok(Vec::new());
    }
  };

  for (n, row) in rdr.records().enumerate() {
    // Row 1 is the header.
    let line = n + 2;
    match row {
      Ok(row) if row.len() == columns.width => records.push(columns.decode(&row)),
      Ok(row) => {
        skipped += 1;
        tracing::warn!(
          path = %source.display(),
          line,
          expected = columns.width,
          found = row.len(),
          "skipping row with wrong column count"
        );
      }
      Err(e) => {
        skipped += 1;
        tracing::warn!(
          path = %source.display(),
          line,
          error = %e,
          "skipping unreadable row"
        );
      }
    }
  }

  if records.is_empty() && skipped > 0 {
    tracing::warn!(
      path = %source.display(),
      skipped,
      "log has content but no valid rows"
    );
  }
  Ok(records)
}
