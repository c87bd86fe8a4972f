//! Pedigree file loader.
//!
//! Reads a tab-separated pedigree with a header row and answers
//! [`ParentLookup`] queries from it. Recognised headers (case-insensitive):
//!
//! | column | accepted names                     |
//! |--------|------------------------------------|
//! | family | `FID`, `family`, `family_id`       |
//! | sample | `IID`, `sample`, `sample_id`, `ID` |
//! | father | `Father`, `PAT`, `paternal_id`     |
//! | mother | `Mother`, `MAT`, `maternal_id`     |
//!
//! `0`, `.` and empty cells mean "no parent". Rows without a sample id are
//! skipped.

use std::{
  collections::HashMap,
  fs::File,
  io::{BufReader, Read},
  path::Path,
};

use csv::{ReaderBuilder, StringRecord};
use genval_core::pedigree::{ParentLookup, Parents};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
  pub family_id: Option<String>,
  pub sample_id: String,
  pub parents:   Parents,
}

/// Sample → parents, as read from a pedigree file.
#[derive(Debug, Clone, Default)]
pub struct Pedigree {
  members: HashMap<String, Member>,
}

impl Pedigree {
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let file = File::open(path).map_err(Error::io(path))?;
    let pedigree = Self::from_reader(BufReader::new(file))?;
    tracing::debug!(path = %path.display(), members = pedigree.len(), "loaded pedigree");
    Ok(pedigree)
  }

  pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
    let mut rdr = ReaderBuilder::new()
      .delimiter(b'\t')
      .quoting(false)
      .flexible(true)
      .has_headers(true)
      .from_reader(reader);

    let header = rdr.headers()?.clone();
    let find = |names: &[&str]| {
      header
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
    };
    let family = find(&["FID", "family", "family_id"]);
    let sample = find(&["IID", "sample", "sample_id", "ID"]);
    let father = find(&["Father", "PAT", "paternal_id"]);
    let mother = find(&["Mother", "MAT", "maternal_id"]);

    let mut members = HashMap::new();
    for row in rdr.records() {
      let row = match row {
        Ok(row) => row,
        Err(e) => {
          tracing::warn!(error = %e, "skipping unreadable pedigree row");
          continue;
        }
      };
      let Some(sample_id) = cell(&row, sample) else {
        continue;
      };
      let member = Member {
        family_id: cell(&row, family),
        sample_id: sample_id.clone(),
        parents:   Parents {
          father: cell(&row, father),
          mother: cell(&row, mother),
        },
      };
      members.insert(sample_id, member);
    }
    Ok(Self { members })
  }

  pub fn member(&self, sample_id: &str) -> Option<&Member> { self.members.get(sample_id) }

  pub fn len(&self) -> usize { self.members.len() }

  pub fn is_empty(&self) -> bool { self.members.is_empty() }
}

/// A present, non-placeholder cell value.
fn cell(row: &StringRecord, idx: Option<usize>) -> Option<String> {
  let value = row.get(idx?)?.trim();
  match value {
    "" | "0" | "." => None,
    v => Some(v.to_owned()),
  }
}

impl ParentLookup for Pedigree {
  fn parents(&self, sample_id: &str) -> Parents {
    self
      .members
      .get(sample_id)
      .map(|m| m.parents.clone())
      .unwrap_or_default()
  }
}
