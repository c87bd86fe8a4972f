//! Reduction of raw validation records into one consensus per variant+sample.
//!
//! Everything here is pure: the caller loads a snapshot of the log, indexes
//! it, and asks for consensus per key. Precedence is
//! conflicting > present-family > absent > uncertain.

use std::{
  cmp::Ordering,
  collections::{BTreeSet, HashMap},
  fmt,
};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{
  record::{Inheritance, Status, ValidationRecord},
  variant::{Locus, SvKey},
};

// ─── Result type ─────────────────────────────────────────────────────────────

/// The reconciled status shown for a variant+sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ConsensusStatus {
  #[serde(rename = "present")]
  Present,
  #[serde(rename = "in phase MNV")]
  InPhaseMnv,
  #[serde(rename = "absent")]
  Absent,
  #[serde(rename = "uncertain")]
  Uncertain,
  #[serde(rename = "conflicting")]
  Conflicting,
}

impl ConsensusStatus {
  pub const ALL: [ConsensusStatus; 5] = [
    Self::Present,
    Self::InPhaseMnv,
    Self::Absent,
    Self::Uncertain,
    Self::Conflicting,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Present => "present",
      Self::InPhaseMnv => "in phase MNV",
      Self::Absent => "absent",
      Self::Uncertain => "uncertain",
      Self::Conflicting => "conflicting",
    }
  }

  /// Inverse of [`ConsensusStatus::as_str`].
  pub fn parse(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|status| status.as_str() == s)
  }
}

impl fmt::Display for ConsensusStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Output of [`consensus`].
///
/// `status == None` means nothing active is on record for the key.
/// `curated_start`/`curated_end` are set only when a curated boundary exists;
/// a side the curator left blank is filled from the original SV call when
/// the variant key parses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsensusResult {
  pub status:        Option<ConsensusStatus>,
  pub inheritance:   Option<Inheritance>,
  pub curated_start: Option<String>,
  pub curated_end:   Option<String>,
}

impl ConsensusResult {
  pub fn is_curated(&self) -> bool {
    self.curated_start.is_some() || self.curated_end.is_some()
  }

  /// The locus to display for an SV: the curated boundary where one exists
  /// and parses, otherwise the original call.
  pub fn display_locus(&self, original: &SvKey) -> Locus {
    let mut locus = original.locus();
    if let Some(start) = self.curated_start.as_deref().and_then(parse_coord) {
      locus.start = start;
    }
    if let Some(end) = self.curated_end.as_deref().and_then(parse_coord) {
      locus.end = end;
    }
    locus
  }
}

fn parse_coord(s: &str) -> Option<u64> { s.trim().parse().ok() }

// ─── consensus ───────────────────────────────────────────────────────────────

/// Reduce every record for one `(variant_key, sample_id)` into a consensus.
///
/// Ignored records are dropped first. `in phase MNV` counts as `present` for
/// conflict detection but is reported verbatim when it is the only flavour
/// of presence on record.
pub fn consensus(records: &[ValidationRecord]) -> ConsensusResult {
  let active: Vec<&ValidationRecord> =
    records.iter().filter(|r| r.is_active()).collect();
  if active.is_empty() {
    return ConsensusResult::default();
  }

  let (curated_start, curated_end) = curated_boundary(&active);

  let normalized: BTreeSet<Status> =
    active.iter().map(|r| r.status.normalized()).collect();

  let (status, inheritance) = if normalized.len() > 1 {
    (ConsensusStatus::Conflicting, None)
  } else if normalized.contains(&Status::Present) {
    let status = if active.iter().any(|r| r.status == Status::InPhaseMnv) {
      ConsensusStatus::InPhaseMnv
    } else {
      ConsensusStatus::Present
    };
    (status, present_inheritance(&active))
  } else if normalized.contains(&Status::Absent) {
    (ConsensusStatus::Absent, None)
  } else {
    (ConsensusStatus::Uncertain, None)
  };

  ConsensusResult {
    status: Some(status),
    inheritance,
    curated_start,
    curated_end,
  }
}

/// `de novo` beats `homozygous`; anything else is not reported.
fn present_inheritance(active: &[&ValidationRecord]) -> Option<Inheritance> {
  let present = || active.iter().filter(|r| r.status.is_present_family());
  if present().any(|r| r.inheritance == Inheritance::DeNovo) {
    Some(Inheritance::DeNovo)
  } else if present().any(|r| r.inheritance == Inheritance::Homozygous) {
    Some(Inheritance::Homozygous)
  } else {
    None
  }
}

/// The most recent curated boundary among active present-family records.
fn curated_boundary(
  active: &[&ValidationRecord],
) -> (Option<String>, Option<String>) {
  let Some(latest) = active
    .iter()
    .filter(|r| r.status.is_present_family() && r.has_curated_boundary())
    .max_by(|a, b| recency_order(a, b))
  else {
    return (None, None);
  };

  let original = SvKey::parse(&latest.variant_key);
  let start = latest.curated_start.clone().or_else(|| {
    original.as_ref().map(|k| k.start.to_string())
  });
  let end = latest
    .curated_end
    .clone()
    .or_else(|| original.as_ref().map(|k| k.end.to_string()));
  (start, end)
}

/// Total order on records by recency. Unparsable timestamps sort before
/// every parsable one; remaining ties fall back to raw text so the winner
/// never depends on input order.
fn recency_order(a: &ValidationRecord, b: &ValidationRecord) -> Ordering {
  let key = |r: &ValidationRecord| -> (Option<NaiveDateTime>, String) {
    (r.parsed_timestamp(), r.timestamp.clone())
  };
  key(a)
    .cmp(&key(b))
    .then_with(|| a.curated_start.cmp(&b.curated_start))
    .then_with(|| a.curated_end.cmp(&b.curated_end))
}

// ─── index ───────────────────────────────────────────────────────────────────

/// Records grouped by exact `(variant_key, sample_id)`, in file order within
/// each group.
#[derive(Debug, Clone, Default)]
pub struct ValidationIndex {
  groups: HashMap<(String, String), Vec<ValidationRecord>>,
}

impl ValidationIndex {
  pub fn get(&self, variant_key: &str, sample_id: &str) -> &[ValidationRecord] {
    self
      .groups
      .get(&(variant_key.to_owned(), sample_id.to_owned()))
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  pub fn consensus_for(&self, variant_key: &str, sample_id: &str) -> ConsensusResult {
    consensus(self.get(variant_key, sample_id))
  }

  pub fn len(&self) -> usize { self.groups.len() }

  pub fn is_empty(&self) -> bool { self.groups.is_empty() }

  pub fn iter(
    &self,
  ) -> impl Iterator<Item = (&(String, String), &Vec<ValidationRecord>)> {
    self.groups.iter()
  }
}

/// Group `records` by `(variant_key, sample_id)`, keeping only `family` when
/// one is given. Performs no conflict resolution.
pub fn index<I>(records: I, family: Option<&str>) -> ValidationIndex
where
  I: IntoIterator<Item = ValidationRecord>,
{
  let mut groups: HashMap<(String, String), Vec<ValidationRecord>> = HashMap::new();
  for record in records {
    if family.is_some_and(|f| f != record.family_id) {
      continue;
    }
    groups
      .entry((record.variant_key.clone(), record.sample_id.clone()))
      .or_default()
      .push(record);
  }
  ValidationIndex { groups }
}
