//! Validation records — the unit of the append-only validation log.
//!
//! A record is one human decision about one variant in one sample. Records
//! are never edited; a correction is a newer record for the same key, and a
//! soft delete is a record with `ignore` set.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Variant type ────────────────────────────────────────────────────────────

/// Which log a record lives in.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum VariantType {
  #[serde(rename = "SNV")]
  Snv,
  #[serde(rename = "SV")]
  Sv,
}

impl VariantType {
  pub const ALL: [VariantType; 2] = [VariantType::Snv, VariantType::Sv];

  /// Display label used by the listing and statistics views.
  pub fn label(self) -> &'static str {
    match self {
      Self::Snv => "SNV",
      Self::Sv => "SV",
    }
  }

  /// File name of the log for this type, relative to the validations dir.
  pub fn file_name(self) -> &'static str {
    match self {
      Self::Snv => "snvs.tsv",
      Self::Sv => "svs.tsv",
    }
  }
}

impl fmt::Display for VariantType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

impl FromStr for VariantType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "snv" | "snvs" => Ok(Self::Snv),
      "sv" | "svs" => Ok(Self::Sv),
      _ => Err(Error::UnknownVariantType(s.to_owned())),
    }
  }
}

// ─── Inheritance ─────────────────────────────────────────────────────────────

/// Inheritance pattern asserted by the submitter.
///
/// Unrecognised text read back from a log is kept verbatim in
/// [`Inheritance::Other`] so that rewriting a parsed record is lossless.
#[derive(
  Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(from = "String", into = "String")]
pub enum Inheritance {
  #[default]
  Unknown,
  DeNovo,
  Paternal,
  Maternal,
  NotPaternal,
  NotMaternal,
  Either,
  Homozygous,
  Other(String),
}

impl Inheritance {
  pub fn as_str(&self) -> &str {
    match self {
      Self::Unknown => "unknown",
      Self::DeNovo => "de novo",
      Self::Paternal => "paternal",
      Self::Maternal => "maternal",
      Self::NotPaternal => "not paternal",
      Self::NotMaternal => "not maternal",
      Self::Either => "either",
      Self::Homozygous => "homozygous",
      Self::Other(s) => s,
    }
  }

  /// `true` when this pattern names a parent the variant came from.
  pub fn implicates_parent(&self) -> bool {
    matches!(self, Self::Maternal | Self::Paternal | Self::Either)
  }
}

impl From<&str> for Inheritance {
  fn from(s: &str) -> Self {
    match s {
      "unknown" => Self::Unknown,
      "de novo" => Self::DeNovo,
      "paternal" => Self::Paternal,
      "maternal" => Self::Maternal,
      "not paternal" => Self::NotPaternal,
      "not maternal" => Self::NotMaternal,
      "either" => Self::Either,
      "homozygous" => Self::Homozygous,
      other => Self::Other(other.to_owned()),
    }
  }
}

impl From<String> for Inheritance {
  fn from(s: String) -> Self { Self::from(s.as_str()) }
}

impl From<Inheritance> for String {
  fn from(i: Inheritance) -> Self { i.as_str().to_owned() }
}

impl fmt::Display for Inheritance {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// The validation outcome recorded by a single submitter.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(from = "String", into = "String")]
pub enum Status {
  Present,
  /// Historical alias of [`Status::Present`]. Kept verbatim in stored data.
  InPhaseMnv,
  Absent,
  Uncertain,
  Different,
  Other(String),
}

impl Status {
  pub fn as_str(&self) -> &str {
    match self {
      Self::Present => "present",
      Self::InPhaseMnv => "in phase MNV",
      Self::Absent => "absent",
      Self::Uncertain => "uncertain",
      Self::Different => "different",
      Self::Other(s) => s,
    }
  }

  /// Fold `in phase MNV` into `present`; every other status is unchanged.
  pub fn normalized(&self) -> Status {
    match self {
      Self::InPhaseMnv => Self::Present,
      other => other.clone(),
    }
  }

  pub fn is_present_family(&self) -> bool {
    matches!(self, Self::Present | Self::InPhaseMnv)
  }
}

impl From<&str> for Status {
  fn from(s: &str) -> Self {
    match s {
      "present" => Self::Present,
      "in phase MNV" => Self::InPhaseMnv,
      "absent" => Self::Absent,
      "uncertain" => Self::Uncertain,
      "different" => Self::Different,
      other => Self::Other(other.to_owned()),
    }
  }
}

impl From<String> for Status {
  fn from(s: String) -> Self { Self::from(s.as_str()) }
}

impl From<Status> for String {
  fn from(s: Status) -> Self { s.as_str().to_owned() }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Timestamps ──────────────────────────────────────────────────────────────

/// Format used for newly written records (local time, microseconds).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// The current local time in [`TIMESTAMP_FORMAT`].
pub fn now_timestamp() -> String {
  Local::now().naive_local().format(TIMESTAMP_FORMAT).to_string()
}

/// Parse an ISO-8601 timestamp as written by this or older tooling.
///
/// Offset-qualified values are normalised to UTC. Returns `None` for
/// anything unparsable; callers treat that as older than every valid value.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
  let s = s.trim();
  if s.is_empty() {
    return None;
  }
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc).naive_utc());
  }
  for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
      return Some(dt);
    }
  }
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
}

// ─── ValidationRecord ────────────────────────────────────────────────────────

/// One row of a validation log. Once written, no field is ever updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRecord {
  pub family_id:     String,
  /// `chrom:pos:ref:alt` for SNVs, `chrom:start-end:type` for SVs. Never
  /// validated; see [`crate::variant::VariantKey::parse`].
  pub variant_key:   String,
  pub sample_id:     String,
  pub user:          String,
  pub inheritance:   Inheritance,
  pub status:        Status,
  pub curated_start: Option<String>,
  pub curated_end:   Option<String>,
  pub comment:       Option<String>,
  pub ignore:        bool,
  /// ISO-8601; the authoritative ordering key.
  pub timestamp:     String,
}

impl ValidationRecord {
  pub fn is_active(&self) -> bool { !self.ignore }

  pub fn has_curated_boundary(&self) -> bool {
    self.curated_start.is_some() || self.curated_end.is_some()
  }

  /// Whether appending this record may synthesize parent companions.
  pub fn implicates_parents(&self) -> bool {
    self.status == Status::Present && self.inheritance.implicates_parent()
  }

  pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
    parse_timestamp(&self.timestamp)
  }
}

// ─── NewValidation ───────────────────────────────────────────────────────────

/// Input to [`crate::store::ValidationStore::append`].
/// `timestamp` is always set by the store; it is not accepted from callers.
#[derive(Debug, Clone)]
pub struct NewValidation {
  pub family_id:     String,
  pub variant_key:   String,
  pub sample_id:     String,
  pub user:          String,
  pub inheritance:   Inheritance,
  pub status:        Status,
  pub curated_start: Option<String>,
  pub curated_end:   Option<String>,
  pub comment:       Option<String>,
  pub ignore:        bool,
}

impl NewValidation {
  /// Convenience constructor with all optional fields left empty.
  pub fn new(
    family_id: impl Into<String>,
    variant_key: impl Into<String>,
    sample_id: impl Into<String>,
    user: impl Into<String>,
    status: Status,
  ) -> Self {
    Self {
      family_id: family_id.into(),
      variant_key: variant_key.into(),
      sample_id: sample_id.into(),
      user: user.into(),
      inheritance: Inheritance::default(),
      status,
      curated_start: None,
      curated_end: None,
      comment: None,
      ignore: false,
    }
  }

  pub fn with_inheritance(mut self, inheritance: Inheritance) -> Self {
    self.inheritance = inheritance;
    self
  }

  pub fn with_curated(
    mut self,
    start: Option<String>,
    end: Option<String>,
  ) -> Self {
    self.curated_start = start;
    self.curated_end = end;
    self
  }

  pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
    self.comment = Some(comment.into());
    self
  }

  /// Reject inputs that would produce an unattributable row.
  pub fn check(&self) -> Result<()> {
    let required = [
      ("family_id", &self.family_id),
      ("variant_key", &self.variant_key),
      ("sample_id", &self.sample_id),
      ("user", &self.user),
    ];
    for (name, value) in required {
      if value.trim().is_empty() {
        return Err(Error::MissingField(name));
      }
    }
    Ok(())
  }

  /// Stamp the input. Blank optional fields collapse to `None`.
  pub fn into_record(self, timestamp: String) -> ValidationRecord {
    ValidationRecord {
      family_id: self.family_id,
      variant_key: self.variant_key,
      sample_id: self.sample_id,
      user: self.user,
      inheritance: self.inheritance,
      status: self.status,
      curated_start: non_blank(self.curated_start),
      curated_end: non_blank(self.curated_end),
      comment: non_blank(self.comment),
      ignore: self.ignore,
      timestamp,
    }
  }
}

fn non_blank(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_status_text_is_preserved() {
    let status = Status::from("maybe");
    assert_eq!(status, Status::Other("maybe".into()));
    assert_eq!(status.as_str(), "maybe");
  }

  #[test]
  fn in_phase_mnv_normalizes_to_present() {
    assert_eq!(Status::InPhaseMnv.normalized(), Status::Present);
    assert_eq!(Status::Absent.normalized(), Status::Absent);
    assert_eq!(Status::from("in phase MNV"), Status::InPhaseMnv);
  }

  #[test]
  fn inheritance_round_trips_through_text() {
    for text in [
      "unknown",
      "de novo",
      "paternal",
      "maternal",
      "not paternal",
      "not maternal",
      "either",
      "homozygous",
    ] {
      assert_eq!(Inheritance::from(text).as_str(), text);
    }
    assert_eq!(Inheritance::from(""), Inheritance::Other(String::new()));
  }

  #[test]
  fn variant_type_parses_case_insensitively() {
    assert_eq!("SNV".parse::<VariantType>().unwrap(), VariantType::Snv);
    assert_eq!("sv".parse::<VariantType>().unwrap(), VariantType::Sv);
    assert!(matches!(
      "cnv".parse::<VariantType>(),
      Err(Error::UnknownVariantType(_))
    ));
  }

  #[test]
  fn parse_timestamp_accepts_common_shapes() {
    let micro = parse_timestamp("2024-03-11T14:22:05.123456").unwrap();
    assert_eq!(micro.to_string(), "2024-03-11 14:22:05.123456");
    assert!(parse_timestamp("2024-03-11T14:22:05").is_some());
    assert!(parse_timestamp("2024-03-11 14:22:05").is_some());
    assert!(parse_timestamp("2024-03-11T14:22:05Z").is_some());
    assert!(parse_timestamp("2024-03-11").is_some());
    assert!(parse_timestamp("yesterday").is_none());
    assert!(parse_timestamp("").is_none());
  }

  #[test]
  fn now_timestamp_is_parsable() {
    assert!(parse_timestamp(&now_timestamp()).is_some());
  }

  #[test]
  fn check_rejects_blank_user() {
    let input = NewValidation::new("FAM1", "chr1:1:A:G", "s1", "  ", Status::Present);
    assert!(matches!(input.check(), Err(Error::MissingField("user"))));
  }

  #[test]
  fn into_record_drops_blank_optionals() {
    let record = NewValidation::new("FAM1", "chr1:1-9:del", "s1", "u", Status::Present)
      .with_curated(Some(" 120 ".into()), Some(String::new()))
      .with_comment("")
      .into_record("2024-01-01T00:00:00".into());
    assert_eq!(record.curated_start.as_deref(), Some("120"));
    assert_eq!(record.curated_end, None);
    assert_eq!(record.comment, None);
  }

  #[test]
  fn only_literal_present_implicates_parents() {
    let mut record = NewValidation::new("F", "k", "s", "u", Status::Present)
      .with_inheritance(Inheritance::Maternal)
      .into_record(String::new());
    assert!(record.implicates_parents());
    record.status = Status::InPhaseMnv;
    assert!(!record.implicates_parents());
    record.status = Status::Present;
    record.inheritance = Inheritance::DeNovo;
    assert!(!record.implicates_parents());
  }
}
