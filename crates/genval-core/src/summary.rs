//! Cross-log read models: the aggregated validation listing and the
//! statistics breakdown.
//!
//! Both are computed from a [`ValidationLog`] snapshot and are never stored.

use std::{
  collections::{BTreeMap, BTreeSet, HashMap},
  str::FromStr,
};

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
  Error, Result,
  consensus::{ConsensusStatus, consensus},
  record::{Inheritance, ValidationRecord, VariantType, parse_timestamp},
  variant::SvKey,
};

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Both logs as loaded at one point in time.
#[derive(Debug, Clone, Default)]
pub struct ValidationLog {
  pub snvs: Vec<ValidationRecord>,
  pub svs:  Vec<ValidationRecord>,
}

impl ValidationLog {
  pub fn records(&self, kind: VariantType) -> &[ValidationRecord] {
    match kind {
      VariantType::Snv => &self.snvs,
      VariantType::Sv => &self.svs,
    }
  }

  /// Every record tagged with its type, SNVs first, file order within each.
  pub fn iter(&self) -> impl Iterator<Item = (VariantType, &ValidationRecord)> {
    VariantType::ALL
      .into_iter()
      .flat_map(move |kind| self.records(kind).iter().map(move |r| (kind, r)))
  }

  pub fn is_empty(&self) -> bool { self.snvs.is_empty() && self.svs.is_empty() }
}

// ─── Date filter ─────────────────────────────────────────────────────────────

/// Window on the calendar date of a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
  /// Strictly before the date.
  Before(NaiveDate),
  /// Strictly after the date.
  After(NaiveDate),
  /// Inclusive on both ends.
  Between(NaiveDate, NaiveDate),
}

impl DateFilter {
  /// `false` for unparsable timestamps.
  pub fn matches(&self, timestamp: &str) -> bool {
    let Some(date) = parse_timestamp(timestamp).map(|dt| dt.date()) else {
      return false;
    };
    match *self {
      Self::Before(d) => date < d,
      Self::After(d) => date > d,
      Self::Between(a, b) => a <= date && date <= b,
    }
  }
}

impl FromStr for DateFilter {
  type Err = Error;

  /// `before:YYYY-MM-DD`, `after:YYYY-MM-DD` or `YYYY-MM-DD..YYYY-MM-DD`.
  fn from_str(s: &str) -> Result<Self> {
    let date = |d: &str| {
      NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
        .map_err(|_| Error::UnknownDateFilter(s.to_owned()))
    };
    if let Some(d) = s.strip_prefix("before:") {
      Ok(Self::Before(date(d)?))
    } else if let Some(d) = s.strip_prefix("after:") {
      Ok(Self::After(date(d)?))
    } else if let Some((a, b)) = s.split_once("..") {
      Ok(Self::Between(date(a)?, date(b)?))
    } else {
      Err(Error::UnknownDateFilter(s.to_owned()))
    }
  }
}

// ─── Aggregated listing ──────────────────────────────────────────────────────

/// Filters for [`summarize`]. Empty sets mean "no restriction".
#[derive(Debug, Clone, Default)]
pub struct SummaryFilter {
  pub types:    BTreeSet<VariantType>,
  pub statuses: BTreeSet<ConsensusStatus>,
  /// A row matches if any of these users contributed to it.
  pub users:    BTreeSet<String>,
  pub date:     Option<DateFilter>,
}

impl SummaryFilter {
  fn matches(&self, row: &SummaryRow) -> bool {
    (self.types.is_empty() || self.types.contains(&row.variant_type))
      && (self.statuses.is_empty() || self.statuses.contains(&row.status))
      && (self.users.is_empty()
        || row.users.iter().any(|u| self.users.contains(u)))
      && self.date.is_none_or(|d| d.matches(&row.timestamp))
  }
}

/// One line of the aggregated listing: a variant+sample with its consensus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
  pub variant_type:    VariantType,
  pub family_id:       String,
  pub variant_key:     String,
  /// Same as `variant_key` unless a curated SV boundary applies.
  pub display_variant: String,
  pub sample_id:       String,
  /// Distinct contributors, sorted.
  pub users:           Vec<String>,
  pub status:          ConsensusStatus,
  pub inheritance:     Option<Inheritance>,
  /// Most recent timestamp over every row of the group, ignored or not.
  pub timestamp:       String,
}

impl SummaryRow {
  pub fn is_curated(&self) -> bool { self.display_variant != self.variant_key }

  pub fn users_joined(&self) -> String { self.users.join(", ") }
}

/// Group both logs by `(type, family, variant, sample)` and reduce each group.
/// Groups whose records are all ignored are left out.
pub fn summarize(log: &ValidationLog, filter: &SummaryFilter) -> Vec<SummaryRow> {
  type Key<'a> = (VariantType, &'a str, &'a str, &'a str);

  let mut order: Vec<Key<'_>> = Vec::new();
  let mut groups: HashMap<Key<'_>, Vec<ValidationRecord>> = HashMap::new();
  for (kind, record) in log.iter() {
    let key = (
      kind,
      record.family_id.as_str(),
      record.variant_key.as_str(),
      record.sample_id.as_str(),
    );
    groups
      .entry(key)
      .or_insert_with(|| {
        order.push(key);
        Vec::new()
      })
      .push(record.clone());
  }

  order
    .into_iter()
    .filter_map(|key| {
      let records = groups.remove(&key)?;
      let (kind, family_id, variant_key, sample_id) = key;
      let result = consensus(&records);
      let status = result.status?;

      let display_variant = match (kind, SvKey::parse(variant_key)) {
        (VariantType::Sv, Some(sv)) if result.is_curated() => {
          sv.with_locus(&result.display_locus(&sv))
        }
        _ => variant_key.to_owned(),
      };
      let users: BTreeSet<&str> = records.iter().map(|r| r.user.as_str()).collect();
      let timestamp = records
        .iter()
        .map(|r| r.timestamp.as_str())
        .max()
        .unwrap_or_default();

      Some(SummaryRow {
        variant_type: kind,
        family_id: family_id.to_owned(),
        variant_key: variant_key.to_owned(),
        display_variant,
        sample_id: sample_id.to_owned(),
        users: users.into_iter().map(str::to_owned).collect(),
        status,
        inheritance: result.inheritance,
        timestamp: timestamp.to_owned(),
      })
    })
    .filter(|row| filter.matches(row))
    .collect()
}

// ─── Statistics ──────────────────────────────────────────────────────────────

/// Filters for [`statistics`]. Empty sets mean "no restriction".
#[derive(Debug, Clone, Default)]
pub struct StatsFilter {
  pub types: BTreeSet<VariantType>,
  /// Exact submitter match.
  pub users: BTreeSet<String>,
}

/// Counts over individual active records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
  pub total:          usize,
  pub variants:       usize,
  pub families:       usize,
  pub samples:        usize,
  /// Ignored records across both logs; filters do not apply.
  pub ignored:        usize,
  pub by_status:      BTreeMap<String, usize>,
  pub by_type:        BTreeMap<String, usize>,
  pub by_user:        BTreeMap<String, usize>,
  pub by_inheritance: BTreeMap<String, usize>,
  /// Keyed by `YYYY-MM-DD`; records with unparsable timestamps are omitted.
  pub by_day:         BTreeMap<String, usize>,
}

pub fn statistics(log: &ValidationLog, filter: &StatsFilter) -> Statistics {
  let mut stats = Statistics::default();
  let mut variants = BTreeSet::new();
  let mut families = BTreeSet::new();
  let mut samples = BTreeSet::new();

  for (kind, record) in log.iter() {
    if record.ignore {
      stats.ignored += 1;
      continue;
    }
    if !filter.types.is_empty() && !filter.types.contains(&kind) {
      continue;
    }
    if !filter.users.is_empty() && !filter.users.contains(&record.user) {
      continue;
    }

    stats.total += 1;
    variants.insert(record.variant_key.as_str());
    families.insert(record.family_id.as_str());
    samples.insert(record.sample_id.as_str());

    *stats.by_status.entry(record.status.to_string()).or_default() += 1;
    *stats.by_type.entry(kind.label().to_owned()).or_default() += 1;
    *stats.by_user.entry(record.user.clone()).or_default() += 1;
    *stats
      .by_inheritance
      .entry(record.inheritance.to_string())
      .or_default() += 1;
    if let Some(dt) = record.parsed_timestamp() {
      *stats
        .by_day
        .entry(dt.format("%Y-%m-%d").to_string())
        .or_default() += 1;
    }
  }

  stats.variants = variants.len();
  stats.families = families.len();
  stats.samples = samples.len();
  stats
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::record::Status;

  fn rec(
    variant: &str,
    sample: &str,
    user: &str,
    status: &str,
    ts: &str,
  ) -> ValidationRecord {
    ValidationRecord {
      family_id:     "FAM1".into(),
      variant_key:   variant.into(),
      sample_id:     sample.into(),
      user:          user.into(),
      inheritance:   Inheritance::Unknown,
      status:        Status::from(status),
      curated_start: None,
      curated_end:   None,
      comment:       None,
      ignore:        false,
      timestamp:     ts.into(),
    }
  }

  fn log() -> ValidationLog {
    let mut ignored = rec("chr2:5:C:T", "child1", "carol", "absent", "2024-01-05T09:00:00");
    ignored.ignore = true;
    let mut curated_sv =
      rec("chr3:1000-2000:del", "child1", "alice", "present", "2024-02-10T12:00:00");
    curated_sv.curated_start = Some("1100".into());
    ValidationLog {
      snvs: vec![
        rec("chr1:100:A:G", "child1", "alice", "present", "2024-01-01T10:00:00"),
        rec("chr1:100:A:G", "child1", "bob", "present", "2024-01-03T10:00:00"),
        rec("chr1:200:G:A", "child1", "bob", "absent", "2024-01-02T10:00:00"),
        ignored,
      ],
      svs:  vec![
        curated_sv,
        rec("chr3:5000-9000:dup", "mother1", "bob", "uncertain", "2024-03-01T08:00:00"),
        rec("chr3:5000-9000:dup", "mother1", "alice", "present", "2024-03-02T08:00:00"),
      ],
    }
  }

  #[test]
  fn summarize_groups_and_reduces() {
    let rows = summarize(&log(), &SummaryFilter::default());
    assert_eq!(rows.len(), 4);

    let first = &rows[0];
    assert_eq!(first.variant_key, "chr1:100:A:G");
    assert_eq!(first.users, ["alice", "bob"]);
    assert_eq!(first.users_joined(), "alice, bob");
    assert_eq!(first.status, ConsensusStatus::Present);
    assert_eq!(first.timestamp, "2024-01-03T10:00:00");

    assert_eq!(rows[1].status, ConsensusStatus::Absent);
    assert_eq!(rows[3].status, ConsensusStatus::Conflicting);
  }

  #[test]
  fn summarize_skips_fully_ignored_groups() {
    let rows = summarize(&log(), &SummaryFilter::default());
    assert!(rows.iter().all(|r| r.variant_key != "chr2:5:C:T"));
  }

  #[test]
  fn summarize_shows_curated_sv_locus() {
    let rows = summarize(&log(), &SummaryFilter::default());
    let sv = rows
      .iter()
      .find(|r| r.variant_key == "chr3:1000-2000:del")
      .unwrap();
    assert!(sv.is_curated());
    assert_eq!(sv.display_variant, "chr3:1100-2000:del");
  }

  #[test]
  fn summarize_filters_by_type_status_and_user() {
    let filter = SummaryFilter {
      types: [VariantType::Sv].into(),
      ..Default::default()
    };
    assert_eq!(summarize(&log(), &filter).len(), 2);

    let filter = SummaryFilter {
      statuses: [ConsensusStatus::Conflicting].into(),
      ..Default::default()
    };
    let rows = summarize(&log(), &filter);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].sample_id, "mother1");

    let filter = SummaryFilter {
      users: ["carol".to_owned()].into(),
      ..Default::default()
    };
    assert!(summarize(&log(), &filter).is_empty());
  }

  #[test]
  fn summarize_filters_by_date() {
    let filter = SummaryFilter {
      date: Some("before:2024-01-03".parse().unwrap()),
      ..Default::default()
    };
    let rows = summarize(&log(), &filter);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].variant_key, "chr1:200:G:A");

    let filter = SummaryFilter {
      date: Some("2024-01-03..2024-02-10".parse().unwrap()),
      ..Default::default()
    };
    assert_eq!(summarize(&log(), &filter).len(), 2);
  }

  #[test]
  fn date_filter_parsing() {
    let d = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    assert_eq!("after:2024-05-01".parse::<DateFilter>().unwrap(), DateFilter::After(d));
    assert!("since:2024-05-01".parse::<DateFilter>().is_err());
    assert!("before:05/01/2024".parse::<DateFilter>().is_err());
    assert!(!DateFilter::After(d).matches("garbage"));
  }

  #[test]
  fn statistics_counts_active_records() {
    let stats = statistics(&log(), &StatsFilter::default());
    assert_eq!(stats.total, 6);
    assert_eq!(stats.ignored, 1);
    assert_eq!(stats.variants, 4);
    assert_eq!(stats.families, 1);
    assert_eq!(stats.samples, 2);
    assert_eq!(stats.by_status["present"], 4);
    assert_eq!(stats.by_type["SNV"], 3);
    assert_eq!(stats.by_type["SV"], 3);
    assert_eq!(stats.by_user["bob"], 3);
    assert_eq!(stats.by_inheritance["unknown"], 6);
    assert_eq!(stats.by_day.len(), 6);
  }

  #[test]
  fn statistics_filters_do_not_touch_ignored_count() {
    let filter = StatsFilter {
      types: [VariantType::Sv].into(),
      users: ["alice".to_owned()].into(),
    };
    let stats = statistics(&log(), &filter);
    assert_eq!(stats.total, 2);
    assert_eq!(stats.ignored, 1);
    assert!(!stats.by_type.contains_key("SNV"));
  }
}
