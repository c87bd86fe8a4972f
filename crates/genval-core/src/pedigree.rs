//! Parent lookup and companion-record synthesis.
//!
//! When a child's variant is validated present and inherited from a parent,
//! the parent is assumed to carry it as well. The store appends a companion
//! record for each implicated parent that has no record of its own yet.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::record::{Inheritance, Status, ValidationRecord};

/// A sample's parents as known to the pedigree. Either may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Parents {
  pub father: Option<String>,
  pub mother: Option<String>,
}

impl Parents {
  pub fn none() -> Self { Self::default() }
}

/// Source of family structure, e.g. a pedigree file.
pub trait ParentLookup {
  /// Parents of `sample_id`; both `None` when the sample is unknown.
  fn parents(&self, sample_id: &str) -> Parents;
}

impl ParentLookup for HashMap<String, Parents> {
  fn parents(&self, sample_id: &str) -> Parents {
    self.get(sample_id).cloned().unwrap_or_default()
  }
}

/// Comment attached to a synthesized parent record.
pub fn inherited_comment(child: &str) -> String {
  format!("(inherited from {child})")
}

/// Companion records implied by `record`.
///
/// `existing` is the log as it stood before `record` was appended. A parent
/// that already has *any* row for the same family and variant, ignored or
/// not, gets no companion.
pub fn plan_companions(
  record: &ValidationRecord,
  parents: &Parents,
  existing: &[ValidationRecord],
) -> Vec<ValidationRecord> {
  if !record.implicates_parents() {
    return Vec::new();
  }

  let wanted: Vec<&String> = match record.inheritance {
    Inheritance::Maternal => parents.mother.iter().collect(),
    Inheritance::Paternal => parents.father.iter().collect(),
    Inheritance::Either => parents.mother.iter().chain(parents.father.iter()).collect(),
    _ => Vec::new(),
  };

  let already: HashSet<&str> = existing
    .iter()
    .filter(|r| {
      r.family_id == record.family_id && r.variant_key == record.variant_key
    })
    .map(|r| r.sample_id.as_str())
    .collect();

  wanted
    .into_iter()
    .filter(|parent| !parent.is_empty() && !already.contains(parent.as_str()))
    .map(|parent| ValidationRecord {
      family_id:     record.family_id.clone(),
      variant_key:   record.variant_key.clone(),
      sample_id:     parent.clone(),
      user:          record.user.clone(),
      inheritance:   Inheritance::Unknown,
      status:        Status::Present,
      curated_start: record.curated_start.clone(),
      curated_end:   record.curated_end.clone(),
      comment:       Some(inherited_comment(&record.sample_id)),
      ignore:        false,
      timestamp:     record.timestamp.clone(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn child(inheritance: Inheritance) -> ValidationRecord {
    ValidationRecord {
      family_id: "FAM1".into(),
      variant_key: "chr1:1000:A:G".into(),
      sample_id: "child1".into(),
      user: "alice".into(),
      inheritance,
      status: Status::Present,
      curated_start: None,
      curated_end: None,
      comment: None,
      ignore: false,
      timestamp: "2024-03-11T14:22:05.123456".into(),
    }
  }

  fn family() -> Parents {
    Parents {
      father: Some("father1".into()),
      mother: Some("mother1".into()),
    }
  }

  #[test]
  fn maternal_synthesizes_mother_only() {
    let planned = plan_companions(&child(Inheritance::Maternal), &family(), &[]);
    assert_eq!(planned.len(), 1);
    let mother = &planned[0];
    assert_eq!(mother.sample_id, "mother1");
    assert_eq!(mother.status, Status::Present);
    assert_eq!(mother.inheritance, Inheritance::Unknown);
    assert_eq!(mother.comment.as_deref(), Some("(inherited from child1)"));
    assert_eq!(mother.user, "alice");
    assert_eq!(mother.timestamp, "2024-03-11T14:22:05.123456");
    assert!(!mother.ignore);
  }

  #[test]
  fn paternal_synthesizes_father_only() {
    let planned = plan_companions(&child(Inheritance::Paternal), &family(), &[]);
    assert_eq!(planned.len(), 1);
    assert_eq!(planned[0].sample_id, "father1");
  }

  #[test]
  fn either_synthesizes_both_parents() {
    let planned = plan_companions(&child(Inheritance::Either), &family(), &[]);
    let samples: Vec<_> = planned.iter().map(|r| r.sample_id.as_str()).collect();
    assert_eq!(samples, ["mother1", "father1"]);
  }

  #[test]
  fn existing_parent_record_suppresses_companion_even_if_ignored() {
    let mut existing = child(Inheritance::Unknown);
    existing.sample_id = "mother1".into();
    existing.status = Status::Absent;
    existing.ignore = true;
    let planned =
      plan_companions(&child(Inheritance::Either), &family(), &[existing]);
    let samples: Vec<_> = planned.iter().map(|r| r.sample_id.as_str()).collect();
    assert_eq!(samples, ["father1"]);
  }

  #[test]
  fn record_for_other_family_does_not_suppress() {
    let mut existing = child(Inheritance::Unknown);
    existing.sample_id = "mother1".into();
    existing.family_id = "FAM2".into();
    let planned =
      plan_companions(&child(Inheritance::Maternal), &family(), &[existing]);
    assert_eq!(planned.len(), 1);
  }

  #[test]
  fn missing_parent_is_skipped() {
    let parents = Parents { father: None, mother: None };
    assert!(plan_companions(&child(Inheritance::Maternal), &parents, &[]).is_empty());
  }

  #[test]
  fn non_present_or_non_parental_records_plan_nothing() {
    let mut absent = child(Inheritance::Maternal);
    absent.status = Status::Absent;
    assert!(plan_companions(&absent, &family(), &[]).is_empty());
    assert!(plan_companions(&child(Inheritance::DeNovo), &family(), &[]).is_empty());
    assert!(
      plan_companions(&child(Inheritance::NotMaternal), &family(), &[]).is_empty()
    );
  }

  #[test]
  fn companions_carry_curated_boundary() {
    let mut sv = child(Inheritance::Maternal);
    sv.variant_key = "chr1:100-900:del".into();
    sv.curated_start = Some("120".into());
    let planned = plan_companions(&sv, &family(), &[]);
    assert_eq!(planned[0].curated_start.as_deref(), Some("120"));
  }

  #[test]
  fn hashmap_lookup() {
    let mut map = HashMap::new();
    map.insert("child1".to_owned(), family());
    assert_eq!(map.parents("child1"), family());
    assert_eq!(map.parents("nobody"), Parents::none());
  }
}
