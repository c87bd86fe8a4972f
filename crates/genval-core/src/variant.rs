//! Variant keys and genomic loci.
//!
//! Keys are stored as free text and are never validated on write. Parsing is
//! fail-soft: anything that does not match the expected shape yields `None`
//! and the caller falls back to treating the key as an opaque string.

use std::fmt;

use serde::Serialize;

/// Browser windows are this many times wider than the locus they frame.
pub const EXPANSION_FACTOR: f64 = 1.6;

// ─── Locus ───────────────────────────────────────────────────────────────────

/// A closed genomic interval, rendered as `chrom:start-end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Locus {
  pub chrom: String,
  pub start: u64,
  pub end:   u64,
}

impl Locus {
  /// The window shown around this locus: same centre, 1.6x the length,
  /// start clamped at zero.
  pub fn expanded(&self) -> Locus {
    let (lo, hi) = if self.start <= self.end {
      (self.start, self.end)
    } else {
      (self.end, self.start)
    };
    let center = lo + (hi - lo) / 2;
    let length = ((hi - lo) as f64 * EXPANSION_FACTOR) as u64;
    Locus {
      chrom: self.chrom.clone(),
      start: center.saturating_sub(length / 2),
      end:   center.saturating_add(length / 2),
    }
  }
}

impl fmt::Display for Locus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}-{}", self.chrom, self.start, self.end)
  }
}

// ─── SNV ─────────────────────────────────────────────────────────────────────

/// `chrom:pos:ref:alt`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnvKey {
  pub chrom:     String,
  pub pos:       u64,
  pub reference: String,
  pub alternate: String,
}

impl SnvKey {
  pub fn parse(key: &str) -> Option<Self> {
    let mut parts = key.split(':');
    let chrom = parts.next()?;
    let pos = parts.next()?.parse().ok()?;
    let reference = parts.next()?;
    let alternate = parts.next()?;
    if parts.next().is_some() || chrom.is_empty() {
      return None;
    }
    Some(Self {
      chrom: chrom.to_owned(),
      pos,
      reference: reference.to_owned(),
      alternate: alternate.to_owned(),
    })
  }
}

impl fmt::Display for SnvKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}:{}:{}:{}",
      self.chrom, self.pos, self.reference, self.alternate
    )
  }
}

// ─── SV ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SvKind {
  Del,
  Dup,
}

impl SvKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Del => "del",
      Self::Dup => "dup",
    }
  }

  fn parse(s: &str) -> Option<Self> {
    match s.to_ascii_lowercase().as_str() {
      "del" => Some(Self::Del),
      "dup" => Some(Self::Dup),
      _ => None,
    }
  }
}

/// `chrom:start-end:type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SvKey {
  pub chrom: String,
  pub start: u64,
  pub end:   u64,
  pub kind:  SvKind,
}

impl SvKey {
  pub fn parse(key: &str) -> Option<Self> {
    let mut parts = key.split(':');
    let chrom = parts.next()?;
    let (start, end) = parts.next()?.split_once('-')?;
    let kind = SvKind::parse(parts.next()?)?;
    if parts.next().is_some() || chrom.is_empty() {
      return None;
    }
    Some(Self {
      chrom: chrom.to_owned(),
      start: start.trim().parse().ok()?,
      end: end.trim().parse().ok()?,
      kind,
    })
  }

  pub fn locus(&self) -> Locus {
    Locus {
      chrom: self.chrom.clone(),
      start: self.start,
      end:   self.end,
    }
  }

  /// The key with its breakpoints replaced, e.g. for showing a curated call.
  pub fn with_locus(&self, locus: &Locus) -> String {
    format!("{}:{}-{}:{}", locus.chrom, locus.start, locus.end, self.kind.as_str())
  }
}

impl fmt::Display for SvKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.locus(), self.kind.as_str())
  }
}

// ─── VariantKey ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VariantKey {
  Snv(SnvKey),
  Sv(SvKey),
}

impl VariantKey {
  /// Parse either key shape; `None` if neither matches.
  pub fn parse(key: &str) -> Option<Self> {
    SvKey::parse(key)
      .map(Self::Sv)
      .or_else(|| SnvKey::parse(key).map(Self::Snv))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_snv_key() {
    let key = SnvKey::parse("chr1:1000:A:G").unwrap();
    assert_eq!(key.chrom, "chr1");
    assert_eq!(key.pos, 1000);
    assert_eq!(key.reference, "A");
    assert_eq!(key.alternate, "G");
    assert_eq!(key.to_string(), "chr1:1000:A:G");
  }

  #[test]
  fn parses_sv_key() {
    let key = SvKey::parse("chr2:5000-9000:DUP").unwrap();
    assert_eq!(key.start, 5000);
    assert_eq!(key.end, 9000);
    assert_eq!(key.kind, SvKind::Dup);
    assert_eq!(key.to_string(), "chr2:5000-9000:dup");
  }

  #[test]
  fn malformed_keys_fail_soft() {
    for bad in ["", "chr1", "chr1:abc:A:G", "chr1:1:A:G:extra", ":1:A:G"] {
      assert!(SnvKey::parse(bad).is_none(), "{bad:?}");
    }
    for bad in ["chr1:100:del", "chr1:1-x:del", "chr1:1-2:inv", "chr1:1-2"] {
      assert!(SvKey::parse(bad).is_none(), "{bad:?}");
    }
    assert!(VariantKey::parse("not a variant").is_none());
  }

  #[test]
  fn variant_key_prefers_sv_shape() {
    assert!(matches!(
      VariantKey::parse("chr1:10-20:del"),
      Some(VariantKey::Sv(_))
    ));
    assert!(matches!(
      VariantKey::parse("chrX:10:C:T"),
      Some(VariantKey::Snv(_))
    ));
  }

  #[test]
  fn expanded_locus_is_wider_and_centred() {
    let locus = Locus { chrom: "chr1".into(), start: 1000, end: 2000 };
    let wide = locus.expanded();
    assert_eq!(wide.start, 700);
    assert_eq!(wide.end, 2300);
    assert_eq!(wide.to_string(), "chr1:700-2300");
  }

  #[test]
  fn expanded_locus_clamps_at_zero() {
    let locus = Locus { chrom: "chr1".into(), start: 0, end: 100 };
    let wide = locus.expanded();
    assert_eq!(wide.start, 0);
    assert_eq!(wide.end, 130);
  }

  #[test]
  fn expanded_locus_saturates_at_u64_max() {
    let locus = Locus { chrom: "chr1".into(), start: 100, end: u64::MAX };
    let wide = locus.expanded();
    assert!(wide.start <= 100);
    assert_eq!(wide.end, u64::MAX);
  }

  #[test]
  fn with_locus_rewrites_breakpoints() {
    let key = SvKey::parse("chr3:100-200:del").unwrap();
    let curated = Locus { chrom: "chr3".into(), start: 110, end: 190 };
    assert_eq!(key.with_locus(&curated), "chr3:110-190:del");
  }
}
