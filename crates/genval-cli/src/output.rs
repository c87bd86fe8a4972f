//! Plain-text rendering for the CLI's read commands.
//!
//! Every renderer returns a `String` so `main` decides where it goes and the
//! layouts can be asserted on directly.

use std::{collections::BTreeMap, fmt::Write as _};

use genval_core::{
  consensus::ConsensusResult,
  record::{ValidationRecord, VariantType, parse_timestamp},
  summary::{Statistics, SummaryRow},
  variant::VariantKey,
};

use crate::settings::Settings;

/// `2024-03-01T09:30:00.000000` → `2024-03-01 09:30:00`; unparsable text is
/// shown as-is.
pub fn format_timestamp(raw: &str) -> String {
  parse_timestamp(raw)
    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
    .unwrap_or_else(|| raw.to_owned())
}

fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
  let hex = hex.strip_prefix('#')?;
  if hex.len() != 6 {
    return None;
  }
  let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
  Some((channel(0)?, channel(2)?, channel(4)?))
}

/// A status label, wrapped in a 24-bit foreground colour when `colored`.
pub fn badge(settings: &Settings, label: &str, colored: bool) -> String {
  if !colored {
    return label.to_owned();
  }
  match hex_to_rgb(&settings.badge_color(label)) {
    Some((r, g, b)) => format!("\x1b[38;2;{r};{g};{b}m{label}\x1b[0m"),
    None => label.to_owned(),
  }
}

// ─── history ─────────────────────────────────────────────────────────────────

pub fn render_history(records: &[ValidationRecord]) -> String {
  if records.is_empty() {
    return "no validations on record\n".to_owned();
  }
  let mut out = String::new();
  for r in records {
    let _ = write!(
      out,
      "{}  {:<12} {:<14} {}",
      format_timestamp(&r.timestamp),
      r.user,
      r.status,
      r.inheritance,
    );
    if r.has_curated_boundary() {
      let _ = write!(
        out,
        "  curated {}-{}",
        r.curated_start.as_deref().unwrap_or("?"),
        r.curated_end.as_deref().unwrap_or("?"),
      );
    }
    if let Some(comment) = &r.comment {
      let _ = write!(out, "  # {comment}");
    }
    if r.ignore {
      out.push_str("  [ignored]");
    }
    out.push('\n');
  }
  out
}

// ─── consensus ───────────────────────────────────────────────────────────────

pub fn render_consensus(
  kind: VariantType,
  variant_key: &str,
  sample_id: &str,
  result: &ConsensusResult,
) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "{kind} {variant_key} in {sample_id}");
  let status = result.status.map_or("none", |s| s.as_str());
  let _ = writeln!(out, "  status:      {status}");
  if let Some(inheritance) = &result.inheritance {
    let _ = writeln!(out, "  inheritance: {inheritance}");
  }

  match (kind, VariantKey::parse(variant_key)) {
    (VariantType::Sv, Some(VariantKey::Sv(sv))) => {
      let locus = result.display_locus(&sv);
      let marker = if result.is_curated() { " (curated)" } else { "" };
      let _ = writeln!(out, "  locus:       {locus}{marker}");
      let _ = writeln!(out, "  view:        {}", locus.expanded());
    }
    (VariantType::Snv, Some(VariantKey::Snv(snv))) => {
      let _ = writeln!(
        out,
        "  position:    {}:{} {}>{}",
        snv.chrom, snv.pos, snv.reference, snv.alternate
      );
    }
    _ => {}
  }
  out
}

// ─── list ────────────────────────────────────────────────────────────────────

pub fn render_summary(rows: &[SummaryRow], settings: &Settings, colored: bool) -> String {
  if rows.is_empty() {
    return "no validations match\n".to_owned();
  }
  let mut out = String::new();
  for row in rows {
    let status = badge(settings, row.status.as_str(), colored);
    let inheritance = row
      .inheritance
      .as_ref()
      .map(|i| format!(" ({i})"))
      .unwrap_or_default();
    let curated = if row.is_curated() { " *" } else { "" };
    let _ = writeln!(
      out,
      "{:<3} {:<10} {}{}  {:<12} {}{}  [{}]  {}",
      row.variant_type.label(),
      row.family_id,
      row.display_variant,
      curated,
      row.sample_id,
      status,
      inheritance,
      row.users_joined(),
      format_timestamp(&row.timestamp),
    );
  }
  out
}

// ─── stats ───────────────────────────────────────────────────────────────────

fn section(
  out: &mut String,
  title: &str,
  counts: &BTreeMap<String, usize>,
  label: impl Fn(&str) -> String,
) {
  if counts.is_empty() {
    return;
  }
  let _ = writeln!(out, "\n{title}");
  for (key, n) in counts {
    let _ = writeln!(out, "  {:<16} {n}", label(key));
  }
}

pub fn render_stats(stats: &Statistics, settings: &Settings, colored: bool) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "validations  {}", stats.total);
  let _ = writeln!(out, "variants     {}", stats.variants);
  let _ = writeln!(out, "families     {}", stats.families);
  let _ = writeln!(out, "samples      {}", stats.samples);
  let _ = writeln!(out, "ignored      {}", stats.ignored);

  section(&mut out, "by status", &stats.by_status, |s| {
    badge(settings, s, colored)
  });
  section(&mut out, "by type", &stats.by_type, str::to_owned);
  section(&mut out, "by user", &stats.by_user, str::to_owned);
  section(&mut out, "by inheritance", &stats.by_inheritance, str::to_owned);
  section(&mut out, "by day", &stats.by_day, str::to_owned);
  out
}
