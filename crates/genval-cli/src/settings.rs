//! Layered runtime configuration.
//!
//! Settings come from an optional TOML file overlaid with `GENVAL_*`
//! environment variables. [`SharedSettings`] holds the current value behind
//! a lock and can re-read its sources on demand, so long-lived consumers
//! receive the configuration as an injected handle instead of a global.

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
  sync::{Arc, RwLock},
};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// Colour used for statuses missing from every table.
pub const FALLBACK_COLOR: &str = "#6b7280";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
  /// Root of the dashboard data; logs live in `<data_dir>/validations/`.
  #[serde(default = "default_data_dir")]
  pub data_dir:      PathBuf,
  /// Tab-separated pedigree used to resolve parents for companion records.
  #[serde(default)]
  pub pedigree:      Option<PathBuf>,
  /// Default submitter name.
  #[serde(default)]
  pub user:          Option<String>,
  /// Badge colour per status, e.g. `present = "#22c55e"`.
  #[serde(default = "default_status_colors")]
  pub status_colors: BTreeMap<String, String>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      data_dir:      default_data_dir(),
      pedigree:      None,
      user:          None,
      status_colors: default_status_colors(),
    }
  }
}

fn default_data_dir() -> PathBuf { PathBuf::from("data") }

fn default_status_colors() -> BTreeMap<String, String> {
  [
    ("present", "#22c55e"),
    ("in phase MNV", "#16a34a"),
    ("absent", "#ef4444"),
    ("uncertain", "#f59e0b"),
    ("different", "#fb923c"),
    ("conflicting", "#fbbf24"),
  ]
  .into_iter()
  .map(|(k, v)| (k.to_owned(), v.to_owned()))
  .collect()
}

impl Settings {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let raw = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("GENVAL"))
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?;

    raw
      .try_deserialize()
      .context("failed to deserialise Settings")
  }

  /// Badge colour for `status`. Keys match case-insensitively; statuses
  /// absent from the configured table fall back to the built-in one.
  pub fn badge_color(&self, status: &str) -> String {
    let lookup = |table: &BTreeMap<String, String>| {
      table
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(status))
        .map(|(_, v)| v.clone())
    };
    lookup(&self.status_colors)
      .or_else(|| lookup(&default_status_colors()))
      .unwrap_or_else(|| FALLBACK_COLOR.to_owned())
  }
}

// ─── Shared handle ───────────────────────────────────────────────────────────

/// The current [`Settings`] plus the file they were read from.
///
/// Readers take a cheap `Arc` snapshot with [`SharedSettings::get`]; an
/// admin action calls [`SharedSettings::reload`] to pick up edits.
#[derive(Debug)]
pub struct SharedSettings {
  path:    PathBuf,
  current: RwLock<Arc<Settings>>,
}

impl SharedSettings {
  pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
    let path = path.into();
    let settings = Settings::load(&path)?;
    Ok(Self {
      path,
      current: RwLock::new(Arc::new(settings)),
    })
  }

  pub fn path(&self) -> &Path { &self.path }

  pub fn get(&self) -> Arc<Settings> {
    match self.current.read() {
      Ok(guard) => Arc::clone(&guard),
      Err(poisoned) => Arc::clone(&poisoned.into_inner()),
    }
  }

  /// Re-read every source. On failure the previous settings stay in effect.
  pub fn reload(&self) -> anyhow::Result<Arc<Settings>> {
    let fresh = Arc::new(Settings::load(&self.path)?);
    let mut guard = match self.current.write() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    *guard = Arc::clone(&fresh);
    tracing::info!(path = %self.path.display(), "configuration reloaded");
    Ok(fresh)
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use super::*;

  #[test]
  fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(settings.pedigree, None);
    assert_eq!(settings.status_colors, default_status_colors());
  }

  #[test]
  fn file_values_are_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("genval.toml");
    fs::write(
      &path,
      "data_dir = \"/srv/cohort\"\npedigree = \"/srv/cohort/ped.tsv\"\nuser = \"alice\"\n",
    )
    .unwrap();

    let settings = Settings::load(&path).unwrap();
    assert_eq!(settings.data_dir, PathBuf::from("/srv/cohort"));
    assert_eq!(settings.pedigree, Some(PathBuf::from("/srv/cohort/ped.tsv")));
    assert_eq!(settings.user.as_deref(), Some("alice"));
  }

  #[test]
  fn badge_color_falls_back() {
    let mut settings = Settings::default();
    settings.status_colors =
      [("present".to_owned(), "#000000".to_owned())].into_iter().collect();
    assert_eq!(settings.badge_color("present"), "#000000");
    assert_eq!(settings.badge_color("absent"), "#ef4444");
    assert_eq!(settings.badge_color("in phase mnv"), "#16a34a");
    assert_eq!(settings.badge_color("mystery"), FALLBACK_COLOR);
  }

  #[test]
  fn reload_picks_up_edits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("genval.toml");
    fs::write(&path, "user = \"alice\"\n").unwrap();

    let shared = SharedSettings::load(&path).unwrap();
    let before = shared.get();
    assert_eq!(before.user.as_deref(), Some("alice"));

    fs::write(&path, "user = \"bob\"\n").unwrap();
    shared.reload().unwrap();
    assert_eq!(shared.get().user.as_deref(), Some("bob"));
    // Snapshots taken earlier are unaffected.
    assert_eq!(before.user.as_deref(), Some("alice"));
  }

  #[test]
  fn failed_reload_keeps_previous_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("genval.toml");
    fs::write(&path, "user = \"alice\"\n").unwrap();
    let shared = SharedSettings::load(&path).unwrap();

    fs::write(&path, "user = [unterminated\n").unwrap();
    assert!(shared.reload().is_err());
    assert_eq!(shared.get().user.as_deref(), Some("alice"));
  }
}
