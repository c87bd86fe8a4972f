//! `genval` — record and reconcile manual variant validations.
//!
//! # Usage
//!
//! ```
//! genval validate --type snv --family FAM1 --variant chr1:1000:A:G \
//!   --sample child1 --status present --inheritance maternal
//! genval consensus --type sv --variant chr2:100-900:del --sample child1
//! genval list --status conflicting --date after:2024-01-01
//! genval stats --json
//! ```

mod output;
mod settings;

use std::{
  io::IsTerminal as _,
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use genval_core::{
  consensus::{ConsensusStatus, index},
  pedigree::{ParentLookup as _, Parents},
  record::{Inheritance, NewValidation, Status, VariantType},
  store::ValidationStore as _,
  summary::{DateFilter, StatsFilter, SummaryFilter, statistics, summarize},
};
use genval_store_tsv::{Pedigree, TsvStore};
use settings::{Settings, SharedSettings};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "genval", version, about = "Record and reconcile manual variant validations")]
struct Cli {
  /// Path to a TOML config file.
  #[arg(short, long, value_name = "FILE", default_value = "genval.toml", global = true)]
  config: PathBuf,

  /// Override the configured data directory.
  #[arg(long, value_name = "DIR", global = true)]
  data_dir: Option<PathBuf>,

  /// Print machine-readable JSON instead of text.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Append a validation (and any inherited parent records).
  Validate(ValidateArgs),
  /// Every record for one variant in one sample, oldest first.
  History(KeyArgs),
  /// The reconciled status for one variant in one sample.
  Consensus(KeyArgs),
  /// One row per validated variant and sample.
  List(ListArgs),
  /// Counts across both logs.
  Stats(StatsArgs),
  /// Print the effective configuration.
  Config,
}

const STATUSES: [&str; 5] = ["present", "in phase MNV", "absent", "uncertain", "different"];

const INHERITANCES: [&str; 8] = [
  "unknown",
  "de novo",
  "paternal",
  "maternal",
  "not paternal",
  "not maternal",
  "either",
  "homozygous",
];

#[derive(Args, Debug)]
struct ValidateArgs {
  #[arg(long = "type", value_name = "snv|sv")]
  kind:          VariantType,
  #[arg(long)]
  family:        String,
  #[arg(long)]
  variant:       String,
  #[arg(long)]
  sample:        String,
  #[arg(long, value_parser = STATUSES)]
  status:        String,
  #[arg(long, value_parser = INHERITANCES, default_value = "unknown")]
  inheritance:   String,
  /// Submitter; defaults to the configured user, then `$USER`.
  #[arg(long)]
  user:          Option<String>,
  #[arg(long)]
  curated_start: Option<String>,
  #[arg(long)]
  curated_end:   Option<String>,
  #[arg(long)]
  comment:       Option<String>,
  /// Record the validation but exclude it from consensus.
  #[arg(long)]
  ignore:        bool,
}

#[derive(Args, Debug)]
struct KeyArgs {
  #[arg(long = "type", value_name = "snv|sv")]
  kind:    VariantType,
  #[arg(long)]
  variant: String,
  #[arg(long)]
  sample:  String,
  /// Restrict to one family.
  #[arg(long)]
  family:  Option<String>,
}

#[derive(Args, Debug)]
struct ListArgs {
  #[arg(long = "type", value_name = "snv|sv")]
  kinds:    Vec<VariantType>,
  #[arg(long = "status", value_parser = parse_consensus_status)]
  statuses: Vec<ConsensusStatus>,
  #[arg(long = "user")]
  users:    Vec<String>,
  /// `before:YYYY-MM-DD`, `after:YYYY-MM-DD` or `YYYY-MM-DD..YYYY-MM-DD`.
  #[arg(long)]
  date:     Option<DateFilter>,
}

#[derive(Args, Debug)]
struct StatsArgs {
  #[arg(long = "type", value_name = "snv|sv")]
  kinds: Vec<VariantType>,
  #[arg(long = "user")]
  users: Vec<String>,
}

fn parse_consensus_status(s: &str) -> Result<ConsensusStatus, String> {
  ConsensusStatus::parse(s).ok_or_else(|| {
    let known: Vec<_> = ConsensusStatus::ALL.iter().map(|c| c.as_str()).collect();
    format!("unknown status `{s}` (expected one of: {})", known.join(", "))
  })
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  // Logs go to stderr so JSON on stdout stays parseable.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let shared = SharedSettings::load(&cli.config)?;
  let settings = shared.get();

  let data_dir = expand_tilde(cli.data_dir.as_deref().unwrap_or(&settings.data_dir));
  let store = TsvStore::open(&data_dir);
  tracing::debug!(dir = %store.dir().display(), "using validation store");

  let colored = !cli.json && std::io::stdout().is_terminal();

  match cli.command {
    Command::Validate(args) => validate(&store, &settings, args, cli.json).await,
    Command::History(args) => {
      let records: Vec<_> = store
        .load(args.kind)
        .await
        .context("failed to load validations")?
        .into_iter()
        .filter(|r| r.variant_key == args.variant && r.sample_id == args.sample)
        .filter(|r| args.family.as_ref().is_none_or(|f| &r.family_id == f))
        .collect();
      if cli.json {
        print_json(&records)
      } else {
        print!("{}", output::render_history(&records));
        Ok(())
      }
    }
    Command::Consensus(args) => {
      let records = store.load(args.kind).await.context("failed to load validations")?;
      let idx = index(records, args.family.as_deref());
      let result = idx.consensus_for(&args.variant, &args.sample);
      if cli.json {
        print_json(&result)
      } else {
        print!(
          "{}",
          output::render_consensus(args.kind, &args.variant, &args.sample, &result)
        );
        Ok(())
      }
    }
    Command::List(args) => {
      let log = store.load_log().await.context("failed to load validations")?;
      let filter = SummaryFilter {
        types:    args.kinds.into_iter().collect(),
        statuses: args.statuses.into_iter().collect(),
        users:    args.users.into_iter().collect(),
        date:     args.date,
      };
      let rows = summarize(&log, &filter);
      if cli.json {
        print_json(&rows)
      } else {
        print!("{}", output::render_summary(&rows, &settings, colored));
        Ok(())
      }
    }
    Command::Stats(args) => {
      let log = store.load_log().await.context("failed to load validations")?;
      let filter = StatsFilter {
        types: args.kinds.into_iter().collect(),
        users: args.users.into_iter().collect(),
      };
      let stats = statistics(&log, &filter);
      if cli.json {
        print_json(&stats)
      } else {
        print!("{}", output::render_stats(&stats, &settings, colored));
        Ok(())
      }
    }
    Command::Config => {
      // Re-read so edits made since startup are reflected.
      let current = shared.reload()?;
      tracing::info!(path = %shared.path().display(), "effective configuration");
      print_json(&*current)
    }
  }
}

// ─── validate ────────────────────────────────────────────────────────────────

async fn validate(
  store: &TsvStore,
  settings: &Settings,
  args: ValidateArgs,
  json: bool,
) -> Result<()> {
  let user = args
    .user
    .or_else(|| settings.user.clone())
    .or_else(|| std::env::var("USER").ok())
    .context("no user given; pass --user or set `user` in the config file")?;

  let inheritance = Inheritance::from(args.inheritance.as_str());
  let parents = if inheritance.implicates_parent() {
    resolve_parents(settings, &args.family, &args.sample)?
  } else {
    Parents::none()
  };

  let mut input = NewValidation::new(
    args.family,
    args.variant,
    args.sample,
    user,
    Status::from(args.status.as_str()),
  )
  .with_inheritance(inheritance)
  .with_curated(args.curated_start, args.curated_end);
  if let Some(comment) = args.comment {
    input = input.with_comment(comment);
  }
  input.ignore = args.ignore;

  let outcome = store
    .append(args.kind, input, parents)
    .await
    .context("failed to save validation")?;

  if json {
    return print_json(&outcome);
  }
  let record = &outcome.record;
  println!(
    "saved {} validation: {} in {} is {}",
    args.kind, record.variant_key, record.sample_id, record.status
  );
  if !outcome.companions.is_empty() {
    let samples: Vec<_> = outcome.companions.iter().map(|c| c.sample_id.as_str()).collect();
    println!("also saved for {}", samples.join(", "));
  }
  Ok(())
}

fn resolve_parents(settings: &Settings, family_id: &str, sample_id: &str) -> Result<Parents> {
  let Some(path) = &settings.pedigree else {
    tracing::warn!("no pedigree configured; parent records will not be added");
    return Ok(Parents::none());
  };
  let path = expand_tilde(path);
  let pedigree = Pedigree::load(&path)
    .with_context(|| format!("failed to read pedigree {}", path.display()))?;
  Ok(parents_in_family(&pedigree, family_id, sample_id))
}

/// Parents of `sample_id`, unless the pedigree places the sample in another
/// family.
fn parents_in_family(pedigree: &Pedigree, family_id: &str, sample_id: &str) -> Parents {
  let Some(member) = pedigree.member(sample_id) else {
    tracing::warn!(sample = sample_id, "sample not in pedigree; parent records will not be added");
    return Parents::none();
  };
  if let Some(listed) = member.family_id.as_deref()
    && listed != family_id
  {
    tracing::warn!(
      sample = sample_id,
      family = family_id,
      pedigree_family = listed,
      "sample belongs to another family in the pedigree; parent records will not be added"
    );
    return Parents::none();
  }
  pedigree.parents(sample_id)
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
  let text = serde_json::to_string_pretty(value).context("failed to serialise output")?;
  println!("{text}");
  Ok(())
}

fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("genval").chain(args.iter().copied())).unwrap()
  }

  #[test]
  fn validate_args() {
    let cli = parse(&[
      "validate", "--type", "SV", "--family", "FAM1", "--variant", "chr1:1-9:del",
      "--sample", "kid", "--status", "in phase MNV", "--inheritance", "de novo",
    ]);
    let Command::Validate(args) = cli.command else {
      panic!("expected validate");
    };
    assert_eq!(args.kind, VariantType::Sv);
    assert_eq!(args.status, "in phase MNV");
    assert_eq!(args.inheritance, "de novo");
    assert!(!args.ignore);
    assert_eq!(cli.config, PathBuf::from("genval.toml"));
  }

  #[test]
  fn validate_rejects_unknown_status() {
    let result = Cli::try_parse_from([
      "genval", "validate", "--type", "snv", "--family", "F", "--variant", "v",
      "--sample", "s", "--status", "maybe",
    ]);
    assert!(result.is_err());
  }

  #[test]
  fn list_filters() {
    let cli = parse(&[
      "list", "--type", "snv", "--status", "conflicting", "--status", "absent",
      "--user", "alice", "--date", "2024-01-01..2024-02-01", "--json",
    ]);
    assert!(cli.json);
    let Command::List(args) = cli.command else {
      panic!("expected list");
    };
    assert_eq!(args.kinds, vec![VariantType::Snv]);
    assert_eq!(
      args.statuses,
      vec![ConsensusStatus::Conflicting, ConsensusStatus::Absent]
    );
    assert!(args.date.is_some());
  }

  #[test]
  fn list_rejects_bad_date() {
    assert!(Cli::try_parse_from(["genval", "list", "--date", "soon"]).is_err());
  }

  #[test]
  fn global_flags_after_subcommand() {
    let cli = parse(&["stats", "--config", "/etc/genval.toml", "--data-dir", "/srv"]);
    assert_eq!(cli.config, PathBuf::from("/etc/genval.toml"));
    assert_eq!(cli.data_dir, Some(PathBuf::from("/srv")));
  }

  #[test]
  fn missing_pedigree_means_no_parents() {
    let settings = Settings::default();
    assert_eq!(resolve_parents(&settings, "F", "kid").unwrap(), Parents::none());
  }

  #[test]
  fn pedigree_resolves_parents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ped.tsv");
    std::fs::write(&path, "FID\tIID\tFather\tMother\nF\tkid\tdad\tmum\n").unwrap();
    let settings = Settings { pedigree: Some(path), ..Settings::default() };
    let parents = resolve_parents(&settings, "F", "kid").unwrap();
    assert_eq!(parents.father.as_deref(), Some("dad"));
    assert_eq!(parents.mother.as_deref(), Some("mum"));
  }

  #[test]
  fn pedigree_family_mismatch_means_no_parents() {
    let pedigree =
      Pedigree::from_reader("FID\tIID\tFather\tMother\nF\tkid\tdad\tmum\n".as_bytes()).unwrap();
    assert_eq!(parents_in_family(&pedigree, "OTHER", "kid"), Parents::none());
    assert_eq!(parents_in_family(&pedigree, "F", "stranger"), Parents::none());
    assert_eq!(
      parents_in_family(&pedigree, "F", "kid").mother.as_deref(),
      Some("mum")
    );
  }

  #[test]
  fn expand_tilde_leaves_absolute_paths() {
    assert_eq!(expand_tilde(Path::new("/srv/data")), PathBuf::from("/srv/data"));
  }
}
