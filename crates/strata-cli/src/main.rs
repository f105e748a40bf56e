//! `strata`: administration commands for a Strata store.
//!
//! Reads `strata.toml` (or the path given with `--config`) layered with
//! `STRATA_*` environment variables, opens the SQLite store and synchronises
//! the built-in tables.
//!
//! # Usage
//!
//! ```text
//! strata init
//! strata systems
//! strata history --kind tenant --id 1 --at 2024-06-01T12:00:00Z
//! echo secret | strata hash-password
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use strata_core::{
  catalog::Catalog,
  entity::Entity,
  record::Record,
  store::TemporalStore,
  system::{System, Tenant},
  value::parse_timestamp,
};
use strata_store_sqlite::{SqliteStore, StoreConfig, bootstrap};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Strata temporal store administration")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "strata.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create missing tables and the default systems and tenant.
  Init,
  /// List current systems.
  Systems,
  /// List current tenants.
  Tenants,
  /// Show the versions of one system or tenant.
  History {
    #[arg(long, value_enum)]
    kind: Kind,
    #[arg(long)]
    id:   i64,
    /// Only versions active at this instant (RFC 3339).
    #[arg(long, value_parser = parse_instant)]
    at:   Option<DateTime<Utc>>,
  },
  /// Print the SHA-256 hex digest of a password read from stdin.
  HashPassword,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
  System,
  Tenant,
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, String> {
  parse_timestamp(s).ok_or_else(|| format!("not a timestamp: {s:?}"))
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if let Command::HashPassword = cli.command {
    let password = read_stdin_line()?;
    println!("{}", bootstrap::hash_password(&password));
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("STRATA")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read config file")?;

  let store_cfg: StoreConfig = settings
    .try_deserialize()
    .context("failed to deserialise StoreConfig")?;

  let store_path = expand_tilde(&store_cfg.store_path);
  let store = SqliteStore::open(
    &store_path,
    &Catalog::with_builtins(),
    store_cfg.statement_timeout(),
  )
  .await
  .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command {
    Command::Init => {
      let defaults = bootstrap::ensure_defaults(&store, &store_cfg)
        .await
        .context("failed to create default entries")?;
      print_json(&defaults)
    }
    Command::Systems => print_json(&current::<System>(&store).await?),
    Command::Tenants => print_json(&current::<Tenant>(&store).await?),
    Command::History { kind, id, at } => match kind {
      Kind::System => print_json(&history::<System>(&store, id, at).await?),
      Kind::Tenant => print_json(&history::<Tenant>(&store, id, at).await?),
    },
    Command::HashPassword => Ok(()),
  }
}

// ─── Commands ────────────────────────────────────────────────────────────────

async fn current<R: Record>(store: &SqliteStore) -> Result<Vec<R>> {
  let entities = store
    .get_all_current::<R>(None)
    .await
    .with_context(|| format!("failed to list {}", R::schema().name))?;
  Ok(entities.into_iter().filter_map(|e| e.current).collect())
}

async fn history<R: Record>(
  store: &SqliteStore,
  id: i64,
  at: Option<DateTime<Utc>>,
) -> Result<Option<Entity<R>>> {
  let entity = match at {
    Some(at) => store.get_entity_at_date_by_id::<R>(id, at).await,
    None => store.get_entity_by_id::<R>(id).await,
  };
  entity.with_context(|| format!("failed to read {} {id}", R::schema().name))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  let json = serde_json::to_string_pretty(value).context("failed to serialise output")?;
  println!("{json}");
  Ok(())
}

/// Read one line from stdin without its line ending.
fn read_stdin_line() -> Result<String> {
  use std::io::{self, BufRead};
  let mut line = String::new();
  io::stdin()
    .lock()
    .read_line(&mut line)
    .context("failed to read stdin")?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
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

  #[test]
  fn parses_history_args() {
    let cli = Cli::try_parse_from([
      "strata",
      "history",
      "--kind",
      "tenant",
      "--id",
      "3",
      "--at",
      "2024-06-01T12:00:00Z",
    ])
    .unwrap();
    let Command::History { kind, id, at } = cli.command else {
      panic!("expected history");
    };
    assert!(matches!(kind, Kind::Tenant));
    assert_eq!(id, 3);
    assert!(at.is_some());
    assert_eq!(cli.config, PathBuf::from("strata.toml"));
  }

  #[test]
  fn rejects_bad_instant() {
    assert!(parse_instant("yesterday").is_err());
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/x.db")), PathBuf::from(home).join("x.db"));
    assert_eq!(expand_tilde(Path::new("/abs.db")), PathBuf::from("/abs.db"));
  }
}
