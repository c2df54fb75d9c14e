//! `softdel` — command-line manager for soft-deletable notes.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store it names, and runs one lifecycle operation per invocation.
//!
//! ```text
//! softdel add "call the plumber"
//! softdel delete 5f0c… --actor 42
//! softdel list --deleted
//! softdel restore-all
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use softdel_core::{
  ActorId, Entity, Lifecycle, LifecycleFilter, Record, RecordStore, SoftDeletable,
};
use softdel_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── Entity ──────────────────────────────────────────────────────────────────

/// A free-text note; the only entity this tool manages.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Note {
  body: String,
}

impl Entity for Note {
  const KIND: &'static str = "note";
}

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `config.toml` and `SOFTDEL_*`
/// environment variables.
#[derive(Debug, Deserialize)]
struct CliConfig {
  #[serde(default = "default_store_path")]
  store_path: PathBuf,
}

fn default_store_path() -> PathBuf { PathBuf::from("softdel.db") }

// ─── Command line ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Soft-delete, restore and purge notes")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create a new active note.
  Add { body: String },
  /// List notes (active only by default).
  List {
    /// Only soft-deleted notes.
    #[arg(long, conflicts_with = "all")]
    deleted: bool,
    /// Active and soft-deleted notes.
    #[arg(long)]
    all:     bool,
  },
  /// Print one note with its deletion columns as JSON.
  Show { id: Uuid },
  /// Soft-delete a note.
  Delete(Target),
  /// Restore a soft-deleted note.
  Restore(Target),
  /// Permanently delete a note, whatever its state.
  Purge { id: Uuid },
  /// Permanently delete every soft-deleted note.
  PurgeDeleted,
  /// Restore every soft-deleted note.
  RestoreAll,
}

#[derive(Args)]
struct Target {
  id:    Uuid,
  /// Identifier of the user performing the operation.
  #[arg(long)]
  actor: Option<ActorId>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("SOFTDEL"))
    .build()
    .context("failed to read config file")?;

  let cfg: CliConfig = settings
    .try_deserialize()
    .context("failed to deserialise CliConfig")?;

  let store_path = expand_tilde(&cfg.store_path);

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  run(Lifecycle::new(store), cli.command).await
}

async fn run(lc: Lifecycle<SqliteStore>, command: Command) -> anyhow::Result<()> {
  match command {
    Command::Add { body } => {
      let note = Record::new(Note { body });
      lc.store().add(&note).await?;
      lc.store().commit().await.context("failed to save note")?;
      println!("{}", note.record_id);
    }
    Command::List { deleted, all } => {
      let notes = if all {
        lc.store().query::<Note>(LifecycleFilter::Any).await?
      } else if deleted {
        lc.get_deleted::<Note>().await?
      } else {
        lc.get_active::<Note>().await?
      };
      for note in &notes {
        print_row(note);
      }
    }
    Command::Show { id } => {
      let note = fetch(&lc, id).await?;
      println!("{}", serde_json::to_string_pretty(&note)?);
    }
    Command::Delete(Target { id, actor }) => {
      let mut note = fetch(&lc, id).await?;
      lc.soft_delete(&mut note, actor).await?;
      // Soft-delete only flushes; the commit boundary is ours.
      lc.store().commit().await.context("failed to commit soft-delete")?;
      print_row(&note);
    }
    Command::Restore(Target { id, actor }) => {
      let mut note = fetch(&lc, id).await?;
      lc.restore(&mut note, actor).await?;
      print_row(&note);
    }
    Command::Purge { id } => {
      let note = fetch(&lc, id).await?;
      lc.force_delete(note).await?;
      println!("purged {id}");
    }
    Command::PurgeDeleted => {
      let count = lc.force_delete_all_deleted::<Note>().await?;
      println!("purged {count} note(s)");
    }
    Command::RestoreAll => {
      let count = lc.restore_all::<Note>().await?;
      println!("restored {count} note(s)");
    }
  }
  Ok(())
}

async fn fetch(lc: &Lifecycle<SqliteStore>, id: Uuid) -> anyhow::Result<Record<Note>> {
  lc.store()
    .get::<Note>(id)
    .await?
    .with_context(|| format!("no note with id {id}"))
}

fn print_row(note: &Record<Note>) {
  let deleted = note
    .deleted_at()
    .map(|at: DateTime<Utc>| format!(" (deleted {})", at.to_rfc3339()))
    .unwrap_or_default();
  println!("{}  {:<7}  {}{deleted}", note.record_id, note.state(), note.data.body);
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
