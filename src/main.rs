//! # notedex CLI (`ndx`)
//!
//! The `ndx` binary keeps a persisted knowledge index in sync with your
//! notes directories and answers questions against it.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ndx sync` | Incrementally sync the index with the notes directories |
//! | `ndx search "<query>"` | Search indexed notes |
//! | `ndx ask "<question>"` | Ask a question grounded in your notes |
//! | `ndx status` | Show what's indexed and when it was last synced |
//!
//! All commands accept a `--config` flag pointing to a TOML configuration
//! file; `NDX_NOTES_DIRS` and `NDX_PERSIST_DIR` override the file.

mod ask;
mod catalog;
mod chunk;
mod config;
mod embedding;
mod error;
mod fingerprint;
mod index;
mod llm;
mod models;
mod persist;
mod planner;
mod search;
mod source;
mod status;
mod sync;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// notedex — a local-first knowledge index over your notes.
#[derive(Parser)]
#[command(
    name = "ndx",
    about = "notedex — a local-first knowledge index over your notes",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ndx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Synchronize the index with the notes directories.
    ///
    /// Fingerprints every live note, re-indexes only those that are new
    /// or modified, and flushes one snapshot on success. Unchanged notes
    /// are never re-read or re-embedded.
    Sync {
        /// Ignore recorded fingerprints — re-index every note from scratch.
        #[arg(long)]
        full: bool,

        /// Show what would be synced without mutating the index.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of notes to upsert in this pass.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Search indexed notes.
    Search {
        /// The search query string.
        query: String,

        /// Search mode: `keyword`, `semantic` (vector), or `hybrid`
        /// (weighted merge). Semantic and hybrid require an embedding
        /// provider in config.
        #[arg(long, default_value = "keyword")]
        mode: String,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Ask a question, answered from your notes by an LLM.
    Ask {
        /// The question to answer.
        question: String,

        /// Model to use (e.g. `gemini-1.5-flash`, `gpt-4o`, `gpt-4o-mini`).
        /// Defaults to `llm.model` from config.
        #[arg(long)]
        model: Option<String>,

        /// Prior conversation context to fold into the prompt.
        #[arg(long)]
        context: Option<String>,
    },

    /// Show index status: note and chunk counts, embedding coverage,
    /// and last sync time.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Sync {
            full,
            dry_run,
            limit,
        } => {
            sync::run_sync(&cfg, full, dry_run, limit).await?;
        }
        Commands::Search { query, mode, limit } => {
            search::run_search(&cfg, &query, &mode, limit).await?;
        }
        Commands::Ask {
            question,
            model,
            context,
        } => {
            ask::run_ask(&cfg, &question, model, context).await?;
        }
        Commands::Status => {
            status::run_status(&cfg)?;
        }
    }

    Ok(())
}
