//! # docqa CLI
//!
//! The `docqa` binary ingests documents and answers questions about them.
//!
//! ## Usage
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa init` | Create the SQLite index and run schema migrations |
//! | `docqa ingest <path>` | Extract, chunk, embed, and index one document |
//! | `docqa ask [question]` | Answer one question, or loop over stdin |
//! | `docqa search "<query>"` | Show ranked evidence without calling the LLM |
//! | `docqa stats` | Summarize the index |
//! | `docqa serve` | Start the HTTP server |
//!
//! Logs go to stderr; set `RUST_LOG` or pass `-v` / `-vv`.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docqa::config::{self, DEFAULT_CONFIG_PATH};
use docqa::{ask, ingest, migrate, search, server, stats};

/// docqa: ask questions about your documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file falls back to built-in defaults.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "docqa: document question answering over a vector index",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` wins when set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the index schema.
    ///
    /// Creates the SQLite database file and the chunks table. Running it
    /// more than once is safe.
    Init,

    /// Ingest one document.
    ///
    /// PDFs are text-extracted; other files are read as UTF-8. Every
    /// upload is a new document, even when the text was seen before.
    Ingest {
        /// File to ingest.
        path: PathBuf,

        /// Override the content type inferred from the file extension.
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Answer a question from the indexed documents.
    ///
    /// Without a question, reads questions from stdin until `exit` or EOF.
    Ask {
        question: Option<String>,

        /// Number of evidence chunks to retrieve.
        #[arg(long)]
        k: Option<usize>,
    },

    /// Show the ranked evidence for a query.
    Search {
        query: String,

        /// Number of results.
        #[arg(long)]
        k: Option<usize>,
    },

    /// Print index statistics.
    Stats,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        tracing::info!(path = %cli.config.display(), "config file not found; using defaults");
        let cfg = config::Config::default();
        config::validate(&cfg)?;
        cfg
    };

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Index initialized at {}", cfg.index.path.display());
        }
        Commands::Ingest { path, content_type } => {
            ingest::run_ingest(&cfg, &path, content_type).await?;
        }
        Commands::Ask { question, k } => {
            ask::run_ask(&cfg, question, k).await?;
        }
        Commands::Search { query, k } => {
            search::run_search(&cfg, &query, k).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
