//! Binary entry point for tactic-dedupe.
//!
//! This binary provides the CLI interface for the tactic deduplication engine.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Args, Parser, Subcommand};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use tactic_dedupe::cli::{
    AddCommand, CompactCommand, ListCommand, MergeCommand, RebuildCacheCommand, RemoveCommand,
    SeedCommand, StatusCommand, read_tactics, read_tactics_file, resolve_key,
};
use tactic_dedupe::config::TacticConfig;
use tactic_dedupe::models::ListKey;
use tactic_dedupe::observability::{self, LoggingConfig};
use tactic_dedupe::services::BackendFactory;
use tactic_dedupe::services::deduplication::validate_threshold;
use tactic_dedupe::{Error, Result};

/// tactic-dedupe - Semantic deduplication for tactic lists.
#[derive(Parser)]
#[command(name = "tactic-dedupe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "TACTIC_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Similarity threshold in [0, 1]; overrides configuration.
    #[arg(short, long, global = true, value_parser = parse_threshold)]
    threshold: Option<f32>,

    #[command(subcommand)]
    command: Commands,
}

/// Selects one list.
#[derive(Args)]
struct Target {
    /// List key.
    #[arg(short, long)]
    key: Option<String>,

    /// Session id; targets `session:<id>:tactics`.
    #[arg(short, long, conflicts_with = "key")]
    session: Option<String>,
}

impl Target {
    fn resolve(&self) -> Result<ListKey> {
        resolve_key(self.key.as_deref(), self.session.as_deref())
    }
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Admit tactics into a list.
    Add {
        /// Tactics to admit; read from stdin when none are given.
        tactics: Vec<String>,

        /// File with one tactic per line.
        #[arg(short, long, conflicts_with = "tactics")]
        file: Option<PathBuf>,

        /// Print one JSON object per tactic.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        target: Target,
    },

    /// Remove near-duplicates from lists.
    Compact {
        /// List keys (default: agent:tactics).
        keys: Vec<String>,

        /// Session ids to compact as well.
        #[arg(short, long)]
        session: Vec<String>,
    },

    /// Print lists.
    List {
        /// List keys (default: agent:tactics).
        keys: Vec<String>,

        /// Session ids to print as well.
        #[arg(short, long)]
        session: Vec<String>,
    },

    /// Compact the winning and failed lists, then print all lists.
    Status {
        /// Session ids to print as well.
        #[arg(short, long)]
        session: Vec<String>,
    },

    /// Reset a list to the default tactics.
    Seed {
        /// File with one tactic per line instead of the defaults.
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[command(flatten)]
        target: Target,
    },

    /// Admit a source list into a target list, then delete the source.
    Merge {
        /// Target list key.
        #[arg(long, default_value = ListKey::WINNING)]
        into: String,

        #[command(flatten)]
        source: Target,
    },

    /// Remove one tactic and its cached vector.
    Remove {
        /// Exact tactic text.
        text: String,

        #[command(flatten)]
        target: Target,
    },

    /// Drop and recompute the vector cache of lists.
    RebuildCache {
        /// List keys (default: agent:tactics).
        keys: Vec<String>,

        /// Session ids to rebuild as well.
        #[arg(short, long)]
        session: Vec<String>,
    },
}

/// Main entry point.
fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match TacticConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let logging = LoggingConfig::from_settings(Some(&config.logging), cli.verbose);
    if let Err(e) = observability::init(&logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: TacticConfig) -> Result<()> {
    let threshold = cli.threshold.unwrap_or(config.dedupe.threshold);
    let engine = BackendFactory::create_engine(&config.store)?;
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::Add {
            tactics,
            file,
            json,
            target,
        } => {
            let tactics = collect_tactics(tactics, file)?;
            AddCommand::new(target.resolve()?, tactics)
                .with_json(json)
                .run(&engine, threshold, &mut out)
                .map(|_| ())
        },

        Commands::Compact { keys, session } => {
            CompactCommand::new(list_keys(keys, &session)?)
                .run(&engine, threshold, &mut out)
                .map(|_| ())
        },

        Commands::List { keys, session } => {
            ListCommand::new(list_keys(keys, &session)?).run(&engine, &mut out)
        },

        Commands::Status { session } => StatusCommand::new()
            .with_sessions(session_keys(&session)?)
            .run(&engine, threshold, &mut out),

        Commands::Seed { file, target } => {
            let key = target.resolve()?;
            let command = match file {
                Some(path) => SeedCommand::new(key, read_tactics_file(&path)?),
                None => SeedCommand::defaults(key),
            };
            command.run(&engine, threshold, &mut out).map(|_| ())
        },

        Commands::Merge { into, source } => {
            MergeCommand::new(source.resolve()?, ListKey::new(into)?)
                .run(&engine, threshold, &mut out)
                .map(|_| ())
        },

        Commands::Remove { text, target } => RemoveCommand::new(target.resolve()?, text)
            .run(&engine, &mut out)
            .map(|_| ()),

        Commands::RebuildCache { keys, session } => {
            RebuildCacheCommand::new(list_keys(keys, &session)?).run(&engine, &mut out)
        },
    }
}

/// Tactics from arguments, a file, or stdin when neither is given.
fn collect_tactics(args: Vec<String>, file: Option<PathBuf>) -> Result<Vec<String>> {
    if let Some(path) = file {
        return read_tactics_file(&path);
    }
    if !args.is_empty() {
        return Ok(args);
    }
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Err(Error::InvalidInput(
            "no tactics given; pass them as arguments, with --file, or on stdin".to_string(),
        ));
    }
    read_tactics(stdin.lock())
}

/// Keys from positional arguments and session ids; `agent:tactics` when both are empty.
fn list_keys(keys: Vec<String>, sessions: &[String]) -> Result<Vec<ListKey>> {
    let mut resolved = keys
        .into_iter()
        .map(ListKey::new)
        .collect::<Result<Vec<_>>>()?;
    resolved.extend(session_keys(sessions)?);
    if resolved.is_empty() {
        resolved.push(ListKey::tactics());
    }
    Ok(resolved)
}

fn session_keys(sessions: &[String]) -> Result<Vec<ListKey>> {
    sessions.iter().map(|id| ListKey::session(id)).collect()
}

fn parse_threshold(s: &str) -> std::result::Result<f32, String> {
    let value: f32 = s
        .trim()
        .parse()
        .map_err(|e| format!("'{s}' is not a number: {e}"))?;
    validate_threshold(value).map_err(|e| e.to_string())
}
