//! Command-line interface for ipcs.
//!
//! The catalog lives in memory only, so the CLI drives a whole session per
//! invocation: `run` replays a script of view events against a fresh
//! session, `check` validates one file, `config` shows resolved settings.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::config;
use crate::core::validation::Candidate;
use crate::core::{
    FilePayloadSource, Payload, PayloadSource, Preview, Session, SubmitOutcome, WorkflowError,
};
use crate::domain::{ContentKind, DisplayRow};

pub mod script;

use script::{parse_script, ScriptCommand};

/// ipcs - personal content catalog
#[derive(Parser, Debug)]
#[command(name = "ipcs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive a catalog session from a script of view events
    Run {
        /// Script file (one event per line)
        script: PathBuf,

        /// Print listings as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a file as content of the given kind
    Check {
        /// File to check
        path: PathBuf,

        /// Kind to validate against
        #[arg(short, long, value_enum)]
        kind: KindArg,

        /// Declared media type (guessed from the extension if not specified)
        #[arg(short, long)]
        media_type: Option<String>,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Content kind for CLI (maps to ContentKind)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Image,
    Video,
    Text,
    File,
}

impl From<KindArg> for ContentKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Image => ContentKind::Image,
            KindArg::Video => ContentKind::Video,
            KindArg::Text => ContentKind::Text,
            KindArg::File => ContentKind::Generic,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run { script, json } => run_script(&script, json).await,
            Commands::Check {
                path,
                kind,
                media_type,
            } => check_file(&path, kind.into(), media_type).await,
            Commands::Config => show_config(),
        }
    }
}

/// Replay a script against a fresh session
async fn run_script(path: &Path, json: bool) -> Result<()> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script: {}", path.display()))?;
    let commands = parse_script(&source)?;

    let base_dir = path.parent().unwrap_or(Path::new("."));
    let mut session = Session::from_config(config::config()?);

    for (line_no, command) in commands {
        let result = apply_command(&mut session, command, base_dir, json).await?;
        match result {
            Ok(Some(message)) => println!("[{}] {}", line_no, message),
            Ok(None) => {}
            Err(e) => println!("[{}] error: {}", line_no, e),
        }
    }

    let released = session.clear();
    tracing::debug!(released, "Session torn down");
    Ok(())
}

/// Apply one script command.
///
/// The outer error aborts the script; the inner one is a refused event
/// that is reported and skipped.
async fn apply_command(
    session: &mut Session,
    command: ScriptCommand,
    base_dir: &Path,
    json: bool,
) -> Result<std::result::Result<Option<String>, String>> {
    let outcome = match command {
        ScriptCommand::Begin => workflow_step(session.begin_creation()),
        ScriptCommand::Title(title) => workflow_step(session.set_title(title)),
        ScriptCommand::Kind(kind) => workflow_step(session.select_kind(kind)),
        ScriptCommand::Back => workflow_step(session.go_back()),
        ScriptCommand::Cancel => workflow_step(session.cancel_creation()),
        ScriptCommand::Text(text) => submitted(session.submit_text(text)),
        ScriptCommand::File { path, media_type } => {
            let path = if path.is_absolute() {
                path
            } else {
                base_dir.join(path)
            };
            let mut source = FilePayloadSource::new(path);
            if let Some(declared) = media_type {
                let parsed = declared
                    .parse::<mime::Mime>()
                    .with_context(|| format!("Invalid media type: {}", declared))?;
                source = source.with_media_type(parsed);
            }
            submitted(session.submit_from(&source).await)
        }
        ScriptCommand::Remove(id) => match session.remove_entry(id) {
            Ok(entry) => Ok(Some(format!("removed {} ({})", entry.id(), entry.title()))),
            Err(e) => Err(e.to_string()),
        },
        ScriptCommand::Open(id) => match session.open(id) {
            Ok(view) => Ok(Some(describe_view(&view.title, &view.preview))),
            Err(e) => Err(e.to_string()),
        },
        ScriptCommand::Search(text) => {
            session.set_search_text(text);
            Ok(None)
        }
        ScriptCommand::Sort(key, direction) => {
            session.set_sort(key, direction);
            Ok(None)
        }
        ScriptCommand::Filter(kind) => {
            session.set_kind_filter(kind);
            Ok(None)
        }
        ScriptCommand::State => Ok(Some(format!("state: {}", session.state()))),
        ScriptCommand::List => {
            let listing = session.listing();
            if json {
                println!("{}", serde_json::to_string_pretty(&listing.summaries())?);
            } else {
                print_rows(&listing.rows());
            }
            Ok(None)
        }
    };

    Ok(outcome)
}

fn workflow_step(result: Result<(), WorkflowError>) -> std::result::Result<Option<String>, String> {
    result.map(|_| None).map_err(|e| e.to_string())
}

fn submitted(
    result: Result<SubmitOutcome, WorkflowError>,
) -> std::result::Result<Option<String>, String> {
    match result {
        Ok(SubmitOutcome::Committed(id)) => Ok(Some(format!("committed {}", id))),
        Ok(SubmitOutcome::Rejected(reason)) => Ok(Some(format!("rejected: {}", reason))),
        Ok(SubmitOutcome::Abandoned) => Ok(Some("abandoned".to_string())),
        Err(e) => Err(e.to_string()),
    }
}

fn describe_view(title: &str, preview: &Preview) -> String {
    match preview {
        Preview::Image { reference, data } => {
            format!("{}: image {} ({} bytes)", title, reference, data.len())
        }
        Preview::Video { reference, data } => {
            format!("{}: video {} ({} bytes)", title, reference, data.len())
        }
        Preview::Text { text } => format!("{}:\n{}", title, text),
        Preview::File { name, size_bytes } => {
            format!("{}: file {} ({} bytes)", title, name, size_bytes)
        }
    }
}

fn print_rows(rows: &[DisplayRow]) {
    if rows.is_empty() {
        println!("(no entries)");
        return;
    }

    println!(
        "{:<6} {:<24} {:<6} {:>10}  {:<12} {}",
        "ID", "TITLE", "KIND", "SIZE", "DATE", "NAME"
    );
    for row in rows {
        let title = truncate(&row.title, 24);
        println!(
            "{:<6} {:<24} {:<6} {:>10}  {:<12} {}",
            row.id.to_string(),
            title,
            row.kind.name(),
            row.size,
            row.date,
            row.name
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

/// Validate a single file without creating anything
async fn check_file(path: &Path, kind: ContentKind, media_type: Option<String>) -> Result<()> {
    let config = config::config()?;

    let mut source = FilePayloadSource::new(path);
    if let Some(declared) = media_type {
        let parsed = declared
            .parse::<mime::Mime>()
            .with_context(|| format!("Invalid media type: {}", declared))?;
        source = source.with_media_type(parsed);
    }
    let payload: Payload = source.read().await?;

    let title = payload.name.clone();
    let verdict = if kind == ContentKind::Text {
        match std::str::from_utf8(&payload.data) {
            Ok(text) => config.validation.validate(kind, &title, Candidate::Text(text)),
            Err(_) => anyhow::bail!("{} is not valid UTF-8 text", path.display()),
        }
    } else {
        config.validation.validate(
            kind,
            &title,
            Candidate::Payload {
                len: payload.len(),
                media_type: payload.media_type.as_ref(),
            },
        )
    };

    match verdict {
        Ok(()) => {
            println!("{}: accepted as {}", path.display(), kind);
            Ok(())
        }
        Err(reason) => {
            eprintln!("{}: rejected as {}: {}", path.display(), kind, reason);
            std::process::exit(1);
        }
    }
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let config = config::config()?;

    println!("ipcs configuration");
    println!("==================");
    match &config.config_file {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none, using defaults)"),
    }
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    println!();
    for kind in ContentKind::ALL {
        println!(
            "  {:<6} accept {:<10} max {} bytes",
            kind.name(),
            kind.accept(),
            config.validation.limit_for(kind)
        );
    }

    Ok(())
}
