use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tagmine::utils::get_cache_path;
use tagmine::{TagCache, extract_tags, tokenize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// tagmine - prompt tag extraction and corpus statistics CLI
#[derive(Parser)]
#[command(name = "tagmine")]
#[command(about = "Extract normalized tags from image-generation prompts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Tokenize prompt text into normalized tags
    Tokenize(TokenizeCommand),
    /// Show corpus cache statistics
    Stats(StatsCommand),
}

/// Tokenize a prompt
#[derive(Parser)]
struct TokenizeCommand {
    /// Prompt text; read from stdin when omitted
    #[arg(value_name = "PROMPT")]
    prompt: Option<String>,

    /// Treat the input as a full generation-parameters record and extract
    /// only the positive prompt
    #[arg(long)]
    full: bool,

    /// Print the tags as a JSON array
    #[arg(long)]
    json: bool,
}

/// Inspect the corpus cache
#[derive(Parser)]
struct StatsCommand {
    /// Cache database path; defaults to the per-user data directory
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Tokenize(cmd) => handle_tokenize(cmd),
        Commands::Stats(cmd) => handle_stats(cmd),
    };

    if let Err(e) = result {
        // Determine exit code based on error type
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e}");
        std::process::exit(exit_code);
    }
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors include missing input and a missing cache file. Internal
/// errors include database failures and I/O errors.
fn is_user_error(error: &anyhow::Error) -> bool {
    let error_msg = error.to_string();
    error_msg.contains("cannot be empty") || error_msg.contains("No corpus cache")
}

/// Handles the tokenize command.
fn handle_tokenize(cmd: &TokenizeCommand) -> Result<()> {
    let text = match &cmd.prompt {
        Some(prompt) => prompt.clone(),
        None => std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?,
    };

    if text.trim().is_empty() {
        anyhow::bail!("Prompt text cannot be empty");
    }

    let tags = if cmd.full {
        extract_tags(&text)
    } else {
        tokenize(&text)
    };

    if cmd.json {
        println!("{}", serde_json::to_string(&tags)?);
    } else {
        for tag in &tags {
            println!("{tag}");
        }
    }

    Ok(())
}

/// Handles the stats command by reporting cache row counts and recency.
fn handle_stats(cmd: &StatsCommand) -> Result<()> {
    let path = match &cmd.db {
        Some(path) => path.clone(),
        None => get_cache_path()?,
    };

    if !path.exists() {
        anyhow::bail!("No corpus cache at {}", path.display());
    }

    let cache = TagCache::open(&path).context("Failed to open corpus cache")?;

    println!("Cache: {}", path.display());
    println!("Files: {}", cache.file_count()?);
    println!("Tags:  {}", cache.tag_count()?);
    if let Some(mtime) = cache.newest_mtime()? {
        println!("Newest entry: {}", format_mtime(mtime));
    }

    Ok(())
}

/// Formats a stored mtime (Unix seconds) for display.
///
/// Falls back to the raw number for timestamps outside the representable
/// range.
fn format_mtime(mtime: f64) -> String {
    OffsetDateTime::from_unix_timestamp(mtime as i64)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| format!("{mtime}"))
}
