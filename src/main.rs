//! ctxguard CLI
//!
//! Runs the skeleton extractor, patch locator and memory manager on files,
//! printing machine-readable output on stdout.

use anyhow::Context;
use clap::{Parser, Subcommand};
use ctxguard::memory::{budget_status, estimate_tokens, MemoryManager};
use ctxguard::{extract_skeleton, locate, CtxguardConfig, Message};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// ctxguard - context and edit tooling for coding agents
#[derive(Parser, Debug)]
#[command(name = "ctxguard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a config file (default: $CTXGUARD_HOME/config.toml or ~/.ctxguard/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output: debug-level logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the structural outline of a source file
    Skeleton {
        file: PathBuf,

        /// Emit the full skeleton as JSON instead of the compact line
        #[arg(long)]
        json: bool,
    },

    /// Locate and replace a snippet in a file
    Patch {
        file: PathBuf,

        /// Text to replace
        #[arg(long, conflicts_with = "old_file", required_unless_present = "old_file")]
        old: Option<String>,

        /// Read the text to replace from a file
        #[arg(long)]
        old_file: Option<PathBuf>,

        /// Replacement text
        #[arg(long, conflicts_with = "new_file", required_unless_present = "new_file")]
        new: Option<String>,

        /// Read the replacement text from a file
        #[arg(long)]
        new_file: Option<PathBuf>,

        /// Approximate 1-based line of the intended match
        #[arg(long)]
        line: Option<usize>,

        /// Save the patched content back to FILE
        #[arg(long)]
        write: bool,
    },

    /// Build the bounded memory view of a JSON message list
    Memory {
        messages: PathBuf,

        /// Pairs to keep in the window
        #[arg(long)]
        window: Option<usize>,

        /// Character threshold for compressing tool results
        #[arg(long)]
        threshold: Option<usize>,
    },

    /// Estimate the token count of a JSON message list
    Estimate { messages: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => CtxguardConfig::load(path)
            .await
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => CtxguardConfig::load_default().await?,
    };
    debug!("Memory config: {:?}", config.memory);

    match cli.command {
        Command::Skeleton { file, json } => run_skeleton(&file, json).await,
        Command::Patch {
            file,
            old,
            old_file,
            new,
            new_file,
            line,
            write,
        } => {
            let old = text_arg(old, old_file.as_deref()).await?;
            let new = text_arg(new, new_file.as_deref()).await?;
            run_patch(&file, &old, &new, line, write).await
        }
        Command::Memory {
            messages,
            window,
            threshold,
        } => {
            let mut memory = config.memory;
            if let Some(window) = window {
                memory = memory.with_window_pairs(window);
            }
            if let Some(threshold) = threshold {
                memory = memory.with_compression_threshold(threshold);
            }
            run_memory(&messages, MemoryManager::new(memory)).await
        }
        Command::Estimate { messages } => run_estimate(&messages, &config).await,
    }
}

async fn run_skeleton(file: &Path, json: bool) -> anyhow::Result<()> {
    let content = read_file(file).await?;
    let skeleton = extract_skeleton(&content, &file.to_string_lossy());
    if json {
        println!("{}", serde_json::to_string_pretty(&skeleton)?);
    } else {
        println!("{}", skeleton.to_compact_string());
    }
    Ok(())
}

async fn run_patch(
    file: &Path,
    old: &str,
    new: &str,
    line: Option<usize>,
    write: bool,
) -> anyhow::Result<()> {
    let content = read_file(file).await?;
    let found = match locate(&content, old, new, line) {
        Ok(found) => found,
        Err(e) => {
            warn!("Patch failed for {}: {}", file.display(), e);
            return Err(ctxguard::CtxguardError::from(e).into());
        }
    };

    println!("{}", serde_json::to_string_pretty(&found)?);

    if write {
        tokio::fs::write(file, &found.patched_content)
            .await
            .with_context(|| format!("failed to write {}", file.display()))?;
        info!(
            "Patched {} at line {} ({})",
            file.display(),
            found.match_line,
            found.strategy
        );
    }
    Ok(())
}

async fn run_memory(path: &Path, manager: MemoryManager) -> anyhow::Result<()> {
    let messages = read_messages(path).await?;
    let state = manager.process(&messages);
    info!(
        "Kept {} of {} messages, {} tool calls in history",
        state.recent_messages.len(),
        messages.len(),
        state.tool_history.len()
    );
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

async fn run_estimate(path: &Path, config: &CtxguardConfig) -> anyhow::Result<()> {
    let messages = read_messages(path).await?;
    let tokens = estimate_tokens(&messages);
    let status = budget_status(tokens, &config.memory);
    let report = serde_json::json!({
        "messages": messages.len(),
        "tokens": tokens,
        "contextLength": config.memory.context_length,
        "status": status,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Inline text, or the contents of `file` when given instead.
async fn text_arg(inline: Option<String>, file: Option<&Path>) -> anyhow::Result<String> {
    match (inline, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => read_file(path).await,
        (None, None) => anyhow::bail!("missing text argument"),
    }
}

async fn read_file(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

async fn read_messages(path: &Path) -> anyhow::Result<Vec<Message>> {
    let raw = read_file(path).await?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of chat messages", path.display()))
}
