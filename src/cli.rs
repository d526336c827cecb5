//! Command-line interface definition and argument parsing.

use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the homelink engine.
#[derive(Parser, Debug)]
#[command(name = "homelink", about = "Layered dotfile symlink engine", version)]
pub struct Cli {
    /// Subcommand to run; defaults to `link` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared across all subcommands.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Override the repository root directory
    #[arg(long, global = true)]
    pub root: Option<std::path::PathBuf>,

    /// Override the detected host identity used to select the hosts/ tree
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Override the destination root (defaults to the home directory)
    #[arg(long, global = true)]
    pub target: Option<std::path::PathBuf>,

    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Link both source trees into the destination root
    Link,
    /// Print version information
    Version,
}
