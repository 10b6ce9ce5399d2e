//! CLI commands and argument parsing.

pub mod clean;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use regmaid_core::DEFAULT_CONFIG_PATH;

/// Regmaid - enforce tag retention policies on container registries
#[derive(Parser, Debug)]
#[command(name = "regmaid")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Defaults to `clean`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags accepted by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to the config file
    #[arg(
        short,
        long,
        global = true,
        env = "REGMAID_CONFIG",
        default_value = DEFAULT_CONFIG_PATH
    )]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Auto confirm cleanup
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Dry run (only list tags eligible for deletion)
    #[arg(long, global = true)]
    pub dry_run: bool,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Clean registries based on configured policies
    Clean,

    /// Print version information
    Version,
}

impl Cli {
    /// Returns the command to run.
    pub fn selected(&self) -> Commands {
        self.command.unwrap_or(Commands::Clean)
    }
}
