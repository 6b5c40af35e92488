//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;

/// Download and upload Hetzner Cloud volumes through a temporary server
#[derive(Parser)]
#[command(
    name = "hcutils",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Answer yes to every prompt, including the detach warning
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Log diagnostics to stderr (overridden by `RUST_LOG`)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Download resources to your local machine
    #[command(subcommand)]
    Download(commands::download::DownloadCommand),

    /// Upload resources from your local machine
    #[command(subcommand)]
    Upload(commands::upload::UploadCommand),
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            quiet,
            no_color,
            yes,
            verbose: _,
            command,
        } = self;
        let app = AppContext::new(&AppFlags {
            output: OutputFlags { no_color, quiet },
            behaviour: BehaviourFlags { yes },
        })?;

        match command {
            Command::Download(cmd) => commands::download::run(&app, cmd).await,
            Command::Upload(cmd) => commands::upload::run(&app, cmd).await,
        }
    }
}
