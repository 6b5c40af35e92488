//! `hcutils download volume`: copy a volume to the local machine.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};

use crate::app::AppContext;
use crate::application::ports::ProgressReporter as _;
use crate::application::services::attachment::Reattach;
use crate::application::services::download::{
    DownloadOutcome, DownloadRequest, download_volume,
};
use crate::application::services::pipeline::Pipeline;
use crate::commands::{LocalAdapters, format_bytes};
use crate::domain::transfer::DownloadKind;
use crate::output::{TerminalPrompt, TerminalReporter};

#[derive(Subcommand)]
pub enum DownloadCommand {
    /// Download a volume to a local file
    ///
    /// Example: hcutils download volume --id my-volume --type archive --out backup.tar.gz
    Volume(DownloadVolumeArgs),
}

/// Arguments for `download volume`.
#[derive(Args)]
pub struct DownloadVolumeArgs {
    /// ID or name of the volume to download
    #[arg(long)]
    pub id: String,

    /// Output file [default: volume-<id>.tar.gz or volume-<id>.img.gz]
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Type of download
    #[arg(long = "type", value_enum, default_value_t = KindArg::Archive)]
    pub kind: KindArg,
}

/// Download formats accepted on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Gzipped tarball of the volume's files
    Archive,
    /// Gzipped raw image of the block device
    Image,
}

impl From<KindArg> for DownloadKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Archive => Self::Archive,
            KindArg::Image => Self::Image,
        }
    }
}

/// Run a `download` subcommand.
///
/// # Errors
///
/// Returns an error if the token is missing, the volume cannot be found, or
/// any step of the transfer or its cleanup fails.
pub async fn run(app: &AppContext, cmd: DownloadCommand) -> Result<()> {
    match cmd {
        DownloadCommand::Volume(args) => volume(app, args).await,
    }
}

async fn volume(app: &AppContext, args: DownloadVolumeArgs) -> Result<()> {
    let cloud = app.cloud_client()?;
    let adapters = LocalAdapters::default();
    let settings = app.run_settings();
    let reporter = TerminalReporter::new(&app.output);
    let prompt = TerminalPrompt::new(&reporter, app.prompt_mode);

    let pipeline = Pipeline {
        cloud: &cloud,
        keys: &adapters.keys,
        probe: &adapters.probe,
        shell: &adapters.shell,
        prompt: &prompt,
        reporter: &reporter,
        settings: &settings,
    };
    let request = DownloadRequest {
        volume: args.id,
        kind: args.kind.into(),
        output: args.out,
    };

    match download_volume(&pipeline, &request).await? {
        DownloadOutcome::Cancelled => {
            reporter.warn("Canceling");
        }
        DownloadOutcome::Completed(report) => {
            reporter.success(&format!(
                "Downloaded volume {} to {}",
                report.volume.name,
                report.path.display()
            ));
            app.output.kv("Size:", &format_bytes(report.bytes));
            if report.reattach == Reattach::Declined {
                app.output.warn(&format!(
                    "Volume {} was left detached",
                    report.volume.name
                ));
            }
        }
    }
    Ok(())
}
