//! `hcutils upload volume`: create a volume from a local archive.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::app::AppContext;
use crate::application::ports::ProgressReporter as _;
use crate::application::services::pipeline::Pipeline;
use crate::application::services::upload::{UploadRequest, upload_volume};
use crate::commands::{LocalAdapters, format_bytes};
use crate::output::{TerminalPrompt, TerminalReporter};

#[derive(Subcommand)]
pub enum UploadCommand {
    /// Upload a local archive into a new volume
    ///
    /// Example: hcutils upload volume --location fsn1 --size 10 --name my-uploaded-volume volume.tar.gz
    Volume(UploadVolumeArgs),
}

/// Arguments for `upload volume`.
#[derive(Args)]
pub struct UploadVolumeArgs {
    /// Gzipped tarball to unpack into the new volume
    pub file: PathBuf,

    /// Name of the new volume [default: hcutil-uploaded-volume-<digits>]
    #[arg(long)]
    pub name: Option<String>,

    /// Location to create the volume in, e.g. fsn1
    #[arg(long)]
    pub location: String,

    /// Size of the volume in GB
    #[arg(long)]
    pub size: u32,
}

/// Run an `upload` subcommand.
///
/// # Errors
///
/// Returns an error if the token is missing, the input is invalid, or any
/// step of the transfer or its cleanup fails.
pub async fn run(app: &AppContext, cmd: UploadCommand) -> Result<()> {
    match cmd {
        UploadCommand::Volume(args) => volume(app, args).await,
    }
}

async fn volume(app: &AppContext, args: UploadVolumeArgs) -> Result<()> {
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
    let request = UploadRequest {
        source: args.file,
        name: args.name,
        location: args.location,
        size_gb: args.size,
    };

    let report = upload_volume(&pipeline, &request).await?;
    reporter.success(&format!(
        "Uploaded {} to volume {} (ID {})",
        request.source.display(),
        report.volume.name,
        report.volume.id
    ));
    app.output.kv("Transferred:", &format_bytes(report.bytes));
    Ok(())
}
