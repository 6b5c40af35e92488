//! Application service: volume download use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::application::ports::{
    CloudApi, KeyGenerator, OperatorPrompt, ProgressReporter, ReachabilityProbe, RemoteShell,
    SessionTarget,
};
use crate::application::services::attachment::{Reattach, Release, VolumeAttachment};
use crate::application::services::pipeline::Pipeline;
use crate::application::services::teardown::{Compensation, Teardown};
use crate::application::services::{credentials, instance, transfer};
use crate::domain::cloud::Volume;
use crate::domain::error::{HcError, JoinedError};
use crate::domain::transfer::{DownloadKind, TransferDirection, default_output_path};

/// What to download and where to put it.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Volume ID or name.
    pub volume: String,
    pub kind: DownloadKind,
    /// Local destination; `volume-<id>.<ext>` in the working directory if unset.
    pub output: Option<PathBuf>,
}

/// Outcome of the `download_volume` use-case.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// The operator declined to detach the volume; nothing was touched.
    Cancelled,
    Completed(DownloadReport),
}

#[derive(Debug)]
pub struct DownloadReport {
    pub volume: Volume,
    pub path: PathBuf,
    pub bytes: u64,
    pub reattach: Reattach,
}

/// Download the contents of a volume to a local file.
///
/// If the volume is attached to another server it is detached first, with
/// the operator's consent, and offered back afterwards. Every temporary
/// resource is removed before returning, whether or not the transfer worked.
///
/// # Errors
///
/// Returns `HcError::VolumeNotFound` for an unknown volume, the first failure
/// of the pipeline, and every teardown failure joined into one `JoinedError`.
pub async fn download_volume<C, K, P, S, Q, R>(
    p: &Pipeline<'_, C, K, P, S, Q, R>,
    req: &DownloadRequest,
) -> Result<DownloadOutcome>
where
    C: CloudApi,
    K: KeyGenerator,
    P: ReachabilityProbe,
    S: RemoteShell,
    Q: OperatorPrompt,
    R: ProgressReporter,
{
    let volume = p
        .cloud
        .get_volume(&req.volume)
        .await?
        .ok_or_else(|| HcError::VolumeNotFound(req.volume.clone()))?;
    tracing::info!(volume_id = volume.id, name = %volume.name, attached_to = ?volume.server, "resolved volume");

    // Reject an unusable device path before anything is touched.
    let direction = TransferDirection::Download(req.kind);
    direction.command(volume.id, &volume.linux_device)?;
    let path = req
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(req.kind, volume.id));

    let interval = p.settings.poll.action_interval;
    let mut attachment = VolumeAttachment::inspect(p.cloud, volume).await;
    if attachment.release(p.cloud, p.prompt, p.reporter, interval).await? == Release::Declined {
        return Ok(DownloadOutcome::Cancelled);
    }

    let mut teardown = Teardown::new();
    let result = provision_and_download(p, &mut attachment, direction, &path, &mut teardown).await;
    let cleanup = teardown.run(p.cloud, p.reporter, interval).await;

    if result.is_err()
        && attachment.is_away_from_owner()
        && let Some(owner) = attachment.prior()
    {
        p.reporter.warn(&format!(
            "Volume {} is no longer attached to server {}",
            attachment.volume().name,
            owner.server_name
        ));
    }

    let (bytes, reattach) = JoinedError::finish(result, cleanup)?;
    Ok(DownloadOutcome::Completed(DownloadReport {
        volume: attachment.volume().clone(),
        path,
        bytes,
        reattach,
    }))
}

async fn provision_and_download<C, K, P, S, Q, R>(
    p: &Pipeline<'_, C, K, P, S, Q, R>,
    attachment: &mut VolumeAttachment,
    direction: TransferDirection,
    path: &Path,
    teardown: &mut Teardown,
) -> Result<(u64, Reattach)>
where
    C: CloudApi,
    K: KeyGenerator,
    P: ReachabilityProbe,
    S: RemoteShell,
    Q: OperatorPrompt,
    R: ProgressReporter,
{
    let poll = p.settings.poll;

    let pair = credentials::generate(p.keys)?;
    p.reporter.step("Creating temporary server...");
    let key = credentials::register(p.cloud, &pair).await?;
    teardown.push(Compensation::UnregisterKey(key.clone()));

    let location = attachment.volume().location.clone();
    let mut server = instance::provision(p.cloud, p.settings, &location, &key).await?;
    teardown.push(Compensation::DeleteServer {
        id: server.id,
        name: server.name.clone(),
    });

    p.reporter.step("Waiting for server to start...");
    let addr = instance::await_reachable(p.cloud, p.probe, &mut server, &poll).await?;

    p.reporter.step("Attaching volume...");
    attachment.attach_to(p.cloud, server.id, poll.action_interval).await?;

    let target = SessionTarget {
        host: addr.ip(),
        port: addr.port(),
        user: &p.settings.ssh_user,
        key: &pair,
    };
    let mut session = transfer::open_session(p.shell, &target).await?;

    p.reporter.step(&format!(
        "Downloading volume {} to {}...",
        attachment.volume().name,
        path.display()
    ));
    let bytes = transfer::run(&mut session, direction, attachment.volume(), path).await?;
    drop(session);

    let reattach = attachment
        .offer_reattach(p.cloud, p.prompt, p.reporter, poll.action_interval)
        .await?;
    Ok((bytes, reattach))
}
