//! Application service: volume upload use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::{
    CloudApi, KeyGenerator, ProgressReporter, ReachabilityProbe, RemoteShell, SessionTarget,
};
use crate::application::services::action::{wait_for_action, wait_for_all};
use crate::application::services::pipeline::Pipeline;
use crate::application::services::teardown::{Compensation, Resource, Teardown};
use crate::application::services::{credentials, instance, transfer};
use crate::domain::cloud::{Volume, VolumeSpec, marker_labels, uploaded_volume_name};
use crate::domain::error::{HcError, JoinedError};
use crate::domain::transfer::{TransferDirection, UPLOAD_FILESYSTEM, validate_upload};

/// What to upload and what the new volume looks like.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Gzipped tarball to unpack onto the new volume.
    pub source: PathBuf,
    /// Volume name; `hcutil-uploaded-volume-<digits>` if unset.
    pub name: Option<String>,
    pub location: String,
    pub size_gb: u32,
}

#[derive(Debug)]
pub struct UploadReport {
    pub volume: Volume,
    pub bytes: u64,
}

/// Create a new volume and fill it from a local archive.
///
/// The temporary key registration is deleted as soon as the server exists;
/// the server itself is deleted at the end whatever happened.
///
/// # Errors
///
/// Returns `HcError::InvalidInput` or `HcError::LocalIo` for bad operator
/// input before anything is created, otherwise the first pipeline failure
/// joined with every teardown failure.
pub async fn upload_volume<C, K, P, S, Q, R>(
    p: &Pipeline<'_, C, K, P, S, Q, R>,
    req: &UploadRequest,
) -> Result<UploadReport>
where
    C: CloudApi,
    K: KeyGenerator,
    P: ReachabilityProbe,
    S: RemoteShell,
    R: ProgressReporter,
{
    validate_upload(req.size_gb, &req.location, req.name.as_deref())?;
    let meta = tokio::fs::metadata(&req.source)
        .await
        .map_err(|e| HcError::LocalIo {
            path: req.source.display().to_string(),
            message: e.to_string(),
        })?;
    if !meta.is_file() {
        return Err(HcError::InvalidInput(format!(
            "{} is not a regular file",
            req.source.display()
        ))
        .into());
    }

    let mut teardown = Teardown::new();
    let result = provision_and_upload(p, req, &mut teardown).await;
    let cleanup = teardown
        .run(p.cloud, p.reporter, p.settings.poll.action_interval)
        .await;
    JoinedError::finish(result, cleanup)
}

async fn provision_and_upload<C, K, P, S, Q, R>(
    p: &Pipeline<'_, C, K, P, S, Q, R>,
    req: &UploadRequest,
    teardown: &mut Teardown,
) -> Result<UploadReport>
where
    C: CloudApi,
    K: KeyGenerator,
    P: ReachabilityProbe,
    S: RemoteShell,
    R: ProgressReporter,
{
    let poll = p.settings.poll;

    let pair = credentials::generate(p.keys)?;
    p.reporter.step("Creating temporary server...");
    let key = credentials::register(p.cloud, &pair).await?;
    teardown.push(Compensation::UnregisterKey(key.clone()));

    let mut server = instance::provision(p.cloud, p.settings, &req.location, &key).await?;
    teardown.push(Compensation::DeleteServer {
        id: server.id,
        name: server.name.clone(),
    });

    // The key is only needed while the server is created.
    teardown
        .run_early(p.cloud, p.reporter, poll.action_interval, |c| {
            matches!(c, Compensation::UnregisterKey(_))
        })
        .await?;

    p.reporter.step("Waiting for server to start...");
    let addr = instance::await_reachable(p.cloud, p.probe, &mut server, &poll).await?;

    p.reporter.step("Creating volume...");
    let spec = VolumeSpec {
        name: req.name.clone().unwrap_or_else(uploaded_volume_name),
        size_gb: req.size_gb,
        server: server.id,
        automount: true,
        format: UPLOAD_FILESYSTEM.to_string(),
        labels: marker_labels(),
    };
    let created = p
        .cloud
        .create_volume(&spec)
        .await
        .with_context(|| format!("failed to create volume {}", spec.name))?;
    let volume = created.resource;
    tracing::info!(volume_id = volume.id, name = %volume.name, server_id = server.id, "created volume");
    teardown.keep(Resource::Volume {
        id: volume.id,
        name: volume.name.clone(),
    });
    if let Some(action) = &created.action {
        wait_for_action(p.cloud, action, poll.action_interval).await?;
    }
    wait_for_all(p.cloud, &created.next_actions, poll.action_interval).await?;

    let target = SessionTarget {
        host: addr.ip(),
        port: addr.port(),
        user: &p.settings.ssh_user,
        key: &pair,
    };
    let mut session = transfer::open_session(p.shell, &target).await?;

    p.reporter.step(&format!(
        "Uploading {} to {}...",
        req.source.display(),
        volume.name
    ));
    let bytes = transfer::run(&mut session, TransferDirection::Upload, &volume, &req.source).await?;
    Ok(UploadReport { volume, bytes })
}
