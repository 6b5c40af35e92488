//! Instance provisioner: create the temporary server, wait until its shell
//! port answers, and delete it again.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::Instant;

use crate::application::ports::{ActionApi, ReachabilityProbe, ServerApi};
use crate::application::services::action::wait_for_action;
use crate::domain::cloud::{Server, ServerSpec, SshKeyRef, marker_labels, temp_server_name};
use crate::domain::config::{PollSettings, RunSettings};
use crate::domain::error::HcError;

/// Create a server in `location` with `key` installed for the login user.
///
/// The creation action is not awaited; reachability of the shell port is the
/// readiness signal.
///
/// # Errors
///
/// Returns `HcError::Provision` if the provider rejects the request.
pub async fn provision(
    api: &impl ServerApi,
    settings: &RunSettings,
    location: &str,
    key: &SshKeyRef,
) -> Result<Server> {
    let spec = ServerSpec {
        name: temp_server_name(),
        server_type: settings.server_type.clone(),
        image: settings.image.clone(),
        location: location.to_string(),
        ssh_keys: vec![key.id],
        labels: marker_labels(),
    };
    let created = api
        .create_server(&spec)
        .await
        .map_err(|e| HcError::Provision(format!("{e:#}")))?;
    let server = created.resource;
    tracing::info!(server_id = server.id, name = %server.name, location = %server.location, "created temporary server");
    Ok(server)
}

/// Poll the shell port of `server` until a TCP connection succeeds.
///
/// While the provider has not assigned a public IPv4 the server is re-fetched
/// on every tick; `server` is updated in place.
///
/// # Errors
///
/// Returns `HcError::ReachabilityTimeout` once `poll.reachability_timeout` has
/// elapsed, or the provider error if a re-fetch fails.
pub async fn await_reachable(
    api: &impl ServerApi,
    probe: &impl ReachabilityProbe,
    server: &mut Server,
    poll: &PollSettings,
) -> Result<SocketAddr> {
    let started = Instant::now();
    loop {
        if server.ipv4.is_none() {
            let fresh = api
                .get_server(server.id)
                .await
                .with_context(|| format!("failed to refresh server {}", server.id))?
                .ok_or_else(|| HcError::Provision(format!("server {} disappeared", server.id)))?;
            *server = fresh;
        }

        if let Some(ip) = server.ipv4 {
            let addr = SocketAddr::new(IpAddr::V4(ip), poll.ssh_port);
            if probe.is_reachable(addr).await {
                tracing::debug!(server_id = server.id, %addr, "server reachable");
                return Ok(addr);
            }
            tracing::debug!(server_id = server.id, %addr, "server not reachable yet");
        }

        let waited = started.elapsed();
        if waited >= poll.reachability_timeout {
            return Err(HcError::ReachabilityTimeout {
                address: server
                    .ipv4
                    .map_or_else(|| "<no address>".to_string(), |ip| ip.to_string()),
                port: poll.ssh_port,
                waited_secs: waited.as_secs(),
            }
            .into());
        }
        tokio::time::sleep(poll.reachability_interval).await;
    }
}

/// Delete a server and wait for the deletion to finish.
///
/// # Errors
///
/// Returns the provider error or the failed deletion action.
pub async fn destroy(
    api: &(impl ServerApi + ActionApi),
    server_id: u64,
    interval: Duration,
) -> Result<()> {
    tracing::info!(server_id, "deleting temporary server");
    let action = api
        .delete_server(server_id)
        .await
        .with_context(|| format!("failed to delete server {server_id}"))?;
    wait_for_action(api, &action, interval)
        .await
        .with_context(|| format!("failed to delete server {server_id}"))?;
    Ok(())
}
