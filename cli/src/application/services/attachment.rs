//! Volume attachment manager.
//!
//! Tracks one volume through a run:
//!
//! ```text
//! AttachedToOther ──(confirmed detach)──▶ Unattached ──(attach + wait)──▶ AttachedToEphemeral
//!        ▲                                                                        │
//!        └────────────────(confirmed reattach: detach + wait, attach + wait)──────┘
//! ```
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{ActionApi, OperatorPrompt, ProgressReporter, ServerApi, VolumeApi};
use crate::application::services::action::wait_for_action;
use crate::domain::cloud::{PriorAttachment, Volume};

/// Where the volume is attached right now, as far as this run knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentState {
    Unattached,
    AttachedToOther(PriorAttachment),
    AttachedToEphemeral { server_id: u64 },
}

/// Result of [`VolumeAttachment::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// The volume was not attached; nothing to do.
    NotAttached,
    /// The operator confirmed and the volume was detached.
    Detached,
    /// The operator declined; the volume is untouched.
    Declined,
}

/// Result of [`VolumeAttachment::offer_reattach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reattach {
    /// The volume had no owner before this run.
    NoPriorOwner,
    /// The operator chose to leave the volume detached.
    Declined,
    /// The volume is back on its original server.
    Reattached,
}

/// A volume and its attachment state for the duration of one run.
#[derive(Debug, Clone)]
pub struct VolumeAttachment {
    volume: Volume,
    state: AttachmentState,
    prior: Option<PriorAttachment>,
}

impl VolumeAttachment {
    /// Snapshot the current attachment of `volume`, resolving the owning
    /// server's name.
    ///
    /// A failed name lookup is not fatal; the server is then shown as `#<id>`.
    pub async fn inspect(api: &impl ServerApi, volume: Volume) -> Self {
        let Some(server_id) = volume.server else {
            return Self { volume, state: AttachmentState::Unattached, prior: None };
        };

        let server_name = match api.get_server(server_id).await {
            Ok(Some(server)) => server.name,
            Ok(None) => format!("#{server_id}"),
            Err(e) => {
                tracing::warn!(server_id, error = %e, "could not resolve owning server");
                format!("#{server_id}")
            }
        };
        let prior = PriorAttachment { server_id, server_name };
        Self {
            volume,
            state: AttachmentState::AttachedToOther(prior.clone()),
            prior: Some(prior),
        }
    }

    #[must_use]
    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    #[must_use]
    pub fn state(&self) -> &AttachmentState {
        &self.state
    }

    /// Server the volume was attached to when the run started.
    #[must_use]
    pub fn prior(&self) -> Option<&PriorAttachment> {
        self.prior.as_ref()
    }

    /// `true` if the volume had an owner and is no longer attached to it.
    #[must_use]
    pub fn is_away_from_owner(&self) -> bool {
        self.prior.is_some() && !matches!(self.state, AttachmentState::AttachedToOther(_))
    }

    /// Detach the volume from another server, after asking the operator.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt, the detach call or its action fails.
    pub async fn release(
        &mut self,
        api: &(impl VolumeApi + ActionApi),
        prompt: &impl OperatorPrompt,
        reporter: &impl ProgressReporter,
        interval: Duration,
    ) -> Result<Release> {
        let AttachmentState::AttachedToOther(owner) = &self.state else {
            return Ok(Release::NotAttached);
        };

        let question = format!(
            "Volume {} is attached to server {}. To download the volume, it needs to be detached. \
             Do you want to detach it?\nWarning: This could possibly lead to data loss",
            self.volume.name, owner.server_name
        );
        if !prompt.confirm(&question, false)? {
            return Ok(Release::Declined);
        }

        reporter.step(&format!("Detaching volume {}", self.volume.name));
        self.detach(api, interval).await?;
        Ok(Release::Detached)
    }

    /// Attach the (now unattached) volume to the temporary server, mounting it
    /// automatically, and wait for the action.
    ///
    /// # Errors
    ///
    /// Returns an error if the volume is still attached elsewhere, or if the
    /// attach call or its action fails.
    pub async fn attach_to(
        &mut self,
        api: &(impl VolumeApi + ActionApi),
        server_id: u64,
        interval: Duration,
    ) -> Result<()> {
        anyhow::ensure!(
            self.state == AttachmentState::Unattached,
            "volume {} must be detached before it can be attached to server {server_id}",
            self.volume.id
        );
        tracing::info!(volume_id = self.volume.id, server_id, "attaching volume");
        let action = api
            .attach_volume(self.volume.id, server_id, true)
            .await
            .with_context(|| format!("failed to attach volume {}", self.volume.id))?;
        wait_for_action(api, &action, interval).await?;
        self.state = AttachmentState::AttachedToEphemeral { server_id };
        Ok(())
    }

    /// Offer to move the volume back to the server it started on.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt or any detach/attach step fails.
    pub async fn offer_reattach(
        &mut self,
        api: &(impl VolumeApi + ActionApi),
        prompt: &impl OperatorPrompt,
        reporter: &impl ProgressReporter,
        interval: Duration,
    ) -> Result<Reattach> {
        let Some(owner) = self.prior.clone() else {
            return Ok(Reattach::NoPriorOwner);
        };

        let question = format!(
            "Volume {} was attached to server {}. Do you want to reattach it?",
            self.volume.name, owner.server_name
        );
        if !prompt.confirm(&question, true)? {
            return Ok(Reattach::Declined);
        }

        reporter.step(&format!(
            "Reattaching volume {} to server {}",
            self.volume.name, owner.server_name
        ));
        if self.state != AttachmentState::Unattached {
            self.detach(api, interval).await?;
        }
        tracing::info!(volume_id = self.volume.id, server_id = owner.server_id, "reattaching volume");
        let action = api
            .attach_volume(self.volume.id, owner.server_id, false)
            .await
            .with_context(|| format!("failed to reattach volume {}", self.volume.id))?;
        wait_for_action(api, &action, interval).await?;
        self.state = AttachmentState::AttachedToOther(owner);
        Ok(Reattach::Reattached)
    }

    async fn detach(&mut self, api: &(impl VolumeApi + ActionApi), interval: Duration) -> Result<()> {
        tracing::info!(volume_id = self.volume.id, "detaching volume");
        let action = api
            .detach_volume(self.volume.id)
            .await
            .with_context(|| format!("failed to detach volume {}", self.volume.id))?;
        wait_for_action(api, &action, interval).await?;
        self.state = AttachmentState::Unattached;
        Ok(())
    }
}
