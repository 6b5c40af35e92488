//! Action poller: wait for an asynchronous provider operation to finish.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::ActionApi;
use crate::domain::cloud::{Action, ActionStatus};
use crate::domain::error::HcError;

/// Re-fetch `action` every `interval` until it succeeds or fails.
///
/// There is no overall deadline: the loop only continues while the provider
/// reports the action as pending or running.
///
/// # Errors
///
/// Returns `HcError::ActionFailed` if the action ends in error, or the
/// re-fetch error as soon as one occurs.
pub async fn wait_for_action(
    api: &impl ActionApi,
    action: &Action,
    interval: Duration,
) -> Result<Action> {
    let mut current = action.clone();
    while !current.is_terminal() {
        tracing::debug!(action_id = current.id, command = %current.command, status = ?current.status, "waiting for action");
        tokio::time::sleep(interval).await;
        current = api
            .get_action(current.id)
            .await
            .with_context(|| format!("failed to refresh action {}", current.id))?;
    }

    if current.status == ActionStatus::Error {
        return Err(HcError::ActionFailed {
            command: current.command.clone(),
            message: current
                .error_message
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
        }
        .into());
    }
    tracing::debug!(action_id = current.id, command = %current.command, "action finished");
    Ok(current)
}

/// Wait for each action in turn, stopping at the first failure.
///
/// # Errors
///
/// Returns the first failure reported by [`wait_for_action`].
pub async fn wait_for_all(api: &impl ActionApi, actions: &[Action], interval: Duration) -> Result<()> {
    for action in actions {
        wait_for_action(api, action, interval).await?;
    }
    Ok(())
}
