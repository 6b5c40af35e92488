//! Ephemeral credential manager: one key pair per run, registered with the
//! provider for the lifetime of the run.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::{Context, Result};

use crate::application::ports::{KeyGenerator, SshKeyApi};
use crate::domain::cloud::{SshKeyRef, SshKeySpec, marker_labels, temp_ssh_key_name};
use crate::domain::credentials::EphemeralKeyPair;
use crate::domain::error::HcError;

/// Generate a fresh key pair.
///
/// # Errors
///
/// Returns `HcError::KeyGen` if the generator fails.
pub fn generate(keys: &impl KeyGenerator) -> Result<EphemeralKeyPair> {
    keys.generate()
        .map_err(|e| HcError::KeyGen(format!("{e:#}")).into())
}

/// Upload the public half under a unique temporary name.
///
/// # Errors
///
/// Returns `HcError::Registration` if the provider rejects the key.
pub async fn register(api: &impl SshKeyApi, pair: &EphemeralKeyPair) -> Result<SshKeyRef> {
    let spec = SshKeySpec {
        name: temp_ssh_key_name(),
        public_key: pair.public_openssh().to_string(),
        labels: marker_labels(),
    };
    let key = api
        .create_ssh_key(&spec)
        .await
        .map_err(|e| HcError::Registration(format!("{e:#}")))?;
    tracing::info!(ssh_key_id = key.id, name = %key.name, "registered temporary ssh key");
    Ok(key)
}

/// Delete a key registration.
///
/// # Errors
///
/// Returns the provider error, including for a key that is already gone.
pub async fn unregister(api: &impl SshKeyApi, key: &SshKeyRef) -> Result<()> {
    tracing::info!(ssh_key_id = key.id, name = %key.name, "deleting temporary ssh key");
    api.delete_ssh_key(key.id)
        .await
        .with_context(|| format!("failed to delete SSH key {} ({})", key.name, key.id))
}
