//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::fmt;

use thiserror::Error;

// ── Pipeline errors ───────────────────────────────────────────────────────────

/// Failures of the provisioning / attach / transfer pipeline.
#[derive(Debug, Error)]
pub enum HcError {
    #[error("HCLOUD_TOKEN environment variable is not set")]
    MissingToken,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Volume not found: {0}")]
    VolumeNotFound(String),

    #[error("Failed to generate SSH key pair: {0}")]
    KeyGen(String),

    #[error("Failed to register SSH key: {0}")]
    Registration(String),

    #[error("Failed to create temporary server: {0}")]
    Provision(String),

    #[error("Timeout waiting for server to start: {address}:{port} not reachable after {waited_secs}s")]
    ReachabilityTimeout {
        address: String,
        port: u16,
        waited_secs: u64,
    },

    #[error("Action {command} failed: {message}")]
    ActionFailed { command: String, message: String },

    #[error("Cloud API request failed: {0}")]
    Transport(String),

    #[error("Cloud API error ({status} {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("SSH session failed: {0}")]
    Session(String),

    #[error("Remote command exited with {}: {stderr}", exit_display(.code))]
    Transfer { code: Option<i32>, stderr: String },

    #[error("Local file error on {path}: {message}")]
    LocalIo { path: String, message: String },
}

#[allow(clippy::ref_option)]
fn exit_display(code: &Option<i32>) -> String {
    code.map_or_else(|| "no exit status".to_string(), |c| format!("status {c}"))
}

impl HcError {
    /// `true` for a provider API answer that means "no such resource".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. }) || matches!(self, Self::Api { code, .. } if code == "not_found")
    }
}

// ── Joined errors ─────────────────────────────────────────────────────────────

/// A triggering failure together with every cleanup failure that followed it.
///
/// Displayed one error per line, most significant first.
#[derive(Debug)]
pub struct JoinedError {
    errors: Vec<anyhow::Error>,
}

impl JoinedError {
    /// All joined errors in the order they were recorded.
    #[must_use]
    pub fn errors(&self) -> &[anyhow::Error] {
        &self.errors
    }

    /// Combine the main result of a run with the errors its teardown produced.
    ///
    /// Returns `Ok` only when the main path succeeded and every cleanup step
    /// succeeded. A single error is returned as-is so callers can still
    /// downcast it; several errors are wrapped in a `JoinedError`.
    ///
    /// # Errors
    ///
    /// Returns the main error, the cleanup errors, or both joined.
    pub fn finish<T>(result: anyhow::Result<T>, cleanup: Vec<anyhow::Error>) -> anyhow::Result<T> {
        let mut errors = Vec::with_capacity(cleanup.len() + 1);
        let value = match result {
            Ok(value) => Some(value),
            Err(e) => {
                errors.push(e);
                None
            }
        };
        errors.extend(cleanup);

        match (value, errors.len()) {
            (Some(value), 0) => Ok(value),
            (_, 1) => Err(errors.remove(0)),
            _ => Err(Self { errors }.into()),
        }
    }
}

impl fmt::Display for JoinedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e:#}")?;
        }
        Ok(())
    }
}

impl std::error::Error for JoinedError {}

/// Find the first `HcError` anywhere in `err`, looking inside a `JoinedError`.
#[must_use]
pub fn find_hc_error(err: &anyhow::Error) -> Option<&HcError> {
    if let Some(joined) = err.downcast_ref::<JoinedError>() {
        return joined.errors().iter().find_map(find_hc_error);
    }
    err.chain().find_map(|cause| cause.downcast_ref::<HcError>())
}
