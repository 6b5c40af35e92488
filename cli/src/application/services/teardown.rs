//! Teardown stack: compensating actions for every temporary resource a run
//! created, executed last-in first-out.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::time::Duration;

use anyhow::Result;

use crate::application::ports::{CloudApi, ProgressReporter};
use crate::application::services::{credentials, instance};
use crate::domain::cloud::SshKeyRef;

/// Undo step for one temporary resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    DeleteServer { id: u64, name: String },
    UnregisterKey(SshKeyRef),
}

/// A cloud resource created by the current run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    SshKey { id: u64, name: String },
    Server { id: u64, name: String },
    /// Created on purpose and kept after the run.
    Volume { id: u64, name: String },
}

impl From<&Compensation> for Resource {
    fn from(c: &Compensation) -> Self {
        match c {
            Compensation::DeleteServer { id, name } => Self::Server { id: *id, name: name.clone() },
            Compensation::UnregisterKey(key) => Self::SshKey { id: key.id, name: key.name.clone() },
        }
    }
}

/// Pending compensations plus the resources the run created and keeps.
#[derive(Debug, Default)]
pub struct Teardown {
    pending: Vec<Compensation>,
    kept: Vec<Resource>,
}

impl Teardown {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an undo step; it runs before every step pushed earlier.
    pub fn push(&mut self, step: Compensation) {
        tracing::debug!(?step, "teardown step registered");
        self.pending.push(step);
    }

    /// Record a resource that outlives the run.
    pub fn keep(&mut self, resource: Resource) {
        self.kept.push(resource);
    }

    /// Every resource this run created that still exists, in creation order.
    #[must_use]
    pub fn inventory(&self) -> Vec<Resource> {
        self.pending
            .iter()
            .map(Resource::from)
            .chain(self.kept.iter().cloned())
            .collect()
    }

    #[must_use]
    pub fn pending(&self) -> &[Compensation] {
        &self.pending
    }

    /// Run the pending steps matching `select` now instead of at the end.
    ///
    /// A step that fails goes back on the stack so [`Teardown::run`] tries it
    /// again; the first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns the error of the first selected step that failed.
    pub async fn run_early(
        &mut self,
        api: &impl CloudApi,
        reporter: &impl ProgressReporter,
        interval: Duration,
        select: impl Fn(&Compensation) -> bool,
    ) -> Result<()> {
        let (now, later): (Vec<_>, Vec<_>) = self.pending.drain(..).partition(&select);
        let mut retry = Vec::new();
        let mut first_error = None;
        for step in now.into_iter().rev() {
            if let Err(e) = execute(&step, api, reporter, interval).await {
                tracing::warn!(?step, error = %format!("{e:#}"), "early teardown step failed");
                retry.push(step);
                first_error.get_or_insert(e);
            }
        }
        // Failed steps run last, after everything still pending.
        retry.reverse();
        retry.extend(later);
        self.pending = retry;
        first_error.map_or(Ok(()), Err)
    }

    /// Execute every pending step, newest first, continuing past failures.
    ///
    /// Returns all failures.
    pub async fn run(
        mut self,
        api: &impl CloudApi,
        reporter: &impl ProgressReporter,
        interval: Duration,
    ) -> Vec<anyhow::Error> {
        if !self.pending.is_empty() {
            tracing::debug!(resources = ?self.inventory(), "tearing down");
        }
        let mut failures = Vec::new();
        while let Some(step) = self.pending.pop() {
            if let Err(e) = execute(&step, api, reporter, interval).await {
                tracing::warn!(?step, error = %format!("{e:#}"), "teardown step failed");
                failures.push(e);
            }
        }
        failures
    }
}

async fn execute(
    step: &Compensation,
    api: &impl CloudApi,
    reporter: &impl ProgressReporter,
    interval: Duration,
) -> Result<()> {
    match step {
        Compensation::DeleteServer { id, .. } => {
            reporter.step("Deleting temporary server...");
            instance::destroy(api, *id, interval).await
        }
        Compensation::UnregisterKey(key) => {
            reporter.step("Deleting SSH key...");
            credentials::unregister(api, key).await
        }
    }
}
