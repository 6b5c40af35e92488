//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::net::{IpAddr, SocketAddr};

use anyhow::Result;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::domain::cloud::{
    Action, Created, Server, ServerSpec, SshKeyRef, SshKeySpec, Volume, VolumeSpec,
};
use crate::domain::credentials::EphemeralKeyPair;

// ── Cloud API Port Traits ─────────────────────────────────────────────────────

/// Asynchronous provider operations.
#[allow(async_fn_in_trait)]
pub trait ActionApi {
    /// Fetch the current state of an action.
    async fn get_action(&self, id: u64) -> Result<Action>;
}

/// Public key registry.
#[allow(async_fn_in_trait)]
pub trait SshKeyApi {
    /// Register a public key.
    async fn create_ssh_key(&self, spec: &SshKeySpec) -> Result<SshKeyRef>;
    /// Remove a registered key.
    async fn delete_ssh_key(&self, id: u64) -> Result<()>;
}

/// Compute instances.
#[allow(async_fn_in_trait)]
pub trait ServerApi {
    /// Create and start a server. The returned action tracks the boot.
    async fn create_server(&self, spec: &ServerSpec) -> Result<Created<Server>>;
    /// Fetch a server, `None` if it does not exist.
    async fn get_server(&self, id: u64) -> Result<Option<Server>>;
    /// Delete a server.
    async fn delete_server(&self, id: u64) -> Result<Action>;
}

/// Block-storage volumes.
#[allow(async_fn_in_trait)]
pub trait VolumeApi {
    /// Look a volume up by numeric ID or by name. `None` if nothing matches.
    async fn get_volume(&self, id_or_name: &str) -> Result<Option<Volume>>;
    /// Create a volume attached to the server named in `spec`.
    async fn create_volume(&self, spec: &VolumeSpec) -> Result<Created<Volume>>;
    /// Attach `volume` to `server`.
    async fn attach_volume(&self, volume: u64, server: u64, automount: bool) -> Result<Action>;
    /// Detach `volume` from whatever server holds it.
    async fn detach_volume(&self, volume: u64) -> Result<Action>;
}

/// Composite trait. Any type implementing all four sub-traits is a `CloudApi`.
pub trait CloudApi: ActionApi + SshKeyApi + ServerApi + VolumeApi {}

/// Blanket implementation: any type implementing all four sub-traits is a `CloudApi`.
impl<T> CloudApi for T where T: ActionApi + SshKeyApi + ServerApi + VolumeApi {}

// ── Credential Port ───────────────────────────────────────────────────────────

/// Produces a fresh key pair for a single run. Sync trait, no async needed.
pub trait KeyGenerator {
    /// Generate a new key pair.
    ///
    /// # Errors
    ///
    /// Returns `HcError::KeyGen` if key material cannot be produced.
    fn generate(&self) -> Result<EphemeralKeyPair>;
}

// ── Network Probe Port ────────────────────────────────────────────────────────

/// Abstracts network connectivity checks so application services can be tested
/// without real network access.
#[allow(async_fn_in_trait)]
pub trait ReachabilityProbe {
    /// `true` if a TCP connection to `addr` can be opened right now.
    async fn is_reachable(&self, addr: SocketAddr) -> bool;
}

// ── Remote Shell Ports ────────────────────────────────────────────────────────

/// Where and as whom to open a remote shell.
#[derive(Debug, Clone, Copy)]
pub struct SessionTarget<'a> {
    pub host: IpAddr,
    pub port: u16,
    pub user: &'a str,
    pub key: &'a EphemeralKeyPair,
}

/// How a remote command ended.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteExit {
    /// Exit status, `None` if the command died without reporting one.
    pub code: Option<i32>,
    /// Whatever the command wrote to stderr.
    pub stderr: String,
}

impl RemoteExit {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Opens authenticated sessions to a remote host.
#[allow(async_fn_in_trait)]
pub trait RemoteShell {
    type Session: ShellSession;

    /// Authenticate and return a session ready to run commands.
    async fn open(&self, target: &SessionTarget<'_>) -> Result<Self::Session>;
}

/// Command execution over an open session with streamed stdio.
#[allow(async_fn_in_trait)]
pub trait ShellSession {
    /// Run `command`, copying its stdout into `stdout` until it exits.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be started or `stdout` fails.
    /// A non-zero remote exit is reported through `RemoteExit`, not as an error.
    async fn run_capture(
        &mut self,
        command: &str,
        stdout: &mut (impl AsyncWrite + Unpin),
    ) -> Result<RemoteExit>;

    /// Run `command`, feeding `stdin` to it and closing its input at EOF.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be started or `stdin` fails.
    /// A non-zero remote exit is reported through `RemoteExit`, not as an error.
    async fn run_feed(
        &mut self,
        command: &str,
        stdin: &mut (impl AsyncRead + Unpin),
    ) -> Result<RemoteExit>;
}

// ── Operator Ports ────────────────────────────────────────────────────────────

/// Yes/no questions to the operator.
pub trait OperatorPrompt {
    /// Ask `prompt`; `default` is the answer when the operator just hits enter.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read.
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;
}

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait, no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
