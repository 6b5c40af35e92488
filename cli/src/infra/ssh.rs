//! Remote shell over the system `ssh` client: implements `RemoteShell`.
//!
//! Host keys are not verified: the server was created seconds ago by this
//! process and its key is unknown. `StrictHostKeyChecking=no` together with
//! `UserKnownHostsFile=/dev/null` accepts whatever key it presents without
//! touching the operator's `known_hosts`.
//!
//! `open` checks the destination with its own short `ssh ... true`; every
//! later command dials a fresh connection with the same key.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};

use crate::application::ports::{RemoteExit, RemoteShell, SessionTarget, ShellSession};
use crate::domain::error::HcError;

const COPY_CHUNK: usize = 64 * 1024;
const KEY_FILE: &str = "id_rsa";

/// Spawns `ssh` for each remote command.
pub struct OpenSsh {
    /// Client binary, `ssh` unless overridden.
    pub program: String,
    pub connect_timeout_secs: u64,
}

impl Default for OpenSsh {
    fn default() -> Self {
        Self {
            program: "ssh".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

/// An authenticated destination. The private key lives in a private
/// temporary directory that is removed when the session is dropped.
pub struct OpenSshSession {
    _key_dir: TempDir,
    key_path: PathBuf,
    destination: String,
    port: u16,
    program: String,
    connect_timeout_secs: u64,
}

impl RemoteShell for OpenSsh {
    type Session = OpenSshSession;

    async fn open(&self, target: &SessionTarget<'_>) -> Result<OpenSshSession> {
        let key_dir = tempfile::Builder::new()
            .prefix("hcutils-")
            .tempdir()
            .context("failed to create key directory")?;
        let key_path = key_dir.path().join(KEY_FILE);
        tokio::fs::write(&key_path, target.key.private_pem())
            .await
            .with_context(|| format!("failed to write {}", key_path.display()))?;
        set_permissions(&key_path, 0o600)?;

        let mut session = OpenSshSession {
            _key_dir: key_dir,
            key_path,
            destination: format!("{}@{}", target.user, target.host),
            port: target.port,
            program: self.program.clone(),
            connect_timeout_secs: self.connect_timeout_secs,
        };

        // Dial once with a no-op so connection and auth problems show up here.
        let exit = session.run_capture("true", &mut tokio::io::sink()).await?;
        if !exit.success() {
            return Err(HcError::Session(format!(
                "{} via ssh: {}",
                session.destination,
                if exit.stderr.trim().is_empty() { "connection failed" } else { exit.stderr.trim() }
            ))
            .into());
        }
        tracing::debug!(destination = %session.destination, "ssh session ready");
        Ok(session)
    }
}

impl OpenSshSession {
    fn command(&self, remote: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(ssh_args(
            &self.key_path,
            self.port,
            self.connect_timeout_secs,
            &self.destination,
            remote,
        ))
        .kill_on_drop(true);
        cmd
    }
}

impl ShellSession for OpenSshSession {
    async fn run_capture(
        &mut self,
        command: &str,
        stdout: &mut (impl AsyncWrite + Unpin),
    ) -> Result<RemoteExit> {
        let mut child = self
            .command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.program))?;
        let stderr = collect_stderr(&mut child);
        let mut out = child.stdout.take().context("ssh stdout not captured")?;

        let copied = copy(&mut out, stdout).await;
        if let Err(e) = copied {
            let _ = child.kill().await;
            return Err(e);
        }
        finish(child, stderr).await
    }

    async fn run_feed(
        &mut self,
        command: &str,
        stdin: &mut (impl AsyncRead + Unpin),
    ) -> Result<RemoteExit> {
        let mut child = self
            .command(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.program))?;
        let stderr = collect_stderr(&mut child);
        let mut input = child.stdin.take().context("ssh stdin not captured")?;

        let mut buf = vec![0u8; COPY_CHUNK];
        let mut pipe_error = None;
        loop {
            let n = match stdin.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    let _ = child.kill().await;
                    return Err(e.into());
                }
            };
            if n == 0 {
                break;
            }
            // A remote command that exits early closes the pipe; its exit
            // status explains why.
            if let Err(e) = input.write_all(&buf[..n]).await {
                pipe_error = Some(e);
                break;
            }
        }
        if pipe_error.is_none()
            && let Err(e) = input.shutdown().await
        {
            pipe_error = Some(e);
        }
        drop(input);

        let exit = finish(child, stderr).await?;
        match pipe_error {
            Some(e) if exit.success() => Err(anyhow::Error::from(e).context("remote command stopped reading its input")),
            _ => Ok(exit),
        }
    }
}

/// Arguments for one non-interactive `ssh` invocation.
#[must_use]
pub fn ssh_args(
    key_path: &Path,
    port: u16,
    connect_timeout_secs: u64,
    destination: &str,
    remote: &str,
) -> Vec<String> {
    vec![
        "-i".to_string(),
        key_path.to_string_lossy().into_owned(),
        "-p".to_string(),
        port.to_string(),
        "-o".to_string(),
        "StrictHostKeyChecking=no".to_string(),
        "-o".to_string(),
        "UserKnownHostsFile=/dev/null".to_string(),
        "-o".to_string(),
        "LogLevel=ERROR".to_string(),
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        "IdentitiesOnly=yes".to_string(),
        "-o".to_string(),
        format!("ConnectTimeout={connect_timeout_secs}"),
        destination.to_string(),
        remote.to_string(),
    ]
}

async fn copy<R, W>(reader: &mut R, writer: &mut W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; COPY_CHUNK];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).await?;
    }
    writer.flush().await?;
    Ok(())
}

fn collect_stderr(child: &mut Child) -> tokio::task::JoinHandle<String> {
    let pipe = child.stderr.take();
    tokio::spawn(async move {
        let mut text = String::new();
        if let Some(mut pipe) = pipe {
            let mut raw = Vec::new();
            let _ = pipe.read_to_end(&mut raw).await;
            text = String::from_utf8_lossy(&raw).into_owned();
        }
        text
    })
}

async fn finish(mut child: Child, stderr: tokio::task::JoinHandle<String>) -> Result<RemoteExit> {
    let status = child.wait().await.context("failed to wait for ssh")?;
    let stderr = stderr.await.unwrap_or_default();
    tracing::debug!(code = ?status.code(), "ssh exited");
    Ok(RemoteExit {
        code: status.code(),
        stderr,
    })
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
