//! Transfer executor: open a remote shell on the temporary server and stream
//! volume data between it and a local file.
//!
//! Imports only from `crate::domain` and `crate::application::ports`. The
//! local file is opened here because it is the far end of the stream.

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use anyhow::Result;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};

use crate::application::ports::{RemoteExit, RemoteShell, SessionTarget, ShellSession};
use crate::domain::cloud::Volume;
use crate::domain::error::{HcError, find_hc_error};
use crate::domain::transfer::TransferDirection;

/// Dial the remote shell.
///
/// # Errors
///
/// Returns `HcError::Session` if the connection or authentication fails.
pub async fn open_session<S: RemoteShell>(
    shell: &S,
    target: &SessionTarget<'_>,
) -> Result<S::Session> {
    tracing::debug!(host = %target.host, port = target.port, user = target.user, "opening remote shell");
    shell.open(target).await.map_err(|e| {
        if matches!(find_hc_error(&e), Some(HcError::Session(_))) {
            e
        } else {
            HcError::Session(format!("{e:#}")).into()
        }
    })
}

/// Move `volume`'s data in `direction`. `local` is the file written by a
/// download and read by an upload.
///
/// Returns the number of bytes moved.
///
/// # Errors
///
/// Returns `HcError::InvalidInput` if no command can be built for the volume,
/// otherwise the errors of [`run_download`] or [`run_upload`].
pub async fn run(
    session: &mut impl ShellSession,
    direction: TransferDirection,
    volume: &Volume,
    local: &Path,
) -> Result<u64> {
    let command = direction.command(volume.id, &volume.linux_device)?;
    tracing::debug!(volume_id = volume.id, ?direction, path = %local.display(), "starting transfer");
    match direction {
        TransferDirection::Download(_) => run_download(session, &command, local).await,
        TransferDirection::Upload => run_upload(session, &command, local).await,
    }
}

/// Run `command` and write its stdout to `dest`, created or truncated first.
///
/// Returns the number of bytes written.
///
/// # Errors
///
/// Returns `HcError::LocalIo` if `dest` cannot be written, `HcError::Session`
/// if the command cannot be run, or `HcError::Transfer` on a non-zero exit.
pub async fn run_download(
    session: &mut impl ShellSession,
    command: &str,
    dest: &Path,
) -> Result<u64> {
    let file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| local_io(dest, &e))?;
    let mut sink = LocalEnd::new(file);

    let outcome = session.run_capture(command, &mut sink).await;
    sink.check(dest)?;
    let exit = outcome.map_err(|e| HcError::Session(format!("{e:#}")))?;
    sink.flush().await.map_err(|e| local_io(dest, &e))?;
    check_exit(&exit)?;

    tracing::info!(path = %dest.display(), bytes = sink.bytes, "download finished");
    Ok(sink.bytes)
}

/// Run `command` with the contents of `source` as its stdin.
///
/// Returns the number of bytes sent.
///
/// # Errors
///
/// Returns `HcError::LocalIo` if `source` cannot be read, `HcError::Session`
/// if the command cannot be run, or `HcError::Transfer` on a non-zero exit.
pub async fn run_upload(
    session: &mut impl ShellSession,
    command: &str,
    source: &Path,
) -> Result<u64> {
    let file = tokio::fs::File::open(source)
        .await
        .map_err(|e| local_io(source, &e))?;
    let mut input = LocalEnd::new(file);

    let outcome = session.run_feed(command, &mut input).await;
    input.check(source)?;
    let exit = outcome.map_err(|e| HcError::Session(format!("{e:#}")))?;
    check_exit(&exit)?;

    tracing::info!(path = %source.display(), bytes = input.bytes, "upload finished");
    Ok(input.bytes)
}

fn check_exit(exit: &RemoteExit) -> Result<()> {
    if exit.success() {
        return Ok(());
    }
    Err(HcError::Transfer {
        code: exit.code,
        stderr: exit.stderr.trim().to_string(),
    }
    .into())
}

fn local_io(path: &Path, err: &io::Error) -> anyhow::Error {
    HcError::LocalIo {
        path: path.display().to_string(),
        message: err.to_string(),
    }
    .into()
}

// ── Local end of the stream ───────────────────────────────────────────────────

/// Wraps the local file so a failure on our side of the pipe can be told
/// apart from a failure of the remote command.
struct LocalEnd<T> {
    inner: T,
    bytes: u64,
    failure: Option<String>,
}

impl<T> LocalEnd<T> {
    fn new(inner: T) -> Self {
        Self { inner, bytes: 0, failure: None }
    }

    fn record<R>(&mut self, res: &Poll<io::Result<R>>) {
        if let Poll::Ready(Err(e)) = res {
            self.failure.get_or_insert_with(|| e.to_string());
        }
    }

    fn check(&mut self, path: &Path) -> Result<()> {
        match self.failure.take() {
            Some(message) => Err(HcError::LocalIo {
                path: path.display().to_string(),
                message,
            }
            .into()),
            None => Ok(()),
        }
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for LocalEnd<T> {
    fn poll_write(self: Pin<&mut Self>, cx: &mut TaskContext<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let res = Pin::new(&mut this.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = res {
            this.bytes += n as u64;
        }
        this.record(&res);
        res
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let res = Pin::new(&mut this.inner).poll_flush(cx);
        this.record(&res);
        res
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let res = Pin::new(&mut this.inner).poll_shutdown(cx);
        this.record(&res);
        res
    }
}

impl<T: AsyncRead + Unpin> AsyncRead for LocalEnd<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let res = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = res {
            this.bytes += (buf.filled().len() - before) as u64;
        }
        this.record(&res);
        res
    }
}
