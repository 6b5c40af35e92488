//! Remote shell commands that move volume data, and the inputs they accept.
//!
//! Pure functions only. Nothing operator-supplied is ever interpolated into a
//! command: only numeric volume IDs and provider-reported device paths, and
//! the latter are checked against a strict whitelist first.

use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use crate::domain::error::HcError;

/// First two bytes of every gzip stream.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Smallest volume the provider will create, in GB.
pub const MIN_VOLUME_SIZE_GB: u32 = 10;
/// Largest volume the provider will create, in GB.
pub const MAX_VOLUME_SIZE_GB: u32 = 10_240;

/// Filesystem new volumes are formatted with.
pub const UPLOAD_FILESYSTEM: &str = "ext4";

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static DEVICE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/dev/[A-Za-z0-9_.:/-]+$").expect("valid regex"));

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("valid regex"));

/// Which way the data flows. Selects the remote command and whether the
/// local file is the sink or the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Remote volume → local file.
    Download(DownloadKind),
    /// Local file → remote volume.
    Upload,
}

impl TransferDirection {
    /// Remote command for this direction on the given volume.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if an image is requested for an unusable device path.
    pub fn command(self, volume_id: u64, device: &str) -> Result<String> {
        match self {
            Self::Download(kind) => download_command(kind, volume_id, device),
            Self::Upload => Ok(upload_command(volume_id)),
        }
    }
}

/// Shape of a downloaded volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadKind {
    /// Gzipped tarball of the mounted filesystem.
    #[default]
    Archive,
    /// Gzipped raw image of the block device.
    Image,
}

impl DownloadKind {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Archive => "tar.gz",
            Self::Image => "img.gz",
        }
    }
}

/// Automount point of a volume on the server it is attached to.
#[must_use]
pub fn mount_dir(volume_id: u64) -> String {
    format!("/mnt/HC_Volume_{volume_id}/")
}

/// Stream a gzipped tarball of the mounted volume to stdout.
#[must_use]
pub fn archive_command(volume_id: u64) -> String {
    format!("cd {} && tar czf - . | cat", mount_dir(volume_id))
}

/// Stream a gzipped raw image of `device` to stdout.
///
/// # Errors
///
/// Returns `InvalidInput` if `device` is not a plain `/dev/...` path.
pub fn image_command(device: &str) -> Result<String> {
    validate_device_path(device)?;
    Ok(format!("dd if={device} bs=32M | gzip -f"))
}

/// Wait for the volume to be mounted, unpack a gzipped tarball from stdin
/// into it, and flush to disk.
#[must_use]
pub fn upload_command(volume_id: u64) -> String {
    format!(
        "\nDIR={}\nwhile [ ! -d $DIR ]; do\n\tsleep 1\ndone\ncd $DIR && tar xfz -\nsync",
        mount_dir(volume_id)
    )
}

/// Command for a download of `kind`.
///
/// # Errors
///
/// Returns `InvalidInput` if an image is requested for an unusable device path.
pub fn download_command(kind: DownloadKind, volume_id: u64, device: &str) -> Result<String> {
    match kind {
        DownloadKind::Archive => Ok(archive_command(volume_id)),
        DownloadKind::Image => image_command(device),
    }
}

/// `volume-<id>.tar.gz` or `volume-<id>.img.gz`.
#[must_use]
pub fn default_output_path(kind: DownloadKind, volume_id: u64) -> PathBuf {
    PathBuf::from(format!("volume-{volume_id}.{}", kind.extension()))
}

/// # Errors
///
/// Returns `InvalidInput` unless `path` is `/dev/` followed by path-safe characters.
pub fn validate_device_path(path: &str) -> Result<()> {
    if !DEVICE_PATH.is_match(path) || path.split('/').any(|part| part == "..") {
        return Err(HcError::InvalidInput(format!("refusing to read from device path {path:?}")).into());
    }
    Ok(())
}

/// Check the operator's upload parameters before anything is created.
///
/// # Errors
///
/// Returns `InvalidInput` for an out-of-range size, a malformed location, or
/// an empty volume name.
pub fn validate_upload(size_gb: u32, location: &str, name: Option<&str>) -> Result<()> {
    if !(MIN_VOLUME_SIZE_GB..=MAX_VOLUME_SIZE_GB).contains(&size_gb) {
        return Err(HcError::InvalidInput(format!(
            "volume size must be between {MIN_VOLUME_SIZE_GB} and {MAX_VOLUME_SIZE_GB} GB (got {size_gb})"
        ))
        .into());
    }
    if !LOCATION.is_match(location) {
        return Err(HcError::InvalidInput(format!("invalid location {location:?}")).into());
    }
    if name.is_some_and(|n| n.trim().is_empty()) {
        return Err(HcError::InvalidInput("volume name must not be empty".into()).into());
    }
    Ok(())
}
