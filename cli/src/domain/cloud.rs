//! Provider-side resources as seen by the transfer pipeline.
//!
//! Plain data only. The wire format lives in `crate::infra::hcloud`.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use rand::Rng;

/// Label key marking every resource this tool creates.
pub const MARKER_LABEL_KEY: &str = "created-by";
/// Label value marking every resource this tool creates.
pub const MARKER_LABEL_VALUE: &str = "hcutils";

pub const TEMP_SSH_KEY_PREFIX: &str = "hcutil-temp-ssh-";
pub const TEMP_SERVER_PREFIX: &str = "hcutil-temp-srv-";
pub const UPLOADED_VOLUME_PREFIX: &str = "hcutil-uploaded-volume-";

/// Number of random digits appended to generated resource names.
pub const NAME_SUFFIX_DIGITS: usize = 5;

// ── Actions ──────────────────────────────────────────────────────────────────

/// Progress of an asynchronous provider operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    Pending,
    Running,
    Success,
    Error,
}

/// Snapshot of a provider operation. Re-fetch by `id` to observe progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub id: u64,
    /// Provider command name, e.g. `attach_volume`.
    pub command: String,
    pub status: ActionStatus,
    /// Provider error text, set when `status` is `Error`.
    pub error_message: Option<String>,
}

impl Action {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, ActionStatus::Success | ActionStatus::Error)
    }
}

// ── Resources ────────────────────────────────────────────────────────────────

/// A registered public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshKeyRef {
    pub id: u64,
    pub name: String,
}

/// A compute instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    pub id: u64,
    pub name: String,
    pub location: String,
    /// Public IPv4, absent until the provider has assigned one.
    pub ipv4: Option<Ipv4Addr>,
}

/// A block-storage volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub id: u64,
    pub name: String,
    pub size_gb: u32,
    pub location: String,
    /// Raw block device on the attached server, e.g. `/dev/disk/by-id/scsi-0HC_Volume_42`.
    pub linux_device: String,
    /// ID of the server the volume is attached to.
    pub server: Option<u64>,
}

/// The server a volume was attached to before this run detached it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorAttachment {
    pub server_id: u64,
    pub server_name: String,
}

/// A freshly created resource with the action(s) that complete its creation.
#[derive(Debug, Clone)]
pub struct Created<T> {
    pub resource: T,
    pub action: Option<Action>,
    pub next_actions: Vec<Action>,
}

// ── Create requests ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshKeySpec {
    pub name: String,
    /// Public key in OpenSSH `authorized_keys` format.
    pub public_key: String,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSpec {
    pub name: String,
    pub server_type: String,
    pub image: String,
    pub location: String,
    pub ssh_keys: Vec<u64>,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSpec {
    pub name: String,
    pub size_gb: u32,
    /// Server to attach the new volume to. The volume is created in its location.
    pub server: u64,
    pub automount: bool,
    /// Filesystem to format the volume with, e.g. `ext4`.
    pub format: String,
    pub labels: BTreeMap<String, String>,
}

// ── Naming ───────────────────────────────────────────────────────────────────

/// `n` random decimal digits.
#[must_use]
pub fn random_digits(n: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

#[must_use]
pub fn temp_ssh_key_name() -> String {
    format!("{TEMP_SSH_KEY_PREFIX}{}", random_digits(NAME_SUFFIX_DIGITS))
}

#[must_use]
pub fn temp_server_name() -> String {
    format!("{TEMP_SERVER_PREFIX}{}", random_digits(NAME_SUFFIX_DIGITS))
}

#[must_use]
pub fn uploaded_volume_name() -> String {
    format!("{UPLOADED_VOLUME_PREFIX}{}", random_digits(NAME_SUFFIX_DIGITS))
}

/// Labels put on every resource this tool creates.
#[must_use]
pub fn marker_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(MARKER_LABEL_KEY.to_string(), MARKER_LABEL_VALUE.to_string())])
}
