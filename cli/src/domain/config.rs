//! Domain types for hcutils configuration.
//!
//! Pure functions only. No I/O or async.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "https://api.hetzner.cloud/v1";
pub const DEFAULT_SERVER_TYPE: &str = "cx22";
pub const DEFAULT_IMAGE: &str = "ubuntu-22.04";
pub const DEFAULT_SSH_USER: &str = "root";
pub const SSH_PORT: u16 = 22;

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.config/hcutils/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HcutilsConfig {
    /// Cloud API base URL.
    pub endpoint: String,
    /// Temporary server settings.
    pub server: ServerConfig,
    /// Poll intervals and timeouts.
    pub polling: PollingConfig,
}

impl Default for HcutilsConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            server: ServerConfig::default(),
            polling: PollingConfig::default(),
        }
    }
}

/// Shape of the temporary server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server type, e.g. `cx22`.
    pub server_type: String,
    /// OS image, e.g. `ubuntu-22.04`.
    pub image: String,
    /// Login user on the temporary server.
    pub ssh_user: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_type: DEFAULT_SERVER_TYPE.to_string(),
            image: DEFAULT_IMAGE.to_string(),
            ssh_user: DEFAULT_SSH_USER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub action_interval_ms: u64,
    pub reachability_interval_ms: u64,
    pub reachability_timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            action_interval_ms: 2_000,
            reachability_interval_ms: 2_000,
            reachability_timeout_secs: 60,
        }
    }
}

// ── Runtime settings ─────────────────────────────────────────────────────────

/// Poll cadence used by the action poller and the reachability wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between action status re-fetches.
    pub action_interval: Duration,
    /// Delay between connection attempts.
    pub reachability_interval: Duration,
    /// Give up waiting for the shell port after this long.
    pub reachability_timeout: Duration,
    /// Port the remote shell listens on.
    pub ssh_port: u16,
}

impl PollSettings {
    /// No sleeping at all; for tests and dry runs.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            action_interval: Duration::ZERO,
            reachability_interval: Duration::ZERO,
            reachability_timeout: Duration::from_secs(60),
            ssh_port: SSH_PORT,
        }
    }
}

impl From<&PollingConfig> for PollSettings {
    fn from(cfg: &PollingConfig) -> Self {
        Self {
            action_interval: Duration::from_millis(cfg.action_interval_ms),
            reachability_interval: Duration::from_millis(cfg.reachability_interval_ms),
            reachability_timeout: Duration::from_secs(cfg.reachability_timeout_secs),
            ssh_port: SSH_PORT,
        }
    }
}

/// Everything the pipeline needs to know about the temporary server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub server_type: String,
    pub image: String,
    pub ssh_user: String,
    pub poll: PollSettings,
}

impl From<&HcutilsConfig> for RunSettings {
    fn from(cfg: &HcutilsConfig) -> Self {
        Self {
            server_type: cfg.server.server_type.clone(),
            image: cfg.server.image.clone(),
            ssh_user: cfg.server.ssh_user.clone(),
            poll: PollSettings::from(&cfg.polling),
        }
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
