//! Command implementations

pub mod download;
pub mod upload;

use crate::infra::keys::RsaKeyGenerator;
use crate::infra::network::TokioReachabilityProbe;
use crate::infra::ssh::OpenSsh;

/// Production adapters that carry no per-run state.
pub(crate) struct LocalAdapters {
    pub keys: RsaKeyGenerator,
    pub probe: TokioReachabilityProbe,
    pub shell: OpenSsh,
}

impl Default for LocalAdapters {
    fn default() -> Self {
        Self {
            keys: RsaKeyGenerator::default(),
            probe: TokioReachabilityProbe::default(),
            shell: OpenSsh::default(),
        }
    }
}

/// Human-readable byte count, e.g. `1.5 GiB`.
#[allow(clippy::cast_precision_loss)] // Display only
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
