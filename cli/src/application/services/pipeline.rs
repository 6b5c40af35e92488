//! Ports and settings shared by the download and upload use-cases.

use crate::domain::config::RunSettings;

/// Everything a transfer run talks to, borrowed for the duration of the run.
pub struct Pipeline<'a, C, K, P, S, Q, R> {
    pub cloud: &'a C,
    pub keys: &'a K,
    pub probe: &'a P,
    pub shell: &'a S,
    pub prompt: &'a Q,
    pub reporter: &'a R,
    pub settings: &'a RunSettings,
}
