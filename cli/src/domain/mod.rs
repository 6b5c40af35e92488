//! Domain layer: pure types, naming rules, command templates, validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.
//! All functions are synchronous and take data in, returning data out.

pub mod cloud;
pub mod config;
pub mod credentials;
pub mod error;
pub mod transfer;

pub use cloud::{Action, ActionStatus, PriorAttachment, Server, SshKeyRef, Volume};
pub use config::{HcutilsConfig, PollSettings, RunSettings};
pub use credentials::EphemeralKeyPair;
pub use error::{HcError, JoinedError};
pub use transfer::{DownloadKind, TransferDirection};
