//! Application context: unified state passed to every command handler.
//!
//! Adding a new cross-cutting concern requires only one field change here;
//! command signatures stay the same.

use anyhow::Result;

use crate::domain::config::{HcutilsConfig, RunSettings};
use crate::infra::config::{YamlConfigStore, api_token};
use crate::infra::hcloud::HcloudClient;
use crate::output::{OutputContext, PromptMode};

/// Environment variable that answers every prompt with yes, like `--yes`.
pub const YES_ENV: &str = "HCUTILS_YES";
/// Set by CI systems; prompts are answered with their defaults.
pub const CI_ENV: &str = "CI";

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Answer every prompt with yes (also set by the `HCUTILS_YES` env var).
    pub yes: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Behaviour options.
    pub behaviour: BehaviourFlags,
}

/// Unified application context passed to every command handler.
///
/// Constructed once in `Cli::run()` and passed as `&AppContext` to all
/// command handlers.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Loaded configuration (defaults, file, environment).
    pub config: HcutilsConfig,
    /// How operator prompts are answered. See [`prompt_mode`].
    pub prompt_mode: PromptMode,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let prompt_mode = prompt_mode(flags.behaviour.yes, |key| std::env::var(key).ok());

        let config = YamlConfigStore.load()?;
        tracing::debug!(endpoint = %config.endpoint, server_type = %config.server.server_type, "configuration loaded");

        Ok(Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            config,
            prompt_mode,
        })
    }

    /// Per-run settings derived from the configuration.
    #[must_use]
    pub fn run_settings(&self) -> RunSettings {
        RunSettings::from(&self.config)
    }

    /// Cloud API client authenticated with `HCLOUD_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns `HcError::MissingToken` if the token is not set, or an error if
    /// the HTTP client cannot be built.
    pub fn cloud_client(&self) -> Result<HcloudClient> {
        HcloudClient::new(&self.config.endpoint, api_token()?)
    }
}

/// `--yes` or `HCUTILS_YES` answer yes; `CI` alone only keeps defaults, so a
/// CI job never confirms a destructive step by accident.
#[must_use]
pub fn prompt_mode(yes: bool, lookup: impl Fn(&str) -> Option<String>) -> PromptMode {
    if yes || lookup(YES_ENV).is_some() {
        PromptMode::AssumeYes
    } else if lookup(CI_ENV).is_some() {
        PromptMode::Defaults
    } else {
        PromptMode::Interactive
    }
}
