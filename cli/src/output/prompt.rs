//! `TerminalPrompt`: `dialoguer` implementation of `OperatorPrompt`.

use anyhow::{Context, Result};

use crate::application::ports::OperatorPrompt;
use crate::output::TerminalReporter;

/// How prompts are answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    /// Ask on the terminal.
    Interactive,
    /// Answer every question with its default (`CI`).
    Defaults,
    /// Answer every question with yes (`--yes`, `HCUTILS_YES`).
    AssumeYes,
}

/// Yes/no questions on the controlling terminal.
///
/// Questions whose default is "no" guard destructive steps, so only
/// [`PromptMode::AssumeYes`] accepts them without a terminal.
pub struct TerminalPrompt<'a> {
    reporter: &'a TerminalReporter<'a>,
    mode: PromptMode,
}

impl<'a> TerminalPrompt<'a> {
    #[must_use]
    pub fn new(reporter: &'a TerminalReporter<'a>, mode: PromptMode) -> Self {
        Self { reporter, mode }
    }
}

impl OperatorPrompt for TerminalPrompt<'_> {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        match self.mode {
            PromptMode::AssumeYes => {
                tracing::info!(prompt, "answering prompt with yes");
                Ok(true)
            }
            PromptMode::Defaults => {
                tracing::info!(prompt, default, "answering prompt with default");
                Ok(default)
            }
            PromptMode::Interactive => self.reporter.suspend(|| {
                dialoguer::Confirm::new()
                    .with_prompt(prompt)
                    .default(default)
                    .interact()
                    .context("failed to read confirmation (use --yes to answer prompts non-interactively)")
            }),
        }
    }
}
