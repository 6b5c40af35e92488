//! `TerminalReporter`: Presentation-layer implementation of `ProgressReporter`.
//!
//! Wraps `&OutputContext` and implements the `application::ports::ProgressReporter`
//! trait so application services can emit progress events without depending on
//! any presentation type directly.

use std::cell::RefCell;

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::{OutputContext, progress};

/// Terminal progress reporter that wraps an `OutputContext`.
///
/// On a TTY each `step()` runs a spinner until the next event; otherwise it
/// prints `"  → {message}"`. All output is suppressed when `ctx.quiet`.
/// A spinner still running when the reporter is dropped is marked failed.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    active: RefCell<Option<ProgressBar>>,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            active: RefCell::new(None),
        }
    }

    /// Run `f` with the spinner (if any) hidden, e.g. around a prompt.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        match self.active.borrow().as_ref() {
            Some(pb) => pb.suspend(f),
            None => f(),
        }
    }

    fn settle(&self) {
        if let Some(pb) = self.active.borrow_mut().take() {
            let msg = pb.message();
            progress::finish_ok(&pb, &msg);
        }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        self.settle();
        if self.ctx.show_progress() {
            *self.active.borrow_mut() = Some(progress::spinner(message));
        } else {
            println!("  {} {message}", "→".style(self.ctx.styles.step));
        }
    }

    fn success(&self, message: &str) {
        self.settle();
        self.ctx.success(message);
    }

    fn warn(&self, message: &str) {
        self.suspend(|| self.ctx.warn(message));
    }
}

impl Drop for TerminalReporter<'_> {
    fn drop(&mut self) {
        if let Some(pb) = self.active.get_mut().take() {
            let msg = pb.message();
            progress::finish_error(&pb, &msg);
        }
    }
}
