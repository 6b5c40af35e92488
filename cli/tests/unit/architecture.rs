//! Structural tests for architectural boundary enforcement.
//!
//! These tests scan source files to verify that the layering between
//! `domain`, `application`, `infra`, `output` and `commands` holds.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Track brace depth and return whether a line is inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    /// Process a line and return `true` if it's inside a `#[cfg(test)]` block.
    fn process_line(&mut self, line: &str) -> bool {
        if line.trim().contains("#[cfg(test)]") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

fn src(sub: &[&str]) -> PathBuf {
    sub.iter()
        .fold(Path::new(env!("CARGO_MANIFEST_DIR")).join("src"), |p, s| p.join(s))
}

/// Non-test, non-comment lines under `dir` matching `forbidden`, as `file:line: text`.
fn violations(dir: &Path, forbidden: impl Fn(&str) -> bool) -> Vec<String> {
    let mut found = Vec::new();
    for file in collect_rs_files(dir) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();
        let mut tracker = CfgTestTracker::new();
        for (i, line) in content.lines().enumerate() {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            if in_test || trimmed.starts_with("//") || trimmed.starts_with("#!") {
                continue;
            }
            if forbidden(line) {
                found.push(format!("{rel}:{}: {trimmed}", i + 1));
            }
        }
    }
    found
}

// ── Domain purity ─────────────────────────────────────────────────────────────

#[test]
fn domain_has_no_io_or_outer_layer_imports() {
    let forbidden = [
        "crate::infra",
        "crate::application",
        "crate::commands",
        "crate::output",
        "tokio",
        "std::fs",
        "std::process",
        "reqwest",
    ];
    let found = violations(&src(&["domain"]), |line| {
        forbidden.iter().any(|f| line.contains(f))
    });
    assert!(
        found.is_empty(),
        "domain/ must stay pure:\n{}",
        found.join("\n")
    );
}

// ── Services depend on ports only ─────────────────────────────────────────────

#[test]
fn services_import_only_domain_and_ports() {
    let forbidden = [
        "crate::infra",
        "crate::commands",
        "crate::output",
        "crate::app::",
        "reqwest",
        "dialoguer",
        "indicatif",
    ];
    let found = violations(&src(&["application"]), |line| {
        forbidden.iter().any(|f| line.contains(f))
    });
    assert!(
        found.is_empty(),
        "application/ must reach I/O through port traits:\n{}",
        found.join("\n")
    );
}

#[test]
fn no_concrete_adapter_types_in_service_signatures() {
    let concrete = [
        "HcloudClient",
        "OpenSsh",
        "RsaKeyGenerator",
        "TokioReachabilityProbe",
        "TerminalPrompt",
        "TerminalReporter",
    ];
    let found = violations(&src(&["application"]), |line| {
        line.contains("fn ") && concrete.iter().any(|c| line.contains(c))
    });
    assert!(
        found.is_empty(),
        "use trait bounds instead of concrete adapters:\n{}",
        found.join("\n")
    );
}

// ── Infra ─────────────────────────────────────────────────────────────────────

#[test]
fn infra_has_no_imports_from_commands_or_output() {
    let found = violations(&src(&["infra"]), |line| {
        line.contains("crate::commands") || line.contains("crate::output")
    });
    assert!(
        found.is_empty(),
        "infra/ must not import from commands/ or output/:\n{}",
        found.join("\n")
    );
}

#[test]
fn only_presentation_code_prints() {
    for layer in ["infra", "application", "domain"] {
        let found = violations(&src(&[layer]), |line| {
            line.contains("println!") || line.contains("eprintln!")
        });
        assert!(
            found.is_empty(),
            "{layer}/ must not print outside #[cfg(test)]; use tracing or ProgressReporter:\n{}",
            found.join("\n")
        );
    }
}
