//! Workflow lint command.
//!
//! Line-level checks for CI workflow files that catch the mistakes that
//! otherwise only show up after a push. This is not a YAML parser.

use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A line-level problem in a workflow file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// `<< EOF` style heredoc, which often breaks inside `run:` blocks
    Heredoc { line: usize },
    UnmatchedDoubleQuote { line: usize },
    UnmatchedSingleQuote { line: usize },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heredoc { line } => write!(
                f,
                "Line {line}: Contains heredoc syntax (<< EOF) - may cause issues"
            ),
            Self::UnmatchedDoubleQuote { line } => write!(f, "Line {line}: Unmatched quotes"),
            Self::UnmatchedSingleQuote { line } => {
                write!(f, "Line {line}: Unmatched single quotes")
            }
        }
    }
}

/// Result of checking one workflow file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Report {
    pub findings: Vec<Finding>,
    pub uses_actions: bool,
    pub has_triggers: bool,
}

/// Check workflow text.
pub fn check(content: &str) -> Report {
    let mut findings = Vec::new();

    for (index, line) in content.split('\n').enumerate() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let line_number = index + 1;
        if line.contains("<<") && line.contains("EOF") {
            findings.push(Finding::Heredoc { line: line_number });
        }
        if line.matches('"').count() % 2 != 0 {
            findings.push(Finding::UnmatchedDoubleQuote { line: line_number });
        }
        if line.matches('\'').count() % 2 != 0 {
            findings.push(Finding::UnmatchedSingleQuote { line: line_number });
        }
    }

    Report {
        findings,
        uses_actions: content.contains("uses:") && content.contains("actions/"),
        has_triggers: content.contains("on:"),
    }
}

/// Workflow files (`*.yml`, `*.yaml`) directly inside `dir`, sorted by name.
pub fn workflow_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        let is_workflow = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "yml" || ext == "yaml");
        if is_workflow && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Run the check-workflows command
pub fn run(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("{} directory not found", dir.display());
    }

    let files = workflow_files(dir)?;
    if files.is_empty() {
        anyhow::bail!("No YAML workflow files found in {}", dir.display());
    }

    println!("Validating {} workflow file(s)...", files.len());

    let mut unreadable = Vec::new();
    for path in &files {
        let name = path.file_name().map_or_else(
            || path.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        );
        println!("\n{name}:");

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                println!("  ✗ Error reading {}: {e}", path.display());
                unreadable.push(name);
                continue;
            }
        };

        let report = check(&content);
        debug!(file = %name, findings = report.findings.len(), "checked workflow");
        for finding in &report.findings {
            println!("  ⚠ {finding}");
        }
        if report.uses_actions {
            println!("  ✓ Contains GitHub Actions");
        }
        if report.has_triggers {
            println!("  ✓ Contains workflow triggers");
        }
        println!("  ✓ {name} passed basic validation");
    }

    if !unreadable.is_empty() {
        anyhow::bail!("Could not read workflow file(s): {}", unreadable.join(", "));
    }

    println!("\n✓ All workflow files passed basic validation!");
    Ok(())
}
