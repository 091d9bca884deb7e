//! Version bump command

use anyhow::{Context, Result};
use fwpack::{BumpKind, bump_project};
use std::path::PathBuf;

/// Run the bump command
pub fn run(kind: &str, project: Option<PathBuf>) -> Result<()> {
    let kind = BumpKind::parse(kind)?;
    let project_dir = project.unwrap_or_else(|| PathBuf::from("."));

    let report = bump_project(&project_dir, kind)
        .with_context(|| format!("Failed to bump version in {}", project_dir.display()))?;

    println!("Current version: {}", report.previous);
    println!("New version: {}", report.current);
    println!(
        "Updated {} to version {}",
        report.source.display(),
        report.current
    );
    if let Some(template) = &report.template {
        println!("Updated {} to version {}", template.display(), report.current);
    }

    println!("\n✓ Version bumped successfully!");
    Ok(())
}
