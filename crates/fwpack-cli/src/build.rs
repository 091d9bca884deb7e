//! Build command implementation

use anyhow::{Context, Result};
use fwpack::config::build_dir_for_env;
use fwpack::provider::EnvToolchain;
use fwpack::{ArtifactKind, BuildLayout, BuildOrchestrator, BuildOutcome, ProjectConfig};
use std::path::PathBuf;

/// Run the post-build pipeline for a project
pub fn run(project: Option<PathBuf>, env: Option<String>, build_dir: Option<PathBuf>) -> Result<()> {
    let orchestrator = orchestrator(project, env, build_dir)?;
    let now = chrono::Local::now().naive_local();

    println!(
        "Packaging firmware in: {}",
        orchestrator.layout().build_dir.display()
    );

    match orchestrator.run(now).context("Post-build packaging failed")? {
        BuildOutcome::Skipped { build_dir } => {
            println!(
                "No firmware.bin or firmware.hex in {}, skipping",
                build_dir.display()
            );
        }
        BuildOutcome::Succeeded(report) => {
            let format = match report.kind {
                ArtifactKind::Bin => "raw binary",
                ArtifactKind::Hex => "FLFW package",
            };
            println!("\n✓ Firmware packaged!");
            println!(
                "  Firmware: {} v{}",
                report.metadata.firmware.board, report.metadata.firmware.version
            );
            println!(
                "  Artifact: {} ({} bytes)",
                report.artifact.display(),
                report.artifact_len
            );
            println!("  Metadata: {}", report.sidecar.display());
            println!("  Output: {} ({format}, {} bytes)", report.output_name, report.output_len);
            for path in &report.outputs {
                println!("    {}", path.display());
            }
        }
    }

    Ok(())
}

/// Resolve configuration and command-line overrides into an orchestrator.
fn orchestrator(
    project: Option<PathBuf>,
    env: Option<String>,
    build_dir: Option<PathBuf>,
) -> Result<BuildOrchestrator> {
    let project_dir = project.unwrap_or_else(|| PathBuf::from("."));
    let config = ProjectConfig::load(&project_dir)
        .with_context(|| format!("Failed to load configuration in {}", project_dir.display()))?;

    let mut layout = BuildLayout::from_config(&project_dir, &config);
    if let Some(env) = env {
        layout = layout.with_build_dir(project_dir.join(build_dir_for_env(&env)));
    }
    if let Some(build_dir) = build_dir {
        layout = layout.with_build_dir(project_dir.join(build_dir));
    }

    let toolchain = EnvToolchain::new(
        &config.toolchain.platformio_version_env,
        &config.toolchain.python_version_env,
    );
    Ok(BuildOrchestrator::new(layout).with_toolchain(toolchain))
}
