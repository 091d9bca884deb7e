//! Post-build pipeline: from compiled artifact to published, version-stamped output.
//!
//! A build attempt ends in one of three states:
//!
//! - [`BuildOutcome::Skipped`]: the compiler has not produced an artifact yet
//! - [`BuildOutcome::Succeeded`]: outputs were written
//! - `Err(_)`: a step failed and nothing past the failing step was written
//!
//! # Example
//!
//! ```no_run
//! use fwpack::{BuildLayout, BuildOrchestrator, BuildOutcome, ProjectConfig};
//!
//! let config = ProjectConfig::load(std::path::Path::new("."))?;
//! let layout = BuildLayout::from_config(".", &config);
//! let orchestrator = BuildOrchestrator::new(layout);
//!
//! match orchestrator.run(chrono::Local::now().naive_local())? {
//!     BuildOutcome::Skipped { .. } => println!("nothing to package yet"),
//!     BuildOutcome::Succeeded(report) => println!("wrote {}", report.output_name),
//! }
//! # Ok::<(), fwpack::PackageError>(())
//! ```

use crate::codec;
use crate::declaration;
use crate::output::write_atomic;
use crate::provider::{EnvToolchain, GitRevision, RevisionProvider, ToolchainProvider};
use crate::{
    ArtifactKind, FirmwareMetadata, METADATA_FILE, MetadataStore, PackageError, PackageResult,
    ProjectConfig,
};
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Resolved filesystem locations for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    pub project_dir: PathBuf,
    pub build_dir: PathBuf,
    pub source: PathBuf,
    pub metadata: PathBuf,
    pub bin_artifact: String,
    pub hex_artifact: String,
}

impl BuildLayout {
    /// Resolve configured paths against `project_dir`.
    pub fn from_config<P: Into<PathBuf>>(project_dir: P, config: &ProjectConfig) -> Self {
        let project_dir = project_dir.into();
        Self {
            build_dir: project_dir.join(&config.build_dir),
            source: project_dir.join(&config.source),
            metadata: project_dir.join(&config.metadata),
            bin_artifact: config.bin_artifact.clone(),
            hex_artifact: config.hex_artifact.clone(),
            project_dir,
        }
    }

    /// Use a different build directory.
    #[must_use]
    pub fn with_build_dir<P: Into<PathBuf>>(mut self, build_dir: P) -> Self {
        self.build_dir = build_dir.into();
        self
    }

    /// Find the artifact to package, preferring the binary image.
    #[must_use]
    pub fn locate_artifact(&self) -> Option<(ArtifactKind, PathBuf)> {
        let bin = self.build_dir.join(&self.bin_artifact);
        if bin.is_file() {
            return Some((ArtifactKind::Bin, bin));
        }

        let hex = self.build_dir.join(&self.hex_artifact);
        if hex.is_file() {
            return Some((ArtifactKind::Hex, hex));
        }

        None
    }
}

/// Final state of a build attempt that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    /// No artifact exists yet in `build_dir`.
    Skipped { build_dir: PathBuf },
    /// Outputs were written.
    Succeeded(BuildReport),
}

/// What a successful build produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub kind: ArtifactKind,
    pub artifact: PathBuf,
    pub artifact_len: u64,
    pub metadata: FirmwareMetadata,
    pub sidecar: PathBuf,
    /// Version-stamped file name, e.g. `firmware-v1.0.1.bin`.
    pub output_name: String,
    pub output_len: usize,
    /// Build-local copy followed by the project-root copy.
    pub outputs: Vec<PathBuf>,
}

/// Runs the post-build pipeline for one project.
pub struct BuildOrchestrator {
    layout: BuildLayout,
    toolchain: Box<dyn ToolchainProvider>,
    revision: Box<dyn RevisionProvider>,
}

impl BuildOrchestrator {
    /// Create an orchestrator reading toolchain versions from the default
    /// environment variables and the revision from git.
    #[must_use]
    pub fn new(layout: BuildLayout) -> Self {
        let revision = GitRevision::new(&layout.project_dir);
        Self {
            layout,
            toolchain: Box::new(EnvToolchain::default()),
            revision: Box::new(revision),
        }
    }

    /// Replace the toolchain identifier source.
    #[must_use]
    pub fn with_toolchain<T: ToolchainProvider + 'static>(mut self, toolchain: T) -> Self {
        self.toolchain = Box::new(toolchain);
        self
    }

    /// Replace the revision source.
    #[must_use]
    pub fn with_revision<R: RevisionProvider + 'static>(mut self, revision: R) -> Self {
        self.revision = Box::new(revision);
        self
    }

    /// The layout this orchestrator builds.
    #[must_use]
    pub fn layout(&self) -> &BuildLayout {
        &self.layout
    }

    /// Run one build attempt with `now` as the build timestamp.
    pub fn run(&self, now: NaiveDateTime) -> PackageResult<BuildOutcome> {
        let Some((kind, artifact)) = self.layout.locate_artifact() else {
            info!(build_dir = %self.layout.build_dir.display(), "no firmware artifact yet, skipping");
            return Ok(BuildOutcome::Skipped {
                build_dir: self.layout.build_dir.clone(),
            });
        };
        debug!(artifact = %artifact.display(), ?kind, "found firmware artifact");

        let source = read_required(&self.layout.source)?;
        let declarations = declaration::extract(&source)?;

        let mut metadata = MetadataStore::new(&self.layout.metadata).merge(&declarations)?;

        let artifact_bytes = fs::read(&artifact)?;
        let artifact_len = artifact_bytes.len() as u64;
        metadata.attach_build_info(
            kind,
            artifact_len,
            now,
            self.revision.revision(),
            &self.toolchain.resolve(),
        );

        let sidecar = self.layout.build_dir.join(METADATA_FILE);
        write_atomic(&sidecar, metadata.to_pretty_json()?.as_bytes())?;
        debug!(path = %sidecar.display(), "wrote sidecar metadata");

        let output = match kind {
            ArtifactKind::Bin => artifact_bytes,
            ArtifactKind::Hex => {
                let package = codec::encode(&metadata, &artifact_bytes)?;
                for warning in codec::inspect(&package)?.device_warnings() {
                    warn!(%warning, "package may be rejected by the device updater");
                }
                package
            }
        };

        let output_name = output_file_name(&declarations.version);
        let outputs = self.publish(&output_name, &output)?;

        Ok(BuildOutcome::Succeeded(BuildReport {
            kind,
            artifact,
            artifact_len,
            metadata,
            sidecar,
            output_name,
            output_len: output.len(),
            outputs,
        }))
    }

    /// Write identical bytes to the build directory and the project root.
    fn publish(&self, name: &str, bytes: &[u8]) -> PackageResult<Vec<PathBuf>> {
        let destinations = vec![
            self.layout.build_dir.join(name),
            self.layout.project_dir.join(name),
        ];

        for path in &destinations {
            write_atomic(path, bytes)?;
            info!(path = %path.display(), bytes = bytes.len(), "published firmware");
        }

        Ok(destinations)
    }
}

/// Version-stamped output name (`firmware-v{version}.bin`).
#[must_use]
pub fn output_file_name(version: &str) -> String {
    format!("firmware-v{version}.bin")
}

fn read_required(path: &Path) -> PackageResult<String> {
    if !path.is_file() {
        return Err(PackageError::MissingFile(path.to_path_buf()));
    }
    Ok(fs::read_to_string(path)?)
}
