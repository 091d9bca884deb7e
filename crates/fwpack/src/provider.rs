//! Optional environment lookups used for build provenance.
//!
//! Both lookups are injected into the build rather than read from ambient
//! state, so metadata tests can pin their values. A lookup that fails yields
//! `None`; it is never an error.

use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Toolchain version recorded when `PLATFORMIO_VERSION` is not set.
pub const DEFAULT_PLATFORMIO_VERSION: &str = "6.1.0";

/// Toolchain version recorded when `PYTHON_VERSION` is not set.
pub const DEFAULT_PYTHON_VERSION: &str = "3.11.0";

/// Resolved toolchain identifiers copied into `build_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainIds {
    pub platformio_version: String,
    pub python_version: String,
}

impl Default for ToolchainIds {
    fn default() -> Self {
        Self {
            platformio_version: DEFAULT_PLATFORMIO_VERSION.to_string(),
            python_version: DEFAULT_PYTHON_VERSION.to_string(),
        }
    }
}

/// Source of toolchain version identifiers.
pub trait ToolchainProvider {
    /// PlatformIO version, if known.
    fn platformio_version(&self) -> Option<String>;

    /// Python version, if known.
    fn python_version(&self) -> Option<String>;

    /// Resolve both identifiers, falling back to the fixed defaults.
    fn resolve(&self) -> ToolchainIds {
        ToolchainIds {
            platformio_version: self
                .platformio_version()
                .unwrap_or_else(|| DEFAULT_PLATFORMIO_VERSION.to_string()),
            python_version: self
                .python_version()
                .unwrap_or_else(|| DEFAULT_PYTHON_VERSION.to_string()),
        }
    }
}

impl ToolchainProvider for ToolchainIds {
    fn platformio_version(&self) -> Option<String> {
        Some(self.platformio_version.clone())
    }

    fn python_version(&self) -> Option<String> {
        Some(self.python_version.clone())
    }
}

/// Reads toolchain identifiers from environment variables.
#[derive(Debug, Clone)]
pub struct EnvToolchain {
    platformio_var: String,
    python_var: String,
}

impl EnvToolchain {
    /// Read from the given variable names.
    pub fn new(platformio_var: impl Into<String>, python_var: impl Into<String>) -> Self {
        Self {
            platformio_var: platformio_var.into(),
            python_var: python_var.into(),
        }
    }
}

impl Default for EnvToolchain {
    fn default() -> Self {
        Self::new("PLATFORMIO_VERSION", "PYTHON_VERSION")
    }
}

impl ToolchainProvider for EnvToolchain {
    fn platformio_version(&self) -> Option<String> {
        non_empty_var(&self.platformio_var)
    }

    fn python_version(&self) -> Option<String> {
        non_empty_var(&self.python_var)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Source of the current source-control revision.
pub trait RevisionProvider {
    /// Short revision hash, or `None` if it cannot be determined.
    fn revision(&self) -> Option<String>;
}

/// A fixed revision (or none), mostly for tests and reproducible builds.
impl RevisionProvider for Option<String> {
    fn revision(&self) -> Option<String> {
        self.clone()
    }
}

/// Asks `git rev-parse --short HEAD` in a working directory.
#[derive(Debug, Clone)]
pub struct GitRevision {
    repo_dir: PathBuf,
}

impl GitRevision {
    /// Look up revisions for the repository containing `repo_dir`.
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }
}

impl RevisionProvider for GitRevision {
    fn revision(&self) -> Option<String> {
        let output = Command::new("git")
            .args(["rev-parse", "--short", "HEAD"])
            .current_dir(&self.repo_dir)
            .output();

        match output {
            Ok(output) if output.status.success() => {
                let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
                (!hash.is_empty()).then_some(hash)
            }
            Ok(output) => {
                debug!(status = ?output.status.code(), "git rev-parse failed");
                None
            }
            Err(e) => {
                debug!(error = %e, "git not available");
                None
            }
        }
    }
}
