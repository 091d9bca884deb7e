//! Project layout configuration (`fwpack.toml`).
//!
//! Every field has a default matching a stock PlatformIO project, so the file
//! is optional:
//!
//! ```toml
//! source = "src/main.cpp"
//! metadata = "firmware.meta"
//! build_dir = ".pio/build/esp32-c3"
//!
//! [toolchain]
//! platformio_version_env = "PLATFORMIO_VERSION"
//! ```

use crate::{METADATA_FILE, PackageError, PackageResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file name looked up in the project directory.
pub const CONFIG_FILE: &str = "fwpack.toml";

/// Project layout and environment settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Firmware source holding the identity declarations.
    #[serde(default = "default_source")]
    pub source: PathBuf,

    /// Metadata template, relative to the project directory.
    #[serde(default = "default_metadata")]
    pub metadata: PathBuf,

    /// Build output directory, relative to the project directory.
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,

    /// Binary artifact name inside the build directory.
    #[serde(default = "default_bin_artifact")]
    pub bin_artifact: String,

    /// Intel HEX artifact name inside the build directory.
    #[serde(default = "default_hex_artifact")]
    pub hex_artifact: String,

    /// Where toolchain identifiers come from.
    #[serde(default)]
    pub toolchain: ToolchainConfig,
}

/// Environment variables consulted for toolchain identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolchainConfig {
    #[serde(default = "default_platformio_env")]
    pub platformio_version_env: String,

    #[serde(default = "default_python_env")]
    pub python_version_env: String,
}

fn default_source() -> PathBuf {
    PathBuf::from("src/main.cpp")
}

fn default_metadata() -> PathBuf {
    PathBuf::from(METADATA_FILE)
}

fn default_build_dir() -> PathBuf {
    build_dir_for_env("default")
}

fn default_bin_artifact() -> String {
    "firmware.bin".to_string()
}

fn default_hex_artifact() -> String {
    "firmware.hex".to_string()
}

fn default_platformio_env() -> String {
    "PLATFORMIO_VERSION".to_string()
}

fn default_python_env() -> String {
    "PYTHON_VERSION".to_string()
}

/// PlatformIO's build directory for an environment (`.pio/build/<env>`).
#[must_use]
pub fn build_dir_for_env(env: &str) -> PathBuf {
    Path::new(".pio").join("build").join(env)
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            platformio_version_env: default_platformio_env(),
            python_version_env: default_python_env(),
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            metadata: default_metadata(),
            build_dir: default_build_dir(),
            bin_artifact: default_bin_artifact(),
            hex_artifact: default_hex_artifact(),
            toolchain: ToolchainConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Load `fwpack.toml` from `project_dir`, or the defaults if it is absent.
    pub fn load(project_dir: &Path) -> PackageResult<Self> {
        let path = project_dir.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| PackageError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> PackageResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| PackageError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that would make the artifact kind ambiguous.
    pub fn validate(&self) -> PackageResult<()> {
        if self.bin_artifact.is_empty() || self.hex_artifact.is_empty() {
            return Err(PackageError::Config(
                "artifact names cannot be empty".to_string(),
            ));
        }

        if self.bin_artifact == self.hex_artifact {
            return Err(PackageError::Config(format!(
                "bin_artifact and hex_artifact are both '{}'",
                self.bin_artifact
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use tempfile::TempDir;

    #[test]
    fn ProjectConfig___from_toml___empty_uses_defaults() {
        let config = ProjectConfig::from_toml("").unwrap();

        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.source, PathBuf::from("src/main.cpp"));
        assert_eq!(config.build_dir, PathBuf::from(".pio/build/default"));
    }

    #[test]
    fn ProjectConfig___from_toml___overrides_fields() {
        let toml = r#"
source = "firmware/app.cpp"
build_dir = ".pio/build/attiny1616"

[toolchain]
python_version_env = "PY_VER"
"#;

        let config = ProjectConfig::from_toml(toml).unwrap();

        assert_eq!(config.source, PathBuf::from("firmware/app.cpp"));
        assert_eq!(config.build_dir, PathBuf::from(".pio/build/attiny1616"));
        assert_eq!(config.metadata, PathBuf::from("firmware.meta"));
        assert_eq!(config.toolchain.python_version_env, "PY_VER");
        assert_eq!(config.toolchain.platformio_version_env, "PLATFORMIO_VERSION");
    }

    #[test]
    fn ProjectConfig___from_toml___rejects_unknown_field() {
        let result = ProjectConfig::from_toml("sources = \"src/main.cpp\"");

        assert!(matches!(result, Err(PackageError::Config(_))));
    }

    #[test]
    fn ProjectConfig___validate___rejects_identical_artifact_names() {
        let toml = r#"
bin_artifact = "firmware.out"
hex_artifact = "firmware.out"
"#;

        let err = ProjectConfig::from_toml(toml).unwrap_err();

        assert!(err.to_string().contains("firmware.out"));
    }

    #[test]
    fn ProjectConfig___load___missing_file_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();

        let config = ProjectConfig::load(temp_dir.path()).unwrap();

        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn ProjectConfig___load___invalid_file_names_path() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE), "source = [").unwrap();

        let err = ProjectConfig::load(temp_dir.path()).unwrap_err();

        assert!(err.to_string().contains(CONFIG_FILE));
    }

    #[test]
    fn build_dir_for_env___nests_under_pio_build() {
        assert_eq!(
            build_dir_for_env("esp32-c3"),
            PathBuf::from(".pio/build/esp32-c3")
        );
    }
}
