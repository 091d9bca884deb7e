//! Firmware metadata schema and the merge/provenance steps that keep it current.
//!
//! The metadata record is the JSON document that travels inside a package and
//! is written next to build outputs as `firmware.meta`. Ownership of its sections
//! is split:
//!
//! - `firmware` is overwritten from source declarations ([`FirmwareMetadata::apply_declarations`])
//! - `build_info` and `files` are recomputed per build ([`FirmwareMetadata::attach_build_info`])
//! - `target`, `features`, and any other sections belong to the template author
//!   and pass through untouched

use crate::output::write_atomic;
use crate::provider::ToolchainIds;
use crate::{DeclarationSet, PackageError, PackageResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Timestamp layout used in `build_info.timestamp` (local time, microseconds).
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Firmware metadata document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirmwareMetadata {
    /// Authoritative identity, sourced from the firmware's declarations.
    #[serde(default)]
    pub firmware: FirmwareInfo,

    /// Board/platform/toolchain identifiers supplied by the template.
    #[serde(default)]
    pub target: Map<String, Value>,

    /// Free-text feature list supplied by the template.
    #[serde(default)]
    pub features: Vec<String>,

    /// Build provenance, recomputed on every build.
    #[serde(default)]
    pub build_info: BuildInfo,

    /// Artifact descriptions keyed by file kind (`firmware_bin` or `firmware_hex`).
    #[serde(default)]
    pub files: BTreeMap<String, FileEntry>,

    /// Any other top-level sections of the template.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `firmware` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirmwareInfo {
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub board: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `build_info` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildInfo {
    /// ISO-8601 build time.
    pub timestamp: String,

    /// Short source-control revision; serialized as `null` when unknown.
    pub git_hash: Option<String>,

    pub platformio_version: String,

    pub python_version: String,
}

/// One entry of the `files` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub size_bytes: u64,
    /// `size_bytes / 1024`, rounded to two decimals.
    pub size_kb: f64,
    pub description: String,
}

/// The two kinds of firmware artifact a build can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Raw binary image (ESP32 targets), distributed unframed.
    Bin,
    /// Intel HEX text image (ATtiny targets), distributed inside a package.
    Hex,
}

impl ArtifactKind {
    /// Key used in the metadata `files` section.
    #[must_use]
    pub fn file_key(&self) -> &'static str {
        match self {
            Self::Bin => "firmware_bin",
            Self::Hex => "firmware_hex",
        }
    }

    /// Artifact file name recorded in the metadata.
    #[must_use]
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Bin => "firmware.bin",
            Self::Hex => "firmware.hex",
        }
    }

    /// Fixed description recorded in the metadata.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Bin => "ESP32 firmware binary file",
            Self::Hex => "Intel HEX firmware file for ATtiny1616",
        }
    }
}

impl FirmwareMetadata {
    /// Overwrite the `firmware` identity fields from source declarations.
    ///
    /// Extra keys in the `firmware` section and all other sections are kept.
    pub fn apply_declarations(&mut self, declarations: &DeclarationSet) {
        self.firmware.version = declarations.version.clone();
        self.firmware.description = declarations.board_description.clone();
        self.firmware.board = declarations.board_model.clone();
    }

    /// Replace `build_info` and `files` with freshly computed provenance.
    ///
    /// Given identical inputs the result is identical; only `now` and
    /// `git_hash` are expected to vary between runs.
    pub fn attach_build_info(
        &mut self,
        kind: ArtifactKind,
        artifact_len: u64,
        now: NaiveDateTime,
        git_hash: Option<String>,
        toolchain: &ToolchainIds,
    ) {
        self.build_info = BuildInfo {
            timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
            git_hash,
            platformio_version: toolchain.platformio_version.clone(),
            python_version: toolchain.python_version.clone(),
        };

        self.files = BTreeMap::from([(
            kind.file_key().to_string(),
            FileEntry {
                name: kind.file_name().to_string(),
                size_bytes: artifact_len,
                size_kb: size_kb(artifact_len),
                description: kind.description().to_string(),
            },
        )]);
    }

    /// Serialize to compact JSON (no whitespace between tokens).
    pub fn to_compact_json(&self) -> PackageResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(PackageError::InvalidMetadataJson)
    }

    /// Serialize to two-space indented JSON, as written to `firmware.meta`.
    pub fn to_pretty_json(&self) -> PackageResult<String> {
        serde_json::to_string_pretty(self).map_err(PackageError::InvalidMetadataJson)
    }

    /// Deserialize from JSON text.
    pub fn from_json(json: &str) -> PackageResult<Self> {
        serde_json::from_str(json).map_err(PackageError::InvalidMetadataJson)
    }

    /// An example document describing an ATtiny1616 light controller.
    ///
    /// The board is named only in `target` and there is no revision, as in the
    /// document written by [`FirmwareMetadata::sample_json`].
    #[must_use]
    pub fn sample() -> Self {
        let mut target = Map::new();
        for (key, value) in [
            ("board", "ATtiny1616"),
            ("platform", "atmelmegaavr"),
            ("framework", "arduino"),
            ("upload_protocol", "serialupdi"),
        ] {
            target.insert(key.to_string(), Value::String(value.to_string()));
        }

        let mut metadata = Self {
            firmware: FirmwareInfo {
                version: "1.0.1".to_string(),
                description: "I2C Light Controller for ATtiny1616 with WS2812B LED".to_string(),
                board: String::new(),
                extra: Map::new(),
            },
            target,
            features: [
                "WS2812B LED control",
                "Button input with mode cycling",
                "I2C slave communication",
                "EEPROM address persistence",
                "Firmware update framework",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            ..Self::default()
        };

        metadata.build_info = BuildInfo {
            timestamp: "2025-01-30T12:00:00.000000".to_string(),
            git_hash: None,
            platformio_version: "6.1.0".to_string(),
            python_version: "3.11.0".to_string(),
        };
        metadata.files = BTreeMap::from([(
            ArtifactKind::Hex.file_key().to_string(),
            FileEntry {
                name: ArtifactKind::Hex.file_name().to_string(),
                size_bytes: 16471,
                size_kb: size_kb(16471),
                description: ArtifactKind::Hex.description().to_string(),
            },
        )]);

        metadata
    }

    /// The example document as two-space indented JSON.
    ///
    /// Unlike [`FirmwareMetadata::to_pretty_json`] this leaves out the empty
    /// `firmware.board` and the unknown `build_info.git_hash`.
    pub fn sample_json() -> PackageResult<String> {
        let sample = Self::sample();
        let document = SampleDocument {
            firmware: SampleFirmware {
                version: &sample.firmware.version,
                description: &sample.firmware.description,
            },
            target: &sample.target,
            features: &sample.features,
            build_info: SampleBuildInfo {
                timestamp: &sample.build_info.timestamp,
                platformio_version: &sample.build_info.platformio_version,
                python_version: &sample.build_info.python_version,
            },
            files: &sample.files,
        };
        serde_json::to_string_pretty(&document).map_err(PackageError::InvalidMetadataJson)
    }
}

#[derive(Serialize)]
struct SampleDocument<'a> {
    firmware: SampleFirmware<'a>,
    target: &'a Map<String, Value>,
    features: &'a [String],
    build_info: SampleBuildInfo<'a>,
    files: &'a BTreeMap<String, FileEntry>,
}

#[derive(Serialize)]
struct SampleFirmware<'a> {
    version: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
struct SampleBuildInfo<'a> {
    timestamp: &'a str,
    platformio_version: &'a str,
    python_version: &'a str,
}

/// Kilobytes to two decimal places, ties to even.
#[must_use]
pub fn size_kb(size_bytes: u64) -> f64 {
    let kb = size_bytes as f64 / 1024.0;
    (kb * 100.0).round_ties_even() / 100.0
}

/// The caller-maintained metadata template file (usually `firmware.meta`).
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    /// Create a store backed by the template at `path`.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Path of the template file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check whether the template file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the template.
    pub fn load(&self) -> PackageResult<FirmwareMetadata> {
        if !self.exists() {
            return Err(PackageError::MissingTemplate(self.path.clone()));
        }

        let json = fs::read_to_string(&self.path)?;
        FirmwareMetadata::from_json(&json)
    }

    /// Load the template and overwrite its identity from `declarations`.
    pub fn merge(&self, declarations: &DeclarationSet) -> PackageResult<FirmwareMetadata> {
        let mut metadata = self.load()?;
        metadata.apply_declarations(declarations);
        debug!(path = %self.path.display(), "merged source declarations into template");
        Ok(metadata)
    }

    /// Rewrite only `firmware.version` in the template file.
    ///
    /// The rest of the document is preserved as written. Returns `false` when
    /// there is no template to update.
    pub fn set_version(&self, version: &str) -> PackageResult<bool> {
        match self.render_version(version)? {
            Some(document) => {
                write_atomic(&self.path, document.as_bytes())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Render the template with `firmware.version` replaced, without writing it.
    ///
    /// Returns `None` when there is no template. Fails on the same documents
    /// [`MetadataStore::set_version`] would reject, so callers can validate the
    /// template before touching any other file.
    pub fn render_version(&self, version: &str) -> PackageResult<Option<String>> {
        if !self.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path)?;
        let mut document: Value =
            serde_json::from_str(&json).map_err(PackageError::InvalidMetadataJson)?;

        // Reject documents whose shape the indexing below cannot handle
        FirmwareMetadata::deserialize(&document).map_err(PackageError::InvalidMetadataJson)?;

        document["firmware"]["version"] = Value::String(version.to_string());

        serde_json::to_string_pretty(&document)
            .map(Some)
            .map_err(PackageError::InvalidMetadataJson)
    }
}

#[cfg(test)]
#[path = "metadata/metadata_tests.rs"]
mod metadata_tests;
