//! Firmware packaging for the FLFW container format
//!
//! This crate builds versioned firmware packages and keeps their metadata
//! consistent with the identity declarations in the firmware source.
//!
//! # Package Structure
//!
//! ```text
//! firmware-v1.0.1.bin
//! ├── "FLFW\0"            5-byte magic
//! ├── metadata length     u32, little-endian
//! ├── metadata            compact JSON (firmware, target, features, build_info, files)
//! └── payload             Intel HEX image, verbatim
//! ```
//!
//! # Example
//!
//! ```no_run
//! use fwpack::{codec, declaration, MetadataStore};
//!
//! let source = std::fs::read_to_string("src/main.cpp")?;
//! let declarations = declaration::extract(&source)?;
//! let metadata = MetadataStore::new("firmware.meta").merge(&declarations)?;
//!
//! let hex = std::fs::read(".pio/build/attiny1616/firmware.hex")?;
//! let package = codec::encode(&metadata, &hex)?;
//!
//! let (decoded, payload) = codec::decode(&package)?;
//! assert_eq!(decoded.firmware.version, declarations.version);
//! assert_eq!(payload, hex.as_slice());
//! # Ok::<(), fwpack::PackageError>(())
//! ```

mod error;
mod metadata;
mod version;

pub mod bump;
pub mod codec;
pub mod config;
pub mod declaration;
pub mod orchestrator;
pub mod output;
pub mod provider;

pub use bump::{BumpReport, bump_project};
pub use config::ProjectConfig;
pub use declaration::{Declaration, DeclarationSet};
pub use error::PackageError;
pub use metadata::{
    ArtifactKind, BuildInfo, FileEntry, FirmwareInfo, FirmwareMetadata, MetadataStore, size_kb,
};
pub use orchestrator::{BuildLayout, BuildOrchestrator, BuildOutcome, BuildReport};
pub use provider::{RevisionProvider, ToolchainIds, ToolchainProvider};
pub use version::{BumpKind, SemanticVersion};

/// Result type for package operations.
pub type PackageResult<T> = Result<T, PackageError>;

/// Default metadata template file name.
pub const METADATA_FILE: &str = "firmware.meta";

/// Default sample metadata file name.
pub const SAMPLE_METADATA_FILE: &str = "sample_metadata.json";
