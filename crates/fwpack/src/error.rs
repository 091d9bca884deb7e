//! Error types for package and metadata operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building, encoding, or decoding firmware packages.
#[derive(Debug, Error)]
pub enum PackageError {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required input file does not exist.
    #[error("Missing required file: {}", .0.display())]
    MissingFile(PathBuf),

    /// A required `#define` is absent from the firmware source.
    #[error("Missing declaration: {0} not found in source")]
    MissingDeclaration(String),

    /// No metadata template is available to merge into.
    #[error("Missing metadata template: {}", .0.display())]
    MissingTemplate(PathBuf),

    /// Version text is not in `X.Y.Z` integer form.
    #[error("Malformed version '{value}': {reason}")]
    MalformedVersion { value: String, reason: String },

    /// Unrecognized bump selector.
    #[error("Invalid bump kind '{0}': expected major, minor, or patch")]
    InvalidBumpKind(String),

    /// The buffer does not start with the package magic.
    #[error("Corrupt package header: expected magic {expected:02X?}, found {found:02X?}")]
    CorruptHeader { expected: [u8; 5], found: [u8; 5] },

    /// The buffer is too short to hold the fixed header.
    #[error("Truncated package header: need {expected} bytes, got {actual}")]
    TruncatedHeader { expected: usize, actual: usize },

    /// The buffer is shorter than the declared metadata block.
    #[error("Truncated metadata: header declares {declared} bytes, only {available} available")]
    TruncatedMetadata { declared: usize, available: usize },

    /// The metadata block is not valid JSON for the metadata schema.
    #[error("Invalid metadata JSON: {0}")]
    InvalidMetadataJson(#[source] serde_json::Error),

    /// The serialized metadata does not fit in a 32-bit length field.
    #[error("Metadata too large: {0} bytes exceeds the 32-bit length field")]
    MetadataTooLarge(usize),

    /// Project configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}
