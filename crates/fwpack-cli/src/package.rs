//! Package commands: create, sample, inspect, and extract.

use anyhow::{Context, Result};
use fwpack::codec::{self, HEADER_LEN, MAGIC};
use fwpack::output::write_atomic;
use fwpack::{ArtifactKind, FirmwareMetadata, METADATA_FILE, PackageError};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Create a package from a metadata file and an artifact.
pub fn create(metadata_path: &Path, artifact_path: &Path, output_path: &Path) -> Result<()> {
    for path in [metadata_path, artifact_path] {
        if !path.is_file() {
            return Err(PackageError::MissingFile(path.to_path_buf()).into());
        }
    }

    let json = fs::read_to_string(metadata_path)
        .with_context(|| format!("Failed to read metadata: {}", metadata_path.display()))?;
    let metadata = FirmwareMetadata::from_json(&json)
        .with_context(|| format!("Invalid metadata file: {}", metadata_path.display()))?;
    let payload = fs::read(artifact_path)
        .with_context(|| format!("Failed to read artifact: {}", artifact_path.display()))?;

    let package = codec::encode(&metadata, &payload)?;
    let header = codec::inspect(&package)?;
    for warning in header.device_warnings() {
        warn!(%warning, "package may be rejected by the device updater");
    }

    write_atomic(output_path, &package)
        .with_context(|| format!("Failed to write package: {}", output_path.display()))?;

    println!("Created firmware package: {}", output_path.display());
    println!("  Magic header: {}", String::from_utf8_lossy(&MAGIC[..4]));
    println!("  Metadata length: {} bytes", header.metadata_len);
    println!("  Firmware size: {} bytes", header.payload_len);
    println!("  Total package size: {} bytes", header.total_len());
    Ok(())
}

/// Write the example metadata document.
pub fn sample(output_path: &Path) -> Result<()> {
    let json = FirmwareMetadata::sample_json()?;
    write_atomic(output_path, json.as_bytes())
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    println!("Created sample metadata file: {}", output_path.display());
    Ok(())
}

/// Print the header, identity, and device warnings of a package.
pub fn inspect(package_path: &Path) -> Result<()> {
    let buffer = read_package(package_path)?;
    let header = codec::inspect(&buffer)
        .with_context(|| format!("Not a valid package: {}", package_path.display()))?;
    let (metadata, _) = codec::decode(&buffer)
        .with_context(|| format!("Not a valid package: {}", package_path.display()))?;

    println!("Package: {}", package_path.display());
    let board = if metadata.firmware.board.is_empty() {
        metadata
            .target
            .get("board")
            .and_then(|board| board.as_str())
            .unwrap_or("unknown board")
    } else {
        metadata.firmware.board.as_str()
    };
    println!("Firmware: {board} v{}", metadata.firmware.version);
    if !metadata.firmware.description.is_empty() {
        println!("Description: {}", metadata.firmware.description);
    }

    println!("\nLayout:");
    println!("  Header: {HEADER_LEN} bytes");
    println!("  Metadata: {} bytes", header.metadata_len);
    println!("  Payload: {} bytes", header.payload_len);
    println!("  Total: {} bytes", header.total_len());

    let build = &metadata.build_info;
    if !build.timestamp.is_empty() {
        println!("\nBuild:");
        println!("  Timestamp: {}", build.timestamp);
        println!("  Git: {}", build.git_hash.as_deref().unwrap_or("unknown"));
        println!("  PlatformIO: {}", build.platformio_version);
        println!("  Python: {}", build.python_version);
    }

    if !metadata.files.is_empty() {
        println!("\nFiles:");
        for (key, entry) in &metadata.files {
            println!(
                "  {key}: {} ({} bytes, {} KB)",
                entry.name, entry.size_bytes, entry.size_kb
            );
        }
    }

    let warnings = header.device_warnings();
    if !warnings.is_empty() {
        println!("\nDevice warnings:");
        for warning in &warnings {
            println!("  ! {warning}");
        }
    }

    Ok(())
}

/// Unpack a package into `firmware.meta` and `firmware.hex`, as the device updater does.
pub fn extract(package_path: &Path, output_dir: &Path) -> Result<()> {
    let buffer = read_package(package_path)?;
    let (metadata, payload) = codec::decode(&buffer)
        .with_context(|| format!("Not a valid package: {}", package_path.display()))?;
    let header = codec::inspect(&buffer)?;
    for warning in header.device_warnings() {
        warn!(%warning, "device updater would reject this package");
    }

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let metadata_path = output_dir.join(METADATA_FILE);
    write_atomic(&metadata_path, &buffer[header.metadata_range()])
        .with_context(|| format!("Failed to write {}", metadata_path.display()))?;

    let firmware_path = output_dir.join(ArtifactKind::Hex.file_name());
    write_atomic(&firmware_path, payload)
        .with_context(|| format!("Failed to write {}", firmware_path.display()))?;

    debug!(version = %metadata.firmware.version, "extracted package");
    println!("Extracted: {}", metadata_path.display());
    println!("Extracted: {}", firmware_path.display());
    Ok(())
}

fn read_package(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(PackageError::MissingFile(path.to_path_buf()).into());
    }
    fs::read(path).with_context(|| format!("Failed to read package: {}", path.display()))
}
