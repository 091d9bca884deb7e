#![allow(non_snake_case)]

use super::*;
use chrono::NaiveDate;
use serde_json::json;
use tempfile::TempDir;

const TEMPLATE: &str = r#"{
  "firmware": {
    "version": "0.9.0",
    "description": "stale",
    "board": "stale",
    "channel": "beta"
  },
  "target": {
    "board": "ATtiny1616",
    "platform": "atmelmegaavr"
  },
  "features": ["WS2812B LED control", "I2C slave communication"],
  "build_info": {},
  "files": {},
  "release_notes": ["first"]
}"#;

fn declarations() -> DeclarationSet {
    DeclarationSet {
        version: "1.0.1".to_string(),
        board_model: "ATtiny1616".to_string(),
        board_description: "I2C Light Controller".to_string(),
    }
}

fn build_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 30)
        .unwrap()
        .and_hms_micro_opt(12, 0, 0, 123_456)
        .unwrap()
}

// apply_declarations

#[test]
fn FirmwareMetadata___apply_declarations___overwrites_identity() {
    let mut metadata = FirmwareMetadata::from_json(TEMPLATE).unwrap();

    metadata.apply_declarations(&declarations());

    assert_eq!(metadata.firmware.version, "1.0.1");
    assert_eq!(metadata.firmware.board, "ATtiny1616");
    assert_eq!(metadata.firmware.description, "I2C Light Controller");
}

#[test]
fn FirmwareMetadata___apply_declarations___passes_other_sections_through() {
    let original = FirmwareMetadata::from_json(TEMPLATE).unwrap();
    let mut metadata = original.clone();

    metadata.apply_declarations(&declarations());

    assert_eq!(metadata.target, original.target);
    assert_eq!(metadata.features, original.features);
    assert_eq!(metadata.firmware.extra.get("channel"), Some(&json!("beta")));
    assert_eq!(metadata.extra.get("release_notes"), Some(&json!(["first"])));
}

// attach_build_info

#[test]
fn FirmwareMetadata___attach_build_info___records_hex_artifact() {
    let mut metadata = FirmwareMetadata::default();

    metadata.attach_build_info(
        ArtifactKind::Hex,
        16471,
        build_time(),
        Some("a1b2c3d".to_string()),
        &ToolchainIds::default(),
    );

    let entry = &metadata.files["firmware_hex"];
    assert_eq!(metadata.files.len(), 1);
    assert_eq!(entry.name, "firmware.hex");
    assert_eq!(entry.size_bytes, 16471);
    assert_eq!(entry.size_kb, 16.08);
    assert_eq!(entry.description, "Intel HEX firmware file for ATtiny1616");
}

#[test]
fn FirmwareMetadata___attach_build_info___replaces_previous_files() {
    let mut metadata = FirmwareMetadata::sample();

    metadata.attach_build_info(
        ArtifactKind::Bin,
        2048,
        build_time(),
        None,
        &ToolchainIds::default(),
    );

    assert_eq!(metadata.files.keys().collect::<Vec<_>>(), ["firmware_bin"]);
    assert_eq!(metadata.files["firmware_bin"].size_kb, 2.0);
    assert_eq!(
        metadata.files["firmware_bin"].description,
        "ESP32 firmware binary file"
    );
}

#[test]
fn FirmwareMetadata___attach_build_info___records_provenance() {
    let mut metadata = FirmwareMetadata::default();
    let toolchain = ToolchainIds {
        platformio_version: "6.1.16".to_string(),
        python_version: "3.12.1".to_string(),
    };

    metadata.attach_build_info(
        ArtifactKind::Hex,
        10,
        build_time(),
        Some("a1b2c3d".to_string()),
        &toolchain,
    );

    assert_eq!(
        metadata.build_info,
        BuildInfo {
            timestamp: "2025-01-30T12:00:00.123456".to_string(),
            git_hash: Some("a1b2c3d".to_string()),
            platformio_version: "6.1.16".to_string(),
            python_version: "3.12.1".to_string(),
        }
    );
}

#[test]
fn FirmwareMetadata___attach_build_info___serializes_missing_hash_as_null() {
    let mut metadata = FirmwareMetadata::default();

    metadata.attach_build_info(
        ArtifactKind::Hex,
        10,
        build_time(),
        None,
        &ToolchainIds::default(),
    );

    let value = serde_json::to_value(&metadata).unwrap();
    assert_eq!(value["build_info"]["git_hash"], serde_json::Value::Null);
    assert!(value["build_info"].as_object().unwrap().contains_key("git_hash"));
}

#[test]
fn FirmwareMetadata___attach_build_info___is_repeatable() {
    let mut first = FirmwareMetadata::from_json(TEMPLATE).unwrap();
    let mut second = first.clone();

    for metadata in [&mut first, &mut second] {
        metadata.attach_build_info(
            ArtifactKind::Hex,
            16471,
            build_time(),
            None,
            &ToolchainIds::default(),
        );
    }

    assert_eq!(first, second);
}

// size_kb

#[test]
fn size_kb___rounds_to_two_decimals() {
    assert_eq!(size_kb(16471), 16.08);
    assert_eq!(size_kb(10), 0.01);
    assert_eq!(size_kb(1024), 1.0);
    assert_eq!(size_kb(0), 0.0);
}

#[test]
fn size_kb___exact_tie___rounds_to_even() {
    // 128 bytes is exactly 0.125 KB
    assert_eq!(size_kb(128), 0.12);
    // 384 bytes is exactly 0.375 KB
    assert_eq!(size_kb(384), 0.38);
}

// JSON forms

#[test]
fn FirmwareMetadata___from_json___accepts_minimal_template() {
    let json = r#"{"firmware":{"version":"","description":"","board":""},"target":{},"features":[],"build_info":{},"files":{}}"#;

    let metadata = FirmwareMetadata::from_json(json).unwrap();

    assert_eq!(metadata, FirmwareMetadata::default());
}

#[test]
fn FirmwareMetadata___from_json___rejects_non_object() {
    let result = FirmwareMetadata::from_json("\"firmware\"");

    assert!(matches!(result, Err(PackageError::InvalidMetadataJson(_))));
}

#[test]
fn FirmwareMetadata___to_pretty_json___uses_two_space_indent() {
    let pretty = FirmwareMetadata::sample().to_pretty_json().unwrap();

    assert!(pretty.starts_with("{\n  \"firmware\": {\n    \"version\": \"1.0.1\""));
}

#[test]
fn FirmwareMetadata___sample___describes_attiny_hex_build() {
    let sample = FirmwareMetadata::sample();

    assert_eq!(sample.firmware.version, "1.0.1");
    assert_eq!(sample.target["platform"], json!("atmelmegaavr"));
    assert_eq!(sample.features.len(), 5);
    assert_eq!(sample.files["firmware_hex"].size_kb, 16.08);
}

#[test]
fn FirmwareMetadata___sample_json___omits_board_and_revision() {
    let json = FirmwareMetadata::sample_json().unwrap();

    let document: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(
        document["firmware"],
        json!({
            "version": "1.0.1",
            "description": "I2C Light Controller for ATtiny1616 with WS2812B LED"
        })
    );
    assert_eq!(
        document["build_info"],
        json!({
            "timestamp": "2025-01-30T12:00:00.000000",
            "platformio_version": "6.1.0",
            "python_version": "3.11.0"
        })
    );
    assert_eq!(document["files"]["firmware_hex"]["size_kb"], json!(16.08));
    assert!(json.starts_with("{\n  \"firmware\": {\n    \"version\": \"1.0.1\""));
}

#[test]
fn FirmwareMetadata___sample_json___reads_back_as_sample() {
    let json = FirmwareMetadata::sample_json().unwrap();

    assert_eq!(
        FirmwareMetadata::from_json(&json).unwrap(),
        FirmwareMetadata::sample()
    );
}

// MetadataStore

#[test]
fn MetadataStore___load___missing_file___returns_missing_template() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("firmware.meta");

    let result = MetadataStore::new(&path).load();

    assert!(matches!(result, Err(PackageError::MissingTemplate(ref p)) if *p == path));
}

#[test]
fn MetadataStore___load___invalid_json___returns_invalid_metadata_json() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("firmware.meta");
    fs::write(&path, "{ not json").unwrap();

    let result = MetadataStore::new(&path).load();

    assert!(matches!(result, Err(PackageError::InvalidMetadataJson(_))));
}

#[test]
fn MetadataStore___merge___applies_declarations_to_template() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("firmware.meta");
    fs::write(&path, TEMPLATE).unwrap();

    let metadata = MetadataStore::new(&path).merge(&declarations()).unwrap();

    assert_eq!(metadata.firmware.version, "1.0.1");
    assert_eq!(metadata.target["board"], json!("ATtiny1616"));
}

#[test]
fn MetadataStore___merge___missing_template___fails() {
    let temp_dir = TempDir::new().unwrap();

    let result = MetadataStore::new(temp_dir.path().join("absent.meta")).merge(&declarations());

    assert!(matches!(result, Err(PackageError::MissingTemplate(_))));
}

#[test]
fn MetadataStore___set_version___updates_only_version() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("firmware.meta");
    fs::write(&path, TEMPLATE).unwrap();

    let updated = MetadataStore::new(&path).set_version("1.1.0").unwrap();

    assert!(updated);
    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let mut expected: serde_json::Value = serde_json::from_str(TEMPLATE).unwrap();
    expected["firmware"]["version"] = json!("1.1.0");
    assert_eq!(written, expected);
}

#[test]
fn MetadataStore___set_version___template_without_firmware___adds_section() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("firmware.meta");
    fs::write(&path, r#"{"features":[]}"#).unwrap();

    MetadataStore::new(&path).set_version("2.0.0").unwrap();

    let metadata = MetadataStore::new(&path).load().unwrap();
    assert_eq!(metadata.firmware.version, "2.0.0");
}

#[test]
fn MetadataStore___set_version___absent_file___returns_false() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("firmware.meta");

    let updated = MetadataStore::new(&path).set_version("1.0.0").unwrap();

    assert!(!updated);
    assert!(!path.exists());
}

#[test]
fn MetadataStore___set_version___non_object_firmware___leaves_file_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("firmware.meta");
    fs::write(&path, r#"{"firmware":"1.0.0"}"#).unwrap();

    let result = MetadataStore::new(&path).set_version("1.0.1");

    assert!(matches!(result, Err(PackageError::InvalidMetadataJson(_))));
    assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"firmware":"1.0.0"}"#);
}

#[test]
fn MetadataStore___render_version___does_not_write() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("firmware.meta");
    fs::write(&path, TEMPLATE).unwrap();

    let rendered = MetadataStore::new(&path).render_version("3.0.0").unwrap().unwrap();

    let document: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(document["firmware"]["version"], json!("3.0.0"));
    assert_eq!(document["firmware"]["channel"], json!("beta"));
    assert_eq!(fs::read_to_string(&path).unwrap(), TEMPLATE);
}

#[test]
fn MetadataStore___render_version___absent_file___returns_none() {
    let temp_dir = TempDir::new().unwrap();

    let rendered = MetadataStore::new(temp_dir.path().join("firmware.meta"))
        .render_version("1.0.0")
        .unwrap();

    assert_eq!(rendered, None);
}
