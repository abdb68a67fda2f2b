//! Unit tests for configuration module
//!
//! Tests configuration parsing, validation and serialization.

use super::*;
use anyhow::Result;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_default_configuration_is_valid() {
    let config = WayfrontConfig::default();
    assert!(config.validate().is_ok());

    assert_eq!(config.protocol.display_version, 2);
    assert_eq!(config.extensions.enabled, vec!["xdg_wm_base", "zwlr_layer_shell_v1"]);
    assert_eq!(config.pointer.axis_scale, 10.0);
    assert!(config.pointer.always_frame_on_enter_leave);
    assert_eq!(config.shell.size_constraint_policy, SizeConstraintPolicy::Clamp);
    assert_eq!((config.shell.output_width, config.shell.output_height), (1920, 1080));
    assert_eq!(config.seat.name, "seat0");
}

#[test]
fn test_configuration_serialization_roundtrip() -> Result<()> {
    let mut original = WayfrontConfig::default();
    original.shell.size_constraint_policy = SizeConstraintPolicy::Reject;
    original.limits.max_objects_per_client = 128;

    let toml_string = toml::to_string(&original)?;
    let deserialized: WayfrontConfig = toml::from_str(&toml_string)?;

    assert_eq!(original, deserialized);
    Ok(())
}

#[test]
fn test_configuration_from_file() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("wayfront.toml");

    let test_config = r#"
[extensions]
enabled = ["xdg_wm_base"]

[pointer]
axis_scale = 2.5

[shell]
size_constraint_policy = "reject"
output_width = 1280
output_height = 720
"#;
    fs::write(&file_path, test_config)?;

    let config = WayfrontConfig::load(&file_path)?;
    assert_eq!(config.extensions.enabled, vec!["xdg_wm_base"]);
    assert_eq!(config.pointer.axis_scale, 2.5);
    // untouched keys in a partial section keep their defaults
    assert!(config.pointer.always_frame_on_enter_leave);
    assert_eq!(config.shell.size_constraint_policy, SizeConstraintPolicy::Reject);
    assert_eq!(config.shell.output_width, 1280);
    // missing sections are defaulted
    assert_eq!(config.protocol.display_version, 2);
    assert_eq!(config.logging.level, "info");

    Ok(())
}

#[test]
fn test_empty_file_gives_defaults() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("empty.toml");
    fs::write(&file_path, "")?;

    let config = WayfrontConfig::load(&file_path)?;
    assert_eq!(config, WayfrontConfig::default());
    Ok(())
}

#[test]
fn test_missing_file_falls_back_to_defaults() -> Result<()> {
    let dir = tempdir()?;
    let config = WayfrontConfig::load_or_default(dir.path().join("absent.toml"))?;
    assert_eq!(config, WayfrontConfig::default());

    assert!(WayfrontConfig::load(dir.path().join("absent.toml")).is_err());
    Ok(())
}

#[test]
fn test_unknown_extension_is_rejected() {
    let mut config = WayfrontConfig::default();
    config.extensions.enabled.push("wl_shell".to_string());
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("wl_shell"));
}

#[test]
fn test_invalid_values_are_rejected() {
    let mut config = WayfrontConfig::default();
    config.pointer.axis_scale = 0.0;
    assert!(config.validate().is_err());

    let mut config = WayfrontConfig::default();
    config.protocol.display_version = 0;
    assert!(config.validate().is_err());

    let mut config = WayfrontConfig::default();
    config.shell.output_height = 0;
    assert!(config.validate().is_err());

    let mut config = WayfrontConfig::default();
    config.limits.max_globals = 3;
    assert!(config.validate().is_err());

    let mut config = WayfrontConfig::default();
    config.seat.name.clear();
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_policy_fails_to_parse() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("bad.toml");
    fs::write(&file_path, "[shell]\nsize_constraint_policy = \"shrink\"\n")?;

    assert!(WayfrontConfig::load(&file_path).is_err());
    Ok(())
}

#[test]
fn test_save_then_load() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("saved.toml");

    let mut config = WayfrontConfig::default();
    config.seat.name = "seat-test".to_string();
    config.save(&file_path)?;

    let loaded = WayfrontConfig::load(&file_path)?;
    assert_eq!(loaded.seat.name, "seat-test");
    Ok(())
}
