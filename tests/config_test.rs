//! Integration tests for Settings config loading with layered merge semantics.
//!
//! Merge Semantics:
//! - Defaults → Global: REPLACE (global defines the real baseline)
//! - Global → Project: UNION with negation support
//! - Any → Env vars: REPLACE (explicit user override)
//!
//! Note: These tests run without a global config (temp directories only),
//! so they effectively test project config merging with defaults.

use std::fs;

use tempfile::TempDir;

use routekit::config::{project_config_path, RawSettings, Settings};
use routekit::domain::DocumentShape;

#[test]
fn given_project_config_with_schemes_when_load_then_unions_with_current() {
    // Arrange
    let project = TempDir::new().unwrap();
    fs::write(
        project_config_path(project.path()),
        r#"internal_schemes = ["kafka"]"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load(Some(project.path())).expect("load settings");

    // Assert: defaults ["direct", "seda", "vertx"] plus "kafka", sorted
    assert_eq!(
        settings.internal_schemes,
        vec!["direct", "kafka", "seda", "vertx"]
    );
}

#[test]
fn given_project_config_with_negation_when_load_then_removes_negated_item() {
    let project = TempDir::new().unwrap();
    fs::write(
        project_config_path(project.path()),
        r#"file_extensions = ["!yml"]"#,
    )
    .unwrap();

    let settings = Settings::load(Some(project.path())).expect("load settings");

    assert_eq!(settings.file_extensions, vec!["yaml"]);
}

#[test]
fn given_project_config_with_codec_when_load_then_overrides_scalars() {
    // Arrange
    let project = TempDir::new().unwrap();
    fs::write(
        project_config_path(project.path()),
        r#"
[codec]
default_shape = "crd"
api_version = "camel.apache.org/v1alpha1"
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load(Some(project.path())).expect("load settings");

    // Assert
    assert_eq!(settings.codec.default_shape, DocumentShape::Crd);
    assert_eq!(settings.codec.api_version, "camel.apache.org/v1alpha1");
    assert_eq!(settings.internal_schemes, Settings::default().internal_schemes);
}

#[test]
fn given_project_without_config_when_load_then_defaults() {
    let project = TempDir::new().unwrap();

    let settings = Settings::load(Some(project.path())).expect("load settings");

    assert_eq!(settings.file_extensions, Settings::default().file_extensions);
    assert_eq!(settings.codec, Settings::default().codec);
}

#[test]
fn given_broken_project_config_when_load_then_config_error() {
    let project = TempDir::new().unwrap();
    fs::write(project_config_path(project.path()), "internal_schemes = [").unwrap();

    let err = Settings::load(Some(project.path())).unwrap_err();

    assert!(err.to_string().contains(".routekit.toml"), "{err}");
}

#[test]
fn given_template_when_parsed_then_valid_toml_for_raw_settings() {
    let parsed: Result<RawSettings, _> = toml::from_str(&Settings::template());

    assert!(parsed.is_ok(), "{:?}", parsed.err());
}

#[test]
fn given_effective_settings_when_rendered_then_round_trip_through_toml() {
    let settings = Settings::default();

    let text = settings.to_toml().unwrap();
    let back: Settings = toml::from_str(&text).unwrap();

    assert_eq!(back, settings);
}
