//! Tests for compiler configuration.

use super::*;

#[test]
fn test_toml_parsing() {
    let config = CompilerConfig::from_toml_str(r#"root_name = "src""#).unwrap();
    assert_eq!(config.root_name, "src");
}

#[test]
fn test_yaml_parsing() {
    let config = CompilerConfig::from_yaml_str("root_name: item").unwrap();
    assert_eq!(config.root_name, "item");
}

#[test]
fn test_missing_fields_use_defaults() {
    let config = CompilerConfig::from_toml_str("").unwrap();
    assert_eq!(config, CompilerConfig::default());
    assert_eq!(config.root_name, DEFAULT_ROOT_NAME);
}

#[test]
fn test_builder() {
    let config = CompilerConfig::new().with_root_name("p");
    assert_eq!(config.root_name, "p");
    assert!(config.validate().is_ok());
}

#[test]
fn test_invalid_root_name() {
    let err = CompilerConfig::from_toml_str(r#"root_name = "1x""#).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    assert!(CompilerConfig::new().with_root_name("").validate().is_err());
    assert!(CompilerConfig::new().with_root_name("a b").validate().is_err());
}

#[test]
fn test_unknown_field_is_ignored() {
    let config = CompilerConfig::from_toml_str(
        r#"
        root_name = "row"
        other = 1
        "#,
    )
    .unwrap();
    assert_eq!(config.root_name, "row");
}

#[test]
fn test_missing_file() {
    let err = CompilerConfig::load("does/not/exist.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
    assert_eq!(
        CompilerConfig::load("does/not/exist.toml").unwrap_or_default(),
        CompilerConfig::default()
    );
}
