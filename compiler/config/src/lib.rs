#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Triplegate Configuration
//!
//! This crate provides configuration management for Triplegate.
//! A configuration file specifies:
//! - Logging configuration
//! - Where descriptors are read from and generated units are written to
//! - Gateway generation options (registration names, context handling, field masks)
//!
//! Configuration is stored in TOML format. Every field has a default, so a
//! file only needs the settings it changes.

use std::path::{Path, PathBuf};

use registry::Separator;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    /// Failed to parse the TOML configuration file
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// Failed to serialize configuration to TOML format
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// Configuration file was not found at the specified path
    #[error("Config file not found at: {0}")]
    NotFound(PathBuf),
    /// Could not locate the user's configuration directory
    #[error("Could not find user config directory")]
    ConfigDirUnavailable,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Input and output locations
    pub codegen: CodegenConfig,
    /// Shape of the generated gateway code
    pub gateway: GatewayConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (e.g. "info", "codegen=trace")
    pub level: String,
    /// Log file path (optional); stderr when absent
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self { Self { level: "info".to_string(), file: None } }
}

/// Code generation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    /// Path to the JSON descriptor set
    pub descriptors: PathBuf,
    /// Where to write generated units
    pub output_dir: PathBuf,
    /// Files to generate for; empty means the descriptor set's own targets
    pub targets: Vec<String>,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            descriptors: PathBuf::from("descriptors.json"),
            output_dir: Config::default_output_dir(),
            targets: Vec::new(),
        }
    }
}

/// Gateway generation options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Infix of registration function names
    pub register_fn_suffix: String,
    /// Derive each handler's context from the inbound request
    pub use_request_context: bool,
    /// Derive PATCH field masks from the request body
    pub allow_patch_feature: bool,
    /// Import the file's own module instead of assuming inclusion into it
    pub standalone: bool,
    /// Skip the module description comment
    pub omit_package_doc: bool,
    /// Separator for repeated path parameters: csv, pipes, ssv or tsv
    pub repeated_path_param_separator: Separator,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            register_fn_suffix: "handler".to_string(),
            use_request_context: false,
            allow_patch_feature: true,
            standalone: false,
            omit_package_doc: false,
            repeated_path_param_separator: Separator::Csv,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file at `path`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load `path` if given, otherwise the default path if it exists,
    /// otherwise defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if path.exists() => Self::from_file(path),
            Some(path) => Err(ConfigError::NotFound(path.to_path_buf())),
            None => match Self::default_path() {
                Ok(path) if path.exists() => Self::from_file(path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Save this configuration as a pretty-printed TOML file at `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Returns the default config file path:
    /// `{config_dir()}/triplegate/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::ConfigDirUnavailable)?.join("triplegate");
        Ok(config_dir.join("config.toml"))
    }

    /// Get the default output directory for generated code
    pub fn default_output_dir() -> PathBuf {
        Self::default_output_dir_internal(std::env::var("OUT_DIR").ok(), std::env::current_dir().ok())
    }

    /// Internal function for testing - allows injection of environment values
    fn default_output_dir_internal(out_dir: Option<String>, current_dir: Option<PathBuf>) -> PathBuf {
        if let Some(out_dir) = out_dir {
            return PathBuf::from(out_dir);
        }
        if let Some(current_dir) = current_dir {
            return current_dir;
        }
        PathBuf::from(".")
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_from_file() {
        let temp_file = NamedTempFile::new().expect("Failed to create temporary file");
        let toml_content = r#"
            [logging]
            level = "debug"
            file = "gateway.log"

            [codegen]
            descriptors = "api/descriptors.json"
            output_dir = "generated"
            targets = ["helloworld/helloworld.proto"]

            [gateway]
            register_fn_suffix = "gateway"
            use_request_context = true
            repeated_path_param_separator = "pipes"
        "#;
        fs::write(&temp_file, toml_content).expect("Failed to write TOML content to temporary file");

        let loaded = Config::from_file(&temp_file).expect("Failed to load config from temporary file");
        assert_eq!(loaded.logging.level, "debug");
        assert_eq!(loaded.logging.file, Some(PathBuf::from("gateway.log")));
        assert_eq!(loaded.codegen.descriptors, PathBuf::from("api/descriptors.json"));
        assert_eq!(loaded.codegen.output_dir, PathBuf::from("generated"));
        assert_eq!(loaded.codegen.targets, vec!["helloworld/helloworld.proto".to_string()]);
        assert_eq!(loaded.gateway.register_fn_suffix, "gateway");
        assert!(loaded.gateway.use_request_context);
        assert!(loaded.gateway.allow_patch_feature);
        assert_eq!(loaded.gateway.repeated_path_param_separator, Separator::Pipes);

        let result = Config::from_file("nonexistent_file.toml");
        match result.expect_err("Expected error for nonexistent file") {
            ConfigError::FileRead(_) => {}
            other => panic!("Expected FileRead error, got {other:?}"),
        }
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_file = NamedTempFile::new().expect("Failed to create temporary file");
        fs::write(&temp_file, "[gateway]\nstandalone = true\n").expect("Failed to write TOML");

        let loaded = Config::from_file(&temp_file).expect("partial config loads");
        assert!(loaded.gateway.standalone);
        assert_eq!(loaded.gateway.register_fn_suffix, "handler");
        assert_eq!(loaded.logging.level, "info");
    }

    #[test]
    fn test_parse_errors() {
        let temp_file = NamedTempFile::new().expect("Failed to create temporary file");
        fs::write(&temp_file, "invalid toml content").expect("Failed to write invalid TOML content");
        assert!(matches!(Config::from_file(&temp_file), Err(ConfigError::Parse(_))));

        fs::write(&temp_file, "[gateway]\nrepeated_path_param_separator = \"semicolon\"\n").expect("write");
        assert!(matches!(Config::from_file(&temp_file), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_save_round_trips() {
        let mut config = Config::default();
        config.gateway.repeated_path_param_separator = Separator::Tsv;
        config.codegen.output_dir = PathBuf::from("out");
        let temp_file = NamedTempFile::new().expect("Failed to create temporary file for save test");

        config.save(&temp_file).expect("save");
        let contents = fs::read_to_string(&temp_file).expect("Failed to read saved config file");
        assert!(contents.contains("repeated_path_param_separator = \"tsv\""));
        assert_eq!(Config::from_file(&temp_file).expect("reload"), config);

        let temp_dir = tempfile::tempdir().expect("Failed to create temporary directory");
        let non_existent_subdir = temp_dir.path().join("nonexistent").join("config.toml");
        match config.save(&non_existent_subdir).expect_err("Expected write error") {
            ConfigError::FileRead(_) => (),
            other => panic!("Expected FileRead error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temporary directory");
        let missing = temp_dir.path().join("missing.toml");
        assert!(matches!(Config::load(Some(&missing)), Err(ConfigError::NotFound(p)) if p == missing));
    }

    #[test]
    fn test_default_path() {
        let path = Config::default_path().expect("Failed to get default config path");
        let path_str = path.to_str().expect("Path should be valid UTF-8");
        assert!(path_str.contains("triplegate"));
        assert!(path_str.ends_with("config.toml"));
    }

    #[test]
    fn test_default_output_dir_internal() {
        let dir = Config::default_output_dir_internal(Some("/tmp/out_dir".to_string()), Some(PathBuf::from("/tmp/current")));
        assert_eq!(dir, PathBuf::from("/tmp/out_dir"));

        let dir = Config::default_output_dir_internal(None, Some(PathBuf::from("/tmp/current")));
        assert_eq!(dir, PathBuf::from("/tmp/current"));

        let dir = Config::default_output_dir_internal(None, None);
        assert_eq!(dir, PathBuf::from("."));
    }
}
