#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
//! Command-line surface of the `triplegate` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use config::Config;
use registry::Separator;
use thiserror::Error;

/// Errors that end the process with a failure status.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or saved.
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    /// Logging could not be installed.
    #[error(transparent)]
    Logging(#[from] logging::LoggingError),
    /// The run was aborted.
    #[error(transparent)]
    Pipeline(#[from] pipeline::PipelineError),
    /// Some files failed to generate.
    #[error("{failed} file(s) failed to generate")]
    FilesFailed {
        /// Number of failed files
        failed: usize,
    },
}

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// HTTP/JSON gateway generator for Triple/gRPC services
#[derive(Debug, Parser)]
#[command(name = "triplegate", version)]
#[command(about = "Generate HTTP/JSON gateway handlers for Triple/gRPC services", long_about = None)]
pub struct Cli {
    /// Configuration file; defaults to the user config file when present
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level or filter directive, overriding the config file
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate gateway units from a descriptor set
    Generate(GenerateArgs),
    /// Write a configuration file holding every default
    InitConfig {
        /// Destination; defaults to the user config file
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

/// Flags of `triplegate generate`; each overrides the config file
#[derive(Debug, Default, Args)]
pub struct GenerateArgs {
    /// JSON descriptor set
    #[arg(short, long)]
    pub descriptors: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Files to generate for
    #[arg(long, value_delimiter = ',')]
    pub targets: Vec<String>,

    /// Infix of registration function names
    #[arg(long)]
    pub register_fn_suffix: Option<String>,

    /// Derive each handler's context from the inbound request
    #[arg(long)]
    pub use_request_context: bool,

    /// Do not derive PATCH field masks from request bodies
    #[arg(long)]
    pub no_patch_feature: bool,

    /// Import the file's own module instead of including the unit into it
    #[arg(long)]
    pub standalone: bool,

    /// Skip the module description comment
    #[arg(long)]
    pub omit_package_doc: bool,

    /// Separator for repeated path parameters (csv, pipes, ssv, tsv)
    #[arg(long)]
    pub repeated_path_param_separator: Option<Separator>,
}

impl GenerateArgs {
    /// Layer the flags over `config`
    pub fn apply(&self, config: &mut Config) {
        if let Some(descriptors) = &self.descriptors {
            config.codegen.descriptors = descriptors.clone();
        }
        if let Some(output) = &self.output {
            config.codegen.output_dir = output.clone();
        }
        if !self.targets.is_empty() {
            config.codegen.targets = self.targets.clone();
        }
        if let Some(suffix) = &self.register_fn_suffix {
            config.gateway.register_fn_suffix = suffix.clone();
        }
        if let Some(separator) = self.repeated_path_param_separator {
            config.gateway.repeated_path_param_separator = separator;
        }
        config.gateway.use_request_context |= self.use_request_context;
        config.gateway.allow_patch_feature &= !self.no_patch_feature;
        config.gateway.standalone |= self.standalone;
        config.gateway.omit_package_doc |= self.omit_package_doc;
    }
}

/// Generate per `config`, failing when any file failed
pub fn generate(config: &Config) -> Result<pipeline::RunReport> {
    let report = pipeline::run(config)?;
    for failure in &report.failures {
        tracing::error!(file = %failure.file, error = %failure.error, "generation failed");
    }
    if !report.is_success() {
        return Err(CliError::FilesFailed { failed: report.failures.len() });
    }
    Ok(report)
}

/// Write the default configuration to `path`, or the user config file
pub fn init_config(path: Option<PathBuf>) -> Result<PathBuf> {
    let path = match path {
        Some(path) => path,
        None => Config::default_path()?,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(config::ConfigError::FileRead)?;
    }
    Config::default().save(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_flags() {
        let cli = Cli::try_parse_from([
            "triplegate",
            "generate",
            "--descriptors",
            "api.json",
            "--targets",
            "a.proto,b.proto",
            "--repeated-path-param-separator",
            "ssv",
            "--no-patch-feature",
            "--log-level",
            "debug",
        ])
        .expect("valid arguments");
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        let Commands::Generate(args) = cli.command else { panic!("expected generate") };
        assert_eq!(args.descriptors, Some(PathBuf::from("api.json")));
        assert_eq!(args.targets, vec!["a.proto".to_string(), "b.proto".to_string()]);
        assert_eq!(args.repeated_path_param_separator, Some(Separator::Ssv));
        assert!(args.no_patch_feature);
    }

    #[test]
    fn rejects_unknown_separator() {
        let parsed =
            Cli::try_parse_from(["triplegate", "generate", "--repeated-path-param-separator", "semicolon"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn flags_override_config() {
        let mut config = Config::default();
        config.codegen.targets = vec!["from_file.proto".into()];
        config.gateway.register_fn_suffix = "file".into();
        let args = GenerateArgs {
            output: Some(PathBuf::from("out")),
            register_fn_suffix: Some("flag".into()),
            no_patch_feature: true,
            standalone: true,
            ..GenerateArgs::default()
        };
        args.apply(&mut config);
        assert_eq!(config.codegen.output_dir, PathBuf::from("out"));
        assert_eq!(config.codegen.targets, vec!["from_file.proto".to_string()]);
        assert_eq!(config.gateway.register_fn_suffix, "flag");
        assert!(!config.gateway.allow_patch_feature);
        assert!(config.gateway.standalone);
        assert!(!config.gateway.use_request_context);
    }

    #[test]
    fn init_config_writes_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = init_config(Some(dir.path().join("nested/config.toml"))).expect("written");
        assert_eq!(Config::from_file(&path).expect("reload").gateway, config::GatewayConfig::default());
    }
}
