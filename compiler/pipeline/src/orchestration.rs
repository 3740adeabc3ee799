//! Pipeline orchestration for the main entry points.
//!
//! Generation happens fully in memory before anything is written, so a fatal
//! error leaves the output directory untouched.

use std::fs;
use std::path::Path;

use codegen::{write_generated, CodeGenerator, GatewayGenerator, GeneratedFile, GeneratorOptions};
use config::{Config, GatewayConfig};
use ir::{DescriptorSet, File};
use registry::{Namespace, Registry, Separator};

use crate::report::{FileFailure, RunReport};
use crate::{PipelineError, Result};

/// Generation settings for one run
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    generator: GatewayGenerator,
    separator: Separator,
    targets: Vec<String>,
}

impl Pipeline {
    /// Pipeline with explicit generator options
    pub fn new(options: GeneratorOptions, separator: Separator) -> Self {
        Self { generator: GatewayGenerator::new(options), separator, targets: Vec::new() }
    }

    /// Pipeline configured from the `[gateway]` and `[codegen]` sections
    pub fn from_config(config: &Config) -> Self {
        Self::new(generator_options(&config.gateway), config.gateway.repeated_path_param_separator)
            .with_targets(config.codegen.targets.clone())
    }

    /// Restrict the run to the named files, overriding the descriptor set's targets
    pub fn with_targets(mut self, targets: Vec<String>) -> Self {
        self.targets = targets;
        self
    }

    /// Generator in use
    pub fn generator(&self) -> &GatewayGenerator { &self.generator }

    fn select<'a>(&self, set: &'a DescriptorSet) -> Result<Vec<&'a File>> {
        if self.targets.is_empty() {
            return Ok(set.targets().collect());
        }
        self.targets
            .iter()
            .map(|name| set.get_file(name).ok_or_else(|| PipelineError::UnknownTarget(name.clone())))
            .collect()
    }

    /// Generate units for every target of `set`.
    ///
    /// A file that fails on its own is recorded in the report and the run
    /// continues; a fatal error aborts it.
    pub fn generate(&self, set: &DescriptorSet) -> Result<(Vec<GeneratedFile>, RunReport)> {
        let registry = Registry::load(set)?.with_separator(self.separator);
        let mut namespace = Namespace::with_core()?;
        let mut units = Vec::new();
        let mut report = RunReport::default();

        for file in self.select(set)? {
            match self.generator.generate(file, &registry, &mut namespace) {
                Ok(Some(unit)) => units.push(unit),
                Ok(None) => report.skipped.push(file.name.clone()),
                Err(err) if err.is_fatal() => {
                    tracing::error!(file = %file.name, error = %err, "aborting run");
                    return Err(err.into());
                }
                Err(err) => {
                    tracing::warn!(file = %file.name, error = %err, "file failed");
                    report.failures.push(FileFailure { file: file.name.clone(), error: err });
                }
            }
        }
        Ok((units, report))
    }
}

/// Map the `[gateway]` section onto generator options
pub fn generator_options(gateway: &GatewayConfig) -> GeneratorOptions {
    GeneratorOptions {
        register_fn_suffix: gateway.register_fn_suffix.clone(),
        use_request_context: gateway.use_request_context,
        allow_patch_feature: gateway.allow_patch_feature,
        standalone: gateway.standalone,
        omit_package_doc: gateway.omit_package_doc,
    }
}

/// Generate for `set` and write the units under `out_dir`
pub fn generate_all(pipeline: &Pipeline, set: &DescriptorSet, out_dir: &Path) -> Result<RunReport> {
    let (units, mut report) = pipeline.generate(set)?;
    prepare_output_dir(out_dir)?;
    report.written = write_generated(out_dir, &units)?;
    tracing::info!(out_dir = %out_dir.display(), %report, "generation finished");
    Ok(report)
}

/// Run the pipeline described by `config`: load its descriptor set and
/// write units to its output directory
pub fn run(config: &Config) -> Result<RunReport> {
    tracing::info!(descriptors = %config.codegen.descriptors.display(), "loading descriptors");
    let set = DescriptorSet::from_file(&config.codegen.descriptors)?;
    generate_all(&Pipeline::from_config(config), &set, &config.codegen.output_dir)
}

/// Ensure `dir` exists and is a directory
pub fn prepare_output_dir(dir: &Path) -> Result<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(PipelineError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} exists and is not a directory", dir.display()),
        )));
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_gateway_section() {
        let gateway = GatewayConfig {
            register_fn_suffix: "gw".into(),
            standalone: true,
            allow_patch_feature: false,
            ..GatewayConfig::default()
        };
        let options = generator_options(&gateway);
        assert_eq!(options.register_fn_suffix, "gw");
        assert!(options.standalone);
        assert!(!options.allow_patch_feature);
        assert!(!options.use_request_context);
    }

    #[test]
    fn prepare_rejects_a_file() {
        let file = tempfile::NamedTempFile::new().expect("tempfile");
        assert!(matches!(prepare_output_dir(file.path()), Err(PipelineError::Io(_))));
    }

    #[test]
    fn unknown_target_is_reported() {
        let pipeline = Pipeline::default().with_targets(vec!["missing.proto".into()]);
        match pipeline.generate(&DescriptorSet::default()) {
            Err(PipelineError::UnknownTarget(name)) => assert_eq!(name, "missing.proto"),
            other => panic!("expected unknown target, got {other:?}"),
        }
    }
}
