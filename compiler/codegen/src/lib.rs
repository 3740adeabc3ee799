#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Gateway code generation.
//!
//! This crate turns resolved services into Rust source units that route
//! HTTP/JSON requests to Triple/gRPC methods. Each unit holds the request
//! handlers for every binding of a proto file, followed by the registration
//! functions that wire them into a routing mux.
//!
//! Descriptor loading and binding analysis live in companion crates; this one
//! only produces and writes text.

pub mod assembler;
pub mod format;
mod handler;
mod header;
mod mask;
mod registrar;
pub mod scope;
pub mod utils;

use std::fs;
use std::path::{Path, PathBuf};

use ir::File;
use registry::{DescriptorLookup, Namespace, NamespaceError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use assembler::{generate_file, GeneratedFile};

/// Suffix appended to every output unit
pub const OUTPUT_SUFFIX: &str = ".pb.gw.rs";

/// Error type for code generation operations in this crate.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// Underlying I/O error while writing files.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Formatting error when building generated source.
    #[error(transparent)]
    Fmt(#[from] std::fmt::Error),
    /// Binding analysis rejected the file.
    #[error(transparent)]
    Analysis(#[from] analysis::AnalysisError),
    /// A type named by the file is missing from the descriptor set.
    #[error(transparent)]
    Registry(#[from] registry::RegistryError),
    /// No module alias could be allocated.
    #[error(transparent)]
    Namespace(#[from] NamespaceError),
    /// Generated text is not valid Rust.
    #[error("generated source for {file} does not parse: {message}")]
    Format {
        /// Input file the unit was generated for
        file: String,
        /// Parser diagnostic
        message: String,
        /// The offending text
        source_text: String,
    },
}

impl CodegenError {
    /// Whether the error aborts the whole run rather than one file
    pub fn is_fatal(&self) -> bool { matches!(self, CodegenError::Format { .. } | CodegenError::Io(_)) }
}

/// Convenient result type for codegen functions in this crate.
pub type Result<T> = std::result::Result<T, CodegenError>;

/// Knobs that change the shape of generated units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    /// Infix of registration function names
    pub register_fn_suffix: String,
    /// Derive each handler's context from the inbound request
    pub use_request_context: bool,
    /// Derive PATCH field masks from the request body
    pub allow_patch_feature: bool,
    /// Import the file's own module instead of assuming the unit is included into it
    pub standalone: bool,
    /// Skip the module description comment
    pub omit_package_doc: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            register_fn_suffix: "handler".to_string(),
            use_request_context: false,
            allow_patch_feature: true,
            standalone: false,
            omit_package_doc: false,
        }
    }
}

/// Defines the core interface for turning one descriptor file into a source
/// unit. Implementors may return `None` for files with nothing to generate.
pub trait CodeGenerator {
    /// Generate the unit for `file`, reserving module aliases in `namespace`.
    fn generate(
        &self,
        file: &File,
        lookup: &dyn DescriptorLookup,
        namespace: &mut Namespace,
    ) -> Result<Option<GeneratedFile>>;
}

/// HTTP gateway generator for Triple/gRPC services
#[derive(Debug, Clone, Default)]
pub struct GatewayGenerator {
    options: GeneratorOptions,
}

impl GatewayGenerator {
    /// Generator with the given options
    pub fn new(options: GeneratorOptions) -> Self { Self { options } }

    /// Options in effect
    pub fn options(&self) -> &GeneratorOptions { &self.options }
}

impl CodeGenerator for GatewayGenerator {
    fn generate(
        &self,
        file: &File,
        lookup: &dyn DescriptorLookup,
        namespace: &mut Namespace,
    ) -> Result<Option<GeneratedFile>> {
        generate_file(file, lookup, namespace, &self.options)
    }
}

/// Trim trailing whitespace from each line and drop trailing blank lines.
/// Always ensures the returned string ends with a single newline when not empty.
fn clean_generated_source(src: &str) -> String {
    let mut lines: Vec<&str> = src.lines().map(str::trim_end).collect();

    while matches!(lines.last(), Some(line) if line.is_empty()) {
        lines.pop();
    }

    if lines.is_empty() {
        String::new()
    } else {
        format!("{}\n", lines.join("\n"))
    }
}

/// Persist generated units under `out_dir`, creating any necessary
/// subdirectories. Returns the written paths in input order.
pub fn write_generated<P: AsRef<Path>>(out_dir: P, files: &[GeneratedFile]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(&out_dir)?;
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = out_dir.as_ref().join(&file.name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, clean_generated_source(&file.content).as_bytes())?;
        tracing::debug!(path = %path.display(), "wrote generated unit");
        written.push(path);
    }
    Ok(written)
}
