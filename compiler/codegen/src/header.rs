//! Unit header: banner comments, imports and the symbol uses that keep
//! otherwise unreferenced imports from raising warnings.

use std::fmt::Write as _;

use ir::File;

use crate::scope::FileScope;
use crate::{GeneratorOptions, Result};

/// Types referenced once so every core import counts as used
const SUPPRESSED: &[&str] = &[
    "tonic::Code",
    "runtime::ServerMetadata",
    "utilities::DoubleArray",
    "grpc_md::MetadataMap",
    "sync::Arc<()>",
    "time::Duration",
    "tracing::Level",
    "prost::DecodeError",
    "tokio::task::JoinHandle<()>",
    "tokio_stream::Empty<()>",
];

/// Comment lines placed above the formatted unit.
///
/// Plain comments do not survive parsing, so they are prepended afterwards.
pub(crate) fn banner(file: &File, options: &GeneratorOptions) -> Result<String> {
    let mut code = String::new();
    writeln!(code, "// Code generated by protoc-gen-triple-gateway-rs. DO NOT EDIT.")?;
    writeln!(code, "// source: {}", file.name)?;
    if !options.omit_package_doc {
        writeln!(code)?;
        writeln!(code, "// Module {} is a reverse proxy.", file.module.name)?;
        writeln!(code, "//")?;
        writeln!(code, "// It translates gRPC into RESTful JSON APIs.")?;
    }
    writeln!(code)?;
    Ok(code)
}

/// Imports followed by the suppression constants
pub(crate) fn prelude(scope: &FileScope<'_>) -> Result<String> {
    let mut code = scope.use_declarations();
    writeln!(code)?;
    for ty in SUPPRESSED {
        writeln!(code, "const _: Option<{ty}> = None;")?;
    }
    writeln!(code)?;
    Ok(code)
}
