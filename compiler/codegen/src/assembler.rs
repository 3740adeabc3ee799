//! File assembly.
//!
//! A unit is composed in a fixed order: banner, imports, suppression
//! constants, then per binding the query filter, field-mask tables and
//! handlers, then the registration functions and the trailer.

use analysis::classifier::supports_local;
use analysis::resolve_service;
use ir::File;
use registry::{DescriptorLookup, Namespace};

use crate::handler::{emit_filter, emit_local_handler, emit_remote_handler};
use crate::mask::{masked_body, MaskTables};
use crate::registrar::{emit_registrars, emit_trailer, CONN_IDLE_LIFETIME};
use crate::scope::FileScope;
use crate::{format, header, GeneratorOptions, Result, OUTPUT_SUFFIX};

/// One generated source unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Output path relative to the output directory
    pub name: String,
    /// Formatted source text
    pub content: String,
}

/// Generate the gateway unit for `file`.
///
/// Returns `Ok(None)` when no method of the file carries a binding. Aliases
/// reserved here stay reserved in `namespace` for later files.
pub fn generate_file(
    file: &File,
    lookup: &dyn DescriptorLookup,
    namespace: &mut Namespace,
    options: &GeneratorOptions,
) -> Result<Option<GeneratedFile>> {
    tracing::debug!(file = %file.name, "Processing");

    let mut services = Vec::with_capacity(file.services.len());
    for service in &file.services {
        let resolved = resolve_service(lookup, file, service)?;
        if resolved.has_bindings() {
            services.push(resolved);
        }
    }
    if services.is_empty() {
        tracing::debug!(file = %file.name, "Skip: no bound methods");
        return Ok(None);
    }

    let separator = lookup.repeated_path_param_separator();
    let mut scope = FileScope::new(namespace, file.module.clone(), options.standalone);
    let mut body = String::new();
    let mut mask_tables = MaskTables::new();

    for service in &services {
        for method in &service.methods {
            tracing::trace!(service = %service.name, method = %method.name, bindings = method.bindings.len(), "emitting handlers");
            for binding in &method.bindings {
                emit_filter(&mut body, service, method, binding)?;
                if let Some(body_type) = masked_body(method, binding, options) {
                    mask_tables.emit(&mut body, lookup, body_type)?;
                }
                emit_remote_handler(&mut body, &mut scope, service, method, binding, separator, options)?;
                if supports_local(method) {
                    emit_local_handler(&mut body, &mut scope, service, method, binding, separator, options)?;
                }
            }
        }
    }
    for service in &services {
        emit_registrars(&mut body, &mut scope, service, options)?;
    }
    body.push_str(CONN_IDLE_LIFETIME);
    body.push('\n');
    for service in &services {
        emit_trailer(&mut body, &mut scope, service)?;
    }

    let mut source = header::prelude(&scope)?;
    source.push_str(&body);
    let formatted = format::format_unit(&file.name, &source)?;

    Ok(Some(GeneratedFile {
        name: format!("{}{OUTPUT_SUFFIX}", file.output_prefix()),
        content: format!("{}{formatted}", header::banner(file, options)?),
    }))
}
