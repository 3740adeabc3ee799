//! Field tables for PATCH field-mask derivation.
//!
//! A derived mask lists the body fields the client actually sent. The runtime
//! reads the body against a static table per message type: singular message
//! fields link to the table of their type, everything else is a leaf. One
//! static is emitted per message reachable from a PATCH body, once per unit.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use analysis::classifier::auto_field_mask;
use analysis::{ResolvedBinding, ResolvedMethod};
use registry::DescriptorLookup;

use crate::utils::{escape_str, json_name, screaming_snake_case};
use crate::{GeneratorOptions, Result};

const WELL_KNOWN_PREFIX: &str = ".google.protobuf.";

/// Body message type of a binding whose handlers derive a field mask
pub(crate) fn masked_body<'a>(
    method: &ResolvedMethod,
    binding: &'a ResolvedBinding,
    options: &GeneratorOptions,
) -> Option<&'a str> {
    auto_field_mask(method, binding, options.allow_patch_feature)?;
    binding.body.as_ref()?.field_path.target()?.message_type()
}

/// Name of the table static for message `fqn`
pub(crate) fn table_name(fqn: &str) -> String {
    let segments: Vec<String> = fqn.trim_start_matches('.').split('.').map(screaming_snake_case).collect();
    format!("MASK_{}", segments.join("_"))
}

/// Tables already emitted into the current unit
#[derive(Debug, Default)]
pub(crate) struct MaskTables {
    emitted: BTreeSet<String>,
}

impl MaskTables {
    pub(crate) fn new() -> Self { Self::default() }

    /// Emit the table for `root` and every message reachable from it
    pub(crate) fn emit(&mut self, code: &mut String, lookup: &dyn DescriptorLookup, root: &str) -> Result<()> {
        let mut pending = vec![root.to_string()];
        while let Some(fqn) = pending.pop() {
            if !self.emitted.insert(fqn.clone()) {
                continue;
            }
            let entry = lookup.lookup_message(&fqn)?;
            let mut fields = String::new();
            for field in &entry.message.fields {
                let name = escape_str(&field.name);
                let json = escape_str(&json_name(&field.name));
                match field.message_type() {
                    Some(nested) if !field.is_repeated() && !nested.starts_with(WELL_KNOWN_PREFIX) => {
                        writeln!(
                            fields,
                            "    runtime::field_mask::MaskField::message(\"{name}\", \"{json}\", &{}),",
                            table_name(nested)
                        )?;
                        pending.push(nested.to_string());
                    }
                    _ => writeln!(fields, "    runtime::field_mask::MaskField::leaf(\"{name}\", \"{json}\"),")?,
                }
            }
            writeln!(
                code,
                "static {}: runtime::field_mask::MaskFields = runtime::field_mask::MaskFields::new(&[\n{fields}]);\n",
                table_name(&fqn)
            )?;
        }
        Ok(())
    }
}
