//! Per-file import scope.
//!
//! A [`FileScope`] borrows the run's [`Namespace`] while one unit is being
//! generated. Every type path rendered through it reserves (or reuses) the
//! alias of the module holding the type and records the import, so the unit
//! header lists each module exactly once.

use std::collections::BTreeMap;

use ir::RustModule;
use registry::{EnumEntry, MessageEntry, Namespace, CORE_ALIASES};

use crate::utils::{nested_type_path, pascal_to_snake_case};
use crate::Result;

/// Imports and type-path rendering for one generated unit
#[derive(Debug)]
pub struct FileScope<'ns> {
    namespace: &'ns mut Namespace,
    own: RustModule,
    standalone: bool,
    imports: BTreeMap<String, String>,
}

impl<'ns> FileScope<'ns> {
    /// Scope for a unit generated from a file whose types live in `own`
    pub fn new(namespace: &'ns mut Namespace, own: RustModule, standalone: bool) -> Self {
        Self { namespace, own, standalone, imports: BTreeMap::new() }
    }

    /// Prefix (empty or `alias::`) that reaches items of `module`
    pub fn module_prefix(&mut self, module: &RustModule) -> Result<String> {
        if *module == self.own && !self.standalone {
            return Ok(String::new());
        }
        let alias = self.namespace.reserve(&module.name, &module.path)?;
        self.imports.entry(alias.clone()).or_insert_with(|| module.path.clone());
        Ok(format!("{alias}::"))
    }

    /// Path of a message type
    pub fn message_path(&mut self, entry: &MessageEntry) -> Result<String> {
        Ok(format!("{}{}", self.module_prefix(&entry.module)?, nested_type_path(&entry.local_name)))
    }

    /// Path of an enum type
    pub fn enum_path(&mut self, entry: &EnumEntry) -> Result<String> {
        Ok(format!("{}{}", self.module_prefix(&entry.module)?, nested_type_path(&entry.local_name)))
    }

    /// Path of the generated client for `service`
    pub fn client_path(&mut self, service: &str) -> Result<String> {
        let own = self.own.clone();
        Ok(format!("{}{}_client::{service}Client<grpc_transport::Channel>", self.module_prefix(&own)?, pascal_to_snake_case(service)))
    }

    /// Path of the generated server trait for `service`
    pub fn server_path(&mut self, service: &str) -> Result<String> {
        let own = self.own.clone();
        Ok(format!("{}{}_server::{service}", self.module_prefix(&own)?, pascal_to_snake_case(service)))
    }

    /// `use` declarations: core aliases first, then file imports by alias
    pub fn use_declarations(&self) -> String {
        let mut out = String::new();
        for (alias, path) in CORE_ALIASES {
            out.push_str(&format!("use {path} as {alias};\n"));
        }
        for (alias, path) in &self.imports {
            out.push_str(&format!("use {path} as {alias};\n"));
        }
        out
    }

    /// Aliases imported for this unit, excluding core aliases
    pub fn imports(&self) -> impl Iterator<Item = (&str, &str)> {
        self.imports.iter().map(|(a, p)| (a.as_str(), p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(path: &str, name: &str) -> RustModule { RustModule { path: path.into(), name: name.into() } }

    #[test]
    fn own_module_is_unqualified_unless_standalone() {
        let mut ns = Namespace::with_core().expect("core");
        let own = module("crate::pb::helloworld", "helloworld");
        let mut scope = FileScope::new(&mut ns, own.clone(), false);
        assert_eq!(scope.module_prefix(&own).expect("prefix"), "");
        assert_eq!(scope.imports().count(), 0);

        let mut scope = FileScope::new(&mut ns, own.clone(), true);
        assert_eq!(scope.module_prefix(&own).expect("prefix"), "helloworld::");
        assert!(scope.use_declarations().contains("use crate::pb::helloworld as helloworld;"));
    }

    #[test]
    fn colliding_module_names_get_suffixes() {
        let mut ns = Namespace::with_core().expect("core");
        let own = module("crate::pb::library", "library");
        let mut scope = FileScope::new(&mut ns, own, false);
        let a = scope.module_prefix(&module("crate::pb::a::v1", "v1")).expect("a");
        let b = scope.module_prefix(&module("crate::pb::b::v1", "v1")).expect("b");
        let again = scope.module_prefix(&module("crate::pb::a::v1", "v1")).expect("again");
        assert_eq!(a, "v1::");
        assert_eq!(b, "v1_0::");
        assert_eq!(again, a);
        assert_eq!(scope.imports().count(), 2);
    }

    #[test]
    fn core_alias_names_are_not_reused() {
        let mut ns = Namespace::with_core().expect("core");
        let mut scope = FileScope::new(&mut ns, module("crate::pb::own", "own"), false);
        let prefix = scope.module_prefix(&module("crate::pb::runtime", "runtime")).expect("prefix");
        assert_eq!(prefix, "runtime_0::");
    }
}
