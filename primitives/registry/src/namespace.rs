//! Module alias allocation.
//!
//! Generated code refers to every external module through a `use path as
//! alias;` import. The namespace maps aliases to module paths injectively for
//! the whole run: an alias is never reused for a different path, and asking
//! again for a path already imported returns the alias it already has.

use std::collections::BTreeMap;

use thiserror::Error;

/// Support modules every generated unit imports, as `(alias, path)`.
///
/// They are reserved before any message module so generated code can name
/// them literally.
pub const CORE_ALIASES: &[(&str, &str)] = &[
    ("runtime", "::triplegate_runtime"),
    ("utilities", "::triplegate_runtime::utilities"),
    ("mux", "::gateway_mux"),
    ("http", "::http"),
    ("tonic", "::tonic"),
    ("tracing", "::tracing"),
    ("prost", "::prost"),
    ("tokio", "::tokio"),
    ("tokio_stream", "::tokio_stream"),
    ("sync", "::std::sync"),
    ("time", "::std::time"),
    ("grpc_transport", "::tonic::transport"),
    ("grpc_md", "::tonic::metadata"),
];

/// Words that cannot name a `use … as` alias: keywords, reserved words and
/// path roots.
const UNUSABLE_ALIASES: &[&str] = &[
    "Self", "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return",
    "self", "static", "struct", "super", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Default number of suffixed candidates tried before giving up
pub const DEFAULT_PROBE_LIMIT: usize = 1024;

/// Alias allocation failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamespaceError {
    /// A fixed alias is already bound to a different module
    #[error("alias {alias:?} for {requested} is already taken by {held_by}")]
    FixedAliasTaken {
        /// Alias requested
        alias: String,
        /// Module currently holding it
        held_by: String,
        /// Module that asked for it
        requested: String,
    },
    /// Every candidate alias up to the probe limit is taken
    #[error("no free alias for {path} after {attempts} attempts from base {base:?}")]
    Exhausted {
        /// Base alias
        base: String,
        /// Module path
        path: String,
        /// Candidates tried
        attempts: usize,
    },
}

/// Result type for namespace operations
pub type Result<T> = std::result::Result<T, NamespaceError>;

/// Run-scoped alias registry.
///
/// Reservations are cumulative: later files see aliases reserved for earlier
/// ones. Tests and separate runs each create their own instance.
#[derive(Debug, Clone)]
pub struct Namespace {
    by_alias: BTreeMap<String, String>,
    by_path: BTreeMap<String, String>,
    probe_limit: usize,
}

impl Default for Namespace {
    fn default() -> Self {
        Self { by_alias: BTreeMap::new(), by_path: BTreeMap::new(), probe_limit: DEFAULT_PROBE_LIMIT }
    }
}

impl Namespace {
    /// Empty namespace
    pub fn new() -> Self { Self::default() }

    /// Namespace with the core aliases already reserved
    pub fn with_core() -> Result<Self> {
        let mut ns = Self::new();
        ns.reserve_core()?;
        Ok(ns)
    }

    /// Limit the number of suffixed candidates tried per reservation
    pub fn with_probe_limit(mut self, limit: usize) -> Self {
        self.probe_limit = limit;
        self
    }

    /// Reserve every alias in [`CORE_ALIASES`]
    pub fn reserve_core(&mut self) -> Result<()> {
        for (alias, path) in CORE_ALIASES {
            self.reserve_fixed(alias, path)?;
        }
        Ok(())
    }

    /// Reserve `alias` for `path` exactly, without suffixing
    pub fn reserve_fixed(&mut self, alias: &str, path: &str) -> Result<()> {
        match self.by_alias.get(alias) {
            Some(held_by) if held_by == path => Ok(()),
            Some(held_by) => Err(NamespaceError::FixedAliasTaken {
                alias: alias.to_string(),
                held_by: held_by.clone(),
                requested: path.to_string(),
            }),
            None => {
                self.bind(alias.to_string(), path);
                Ok(())
            }
        }
    }

    /// Reserve an alias for `path`, probing `base`, `base_0`, `base_1`, …
    ///
    /// Returns the alias already bound to `path` if there is one. A `base`
    /// that is a Rust keyword is skipped, so module `type` gets `type_0`.
    pub fn reserve(&mut self, base: &str, path: &str) -> Result<String> {
        if let Some(alias) = self.by_path.get(path) {
            return Ok(alias.clone());
        }
        let candidates =
            std::iter::once(base.to_string()).chain((0..self.probe_limit).map(|i| format!("{base}_{i}")));
        for candidate in candidates {
            if !self.by_alias.contains_key(&candidate) && !UNUSABLE_ALIASES.contains(&candidate.as_str()) {
                tracing::trace!(alias = %candidate, path, "reserved module alias");
                self.bind(candidate.clone(), path);
                return Ok(candidate);
            }
        }
        Err(NamespaceError::Exhausted {
            base: base.to_string(),
            path: path.to_string(),
            attempts: self.probe_limit + 1,
        })
    }

    /// Alias bound to `path`, if any
    pub fn alias_for(&self, path: &str) -> Option<&str> { self.by_path.get(path).map(String::as_str) }

    /// Module path bound to `alias`, if any
    pub fn path_for(&self, alias: &str) -> Option<&str> { self.by_alias.get(alias).map(String::as_str) }

    /// Number of reserved aliases
    pub fn len(&self) -> usize { self.by_alias.len() }

    /// Whether nothing is reserved
    pub fn is_empty(&self) -> bool { self.by_alias.is_empty() }

    fn bind(&mut self, alias: String, path: &str) {
        self.by_path.insert(path.to_string(), alias.clone());
        self.by_alias.insert(alias, path.to_string());
    }
}
