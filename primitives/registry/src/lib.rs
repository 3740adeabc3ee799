#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Descriptor Registry — type lookup and naming state for one generation run.
//!
//! The [`Registry`] indexes every message and enum of a descriptor set by
//! fully-qualified name and resolves dotted field paths against them. The
//! [`Namespace`] hands out the module aliases generated code uses.

pub mod namespace;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ir::{DescriptorSet, Enum, FieldPath, FieldPathComponent, Message, RustModule};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use namespace::{Namespace, NamespaceError, CORE_ALIASES};

/// Errors raised by descriptor lookups
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Two files declare the same fully-qualified type
    #[error("duplicate type {0}")]
    DuplicateType(String),
    /// No message with that name
    #[error("no message found: {0}")]
    UnknownMessage(String),
    /// No enum with that name
    #[error("no enum found: {0}")]
    UnknownEnum(String),
    /// A field path component does not exist
    #[error("no field {field:?} in message {message} (field path {path:?})")]
    UnknownField {
        /// Message searched
        message: String,
        /// Missing component
        field: String,
        /// Whole dotted path
        path: String,
    },
    /// A field path traverses through a field that is not a singular message
    #[error("field {field:?} in field path {path:?} is not a singular message")]
    NotAMessage {
        /// Offending component
        field: String,
        /// Whole dotted path
        path: String,
    },
    /// Unknown separator name
    #[error("unknown repeated path parameter separator {0:?} (expected csv, pipes, ssv or tsv)")]
    UnknownSeparator(String),
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Separator used to split repeated path parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Separator {
    /// `,`
    #[default]
    Csv,
    /// `|`
    Pipes,
    /// space
    Ssv,
    /// tab
    Tsv,
}

impl Separator {
    /// The separator character
    pub fn as_char(self) -> char {
        match self {
            Separator::Csv => ',',
            Separator::Pipes => '|',
            Separator::Ssv => ' ',
            Separator::Tsv => '\t',
        }
    }
}

impl FromStr for Separator {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(Separator::Csv),
            "pipes" => Ok(Separator::Pipes),
            "ssv" => Ok(Separator::Ssv),
            "tsv" => Ok(Separator::Tsv),
            other => Err(RegistryError::UnknownSeparator(other.to_string())),
        }
    }
}

impl fmt::Display for Separator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Separator::Csv => "csv",
            Separator::Pipes => "pipes",
            Separator::Ssv => "ssv",
            Separator::Tsv => "tsv",
        };
        f.write_str(name)
    }
}

/// A message indexed by the registry
#[derive(Debug, Clone)]
pub struct MessageEntry {
    /// Fully-qualified name (".pkg.Outer.Inner")
    pub fqn: String,
    /// Name local to the file ("Outer.Inner")
    pub local_name: String,
    /// Rust module holding the type
    pub module: RustModule,
    /// Definition
    pub message: Message,
}

/// An enum indexed by the registry
#[derive(Debug, Clone)]
pub struct EnumEntry {
    /// Fully-qualified name
    pub fqn: String,
    /// Name local to the file
    pub local_name: String,
    /// Rust module holding the type
    pub module: RustModule,
    /// Definition
    pub definition: Enum,
}

/// Read-only descriptor lookups.
///
/// Consumers only ever read descriptors; this trait is the whole surface they
/// rely on.
pub trait DescriptorLookup {
    /// Look up a message by fully-qualified name
    fn lookup_message(&self, fqn: &str) -> Result<&MessageEntry>;

    /// Look up an enum by fully-qualified name
    fn lookup_enum(&self, fqn: &str) -> Result<&EnumEntry>;

    /// Separator for repeated path parameters
    fn repeated_path_param_separator(&self) -> Separator;

    /// Resolve a dotted field path against a message.
    ///
    /// Every component but the last must be a singular message field.
    fn resolve_field_path(&self, message_fqn: &str, path: &str) -> Result<FieldPath> {
        let mut message = self.lookup_message(message_fqn)?;
        let segments: Vec<&str> = path.split('.').collect();
        let mut components = Vec::with_capacity(segments.len());
        for (i, segment) in segments.iter().enumerate() {
            let field = message.message.field(segment).ok_or_else(|| RegistryError::UnknownField {
                message: message.fqn.clone(),
                field: segment.to_string(),
                path: path.to_string(),
            })?;
            if i + 1 < segments.len() {
                let next = match (field.message_type(), field.is_repeated()) {
                    (Some(next), false) => next,
                    _ => {
                        return Err(RegistryError::NotAMessage {
                            field: segment.to_string(),
                            path: path.to_string(),
                        })
                    }
                };
                message = self.lookup_message(next)?;
            }
            components.push(FieldPathComponent { target: field.clone() });
        }
        Ok(FieldPath::new(components))
    }
}

/// Index of every type in a descriptor set
#[derive(Debug, Default)]
pub struct Registry {
    messages: BTreeMap<String, MessageEntry>,
    enums: BTreeMap<String, EnumEntry>,
    separator: Separator,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self { Self::default() }

    /// Index every message and enum of `set`
    pub fn load(set: &DescriptorSet) -> Result<Self> {
        let mut registry = Self::new();
        for file in set.files() {
            for message in &file.messages {
                let fqn = file.qualify(&message.name);
                let entry = MessageEntry {
                    fqn: fqn.clone(),
                    local_name: message.name.clone(),
                    module: file.module.clone(),
                    message: message.clone(),
                };
                if registry.messages.insert(fqn.clone(), entry).is_some() {
                    return Err(RegistryError::DuplicateType(fqn));
                }
            }
            for definition in &file.enums {
                let fqn = file.qualify(&definition.name);
                let entry = EnumEntry {
                    fqn: fqn.clone(),
                    local_name: definition.name.clone(),
                    module: file.module.clone(),
                    definition: definition.clone(),
                };
                if registry.enums.insert(fqn.clone(), entry).is_some() {
                    return Err(RegistryError::DuplicateType(fqn));
                }
            }
        }
        tracing::debug!(
            messages = registry.messages.len(),
            enums = registry.enums.len(),
            "indexed descriptor set"
        );
        Ok(registry)
    }

    /// Use `separator` for repeated path parameters
    pub fn with_separator(mut self, separator: Separator) -> Self {
        self.separator = separator;
        self
    }

    /// Number of indexed messages
    pub fn message_count(&self) -> usize { self.messages.len() }

    /// Number of indexed enums
    pub fn enum_count(&self) -> usize { self.enums.len() }
}

impl DescriptorLookup for Registry {
    fn lookup_message(&self, fqn: &str) -> Result<&MessageEntry> {
        self.messages.get(fqn).ok_or_else(|| RegistryError::UnknownMessage(fqn.to_string()))
    }

    fn lookup_enum(&self, fqn: &str) -> Result<&EnumEntry> {
        self.enums.get(fqn).ok_or_else(|| RegistryError::UnknownEnum(fqn.to_string()))
    }

    fn repeated_path_param_separator(&self) -> Separator { self.separator }
}
