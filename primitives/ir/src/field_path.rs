//! Resolved field paths
//!
//! A field path is a dotted reference into a message (`"book.author.name"`)
//! after every component has been matched against its field descriptor.

use std::fmt;

use crate::descriptor::Field;

/// One component of a resolved field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPathComponent {
    /// Field descriptor the component resolves to
    pub target: Field,
}

impl FieldPathComponent {
    /// Proto name of the component
    pub fn name(&self) -> &str { &self.target.name }
}

/// A dotted field path with every component resolved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath {
    components: Vec<FieldPathComponent>,
}

impl FieldPath {
    /// Build a path from resolved components
    pub fn new(components: Vec<FieldPathComponent>) -> Self { Self { components } }

    /// Components in order from the root message
    pub fn components(&self) -> &[FieldPathComponent] { &self.components }

    /// Whether the path has no components
    pub fn is_empty(&self) -> bool { self.components.is_empty() }

    /// Whether the path traverses into a sub-message
    pub fn is_nested(&self) -> bool { self.components.len() > 1 }

    /// Field the path finally refers to
    pub fn target(&self) -> Option<&Field> { self.components.last().map(|c| &c.target) }

    /// Component names in order
    pub fn segments(&self) -> Vec<&str> { self.components.iter().map(|c| c.name()).collect() }

    /// Dotted form (`"a.b.c"`)
    pub fn dotted(&self) -> String { self.segments().join(".") }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.dotted()) }
}
