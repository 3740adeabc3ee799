//! Query Filter Builder
//!
//! Fields consumed by the body or a path parameter must not be populated again
//! from the query string. The filter stores those field paths in a
//! [`DoubleArray`] that generated code embeds and queries per field.

use triplegate_runtime::utilities::DoubleArray;

use crate::binding::ResolvedBinding;

/// Field paths excluded from query-string population for one binding
#[derive(Debug, Clone)]
pub struct QueryParamFilter {
    array: DoubleArray,
}

impl QueryParamFilter {
    /// Build the filter from the binding's body and path-parameter paths
    pub fn build(binding: &ResolvedBinding) -> Self {
        let mut seqs: Vec<Vec<String>> = Vec::new();
        if let Some(body) = &binding.body {
            if !body.is_whole() {
                seqs.push(body.field_path.segments().into_iter().map(String::from).collect());
            }
        }
        for param in &binding.path_params {
            seqs.push(param.field_path.segments().into_iter().map(String::from).collect());
        }
        Self { array: DoubleArray::new(seqs) }
    }

    /// Whether `path` is exactly one of the excluded field paths
    pub fn excludes(&self, path: &[&str]) -> bool { self.array.contains(path) }

    /// Whether `path` is excluded or lies under an excluded field
    pub fn covers(&self, path: &[&str]) -> bool { self.array.has_common_prefix(path) }

    /// Whether nothing is excluded
    pub fn is_empty(&self) -> bool { self.array.is_empty() }

    /// Underlying trie
    pub fn array(&self) -> &DoubleArray { &self.array }
}
