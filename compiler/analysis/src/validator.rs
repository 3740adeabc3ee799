//! Binding Validation
//!
//! Rejects a second binding that reuses a (verb, template) pair already bound
//! in the same service.

use std::collections::BTreeSet;

use ir::{Binding, HttpMethod};

use crate::{AnalysisError, Result};

/// Tracks the (verb, template) pairs accepted so far for one service
#[derive(Debug)]
pub struct DuplicateGuard {
    service: String,
    seen: BTreeSet<(HttpMethod, String)>,
}

impl DuplicateGuard {
    /// Guard for one service
    pub fn new(service: &str) -> Self { Self { service: service.to_string(), seen: BTreeSet::new() } }

    /// Accept `binding` or fail if its pair was already accepted
    pub fn check(&mut self, method: &str, binding: &Binding) -> Result<()> {
        let key = (binding.http_method, binding.path_template.template.clone());
        if !self.seen.insert(key) {
            return Err(AnalysisError::DuplicateBinding {
                service: self.service.clone(),
                method: method.to_string(),
                http_method: binding.http_method,
                template: binding.path_template.template.clone(),
            });
        }
        Ok(())
    }

    /// Number of accepted bindings
    pub fn len(&self) -> usize { self.seen.len() }

    /// Whether nothing was accepted yet
    pub fn is_empty(&self) -> bool { self.seen.is_empty() }
}
