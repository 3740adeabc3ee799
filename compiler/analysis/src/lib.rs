#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Triplegate Binding Analysis
//!
//! Derives everything the code generator needs to know about a binding before
//! any text is produced: resolved field paths, call shape, query pass-through,
//! enum path parameters, field-mask eligibility, the query-parameter filter,
//! and duplicate (verb, template) detection.

use ir::HttpMethod;
use thiserror::Error;

pub mod binding;
pub mod classifier;
pub mod query_filter;
pub mod validator;

pub use binding::{resolve_service, BodySelector, PathParam, ResolvedBinding, ResolvedMethod, ResolvedService};
pub use classifier::CallShape;
pub use query_filter::QueryParamFilter;
pub use validator::DuplicateGuard;

/// Errors produced while analysing a file's bindings.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Descriptor lookup failure
    #[error(transparent)]
    Registry(#[from] registry::RegistryError),
    /// Two bindings of one service share a verb and template
    #[error("duplicate binding {http_method} {template} in service {service} (method {method})")]
    DuplicateBinding {
        /// Service name
        service: String,
        /// Method carrying the second binding
        method: String,
        /// HTTP verb
        http_method: HttpMethod,
        /// Path template
        template: String,
    },
    /// A path parameter refers to a field that cannot be populated from a string
    #[error("path parameter {param:?} of {method} targets message field {field:?}, which is not supported")]
    UnsupportedPathParam {
        /// Method name
        method: String,
        /// Dotted parameter path
        param: String,
        /// Target field
        field: String,
    },
    /// A body selector refers to a field that is not a singular message
    #[error("body {body:?} of {method} must select \"*\" or a singular message field")]
    UnsupportedBody {
        /// Method name
        method: String,
        /// Body selector
        body: String,
    },
}

/// Result alias for analysis
pub type Result<T> = std::result::Result<T, AnalysisError>;
