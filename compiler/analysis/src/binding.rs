//! Resolved binding views
//!
//! Descriptors name fields with dotted strings; generation needs them resolved
//! against the request message. These views are built once per service and
//! dropped when the service's code has been emitted.

use ir::{Field, FieldPath, File, HttpMethod, PathTemplate, RustModule, Service, WHOLE_BODY};
use registry::{DescriptorLookup, EnumEntry, MessageEntry};

use crate::validator::DuplicateGuard;
use crate::{AnalysisError, Result};

/// What the request body populates
#[derive(Debug, Clone)]
pub struct BodySelector {
    /// Selected field; empty for `"*"`
    pub field_path: FieldPath,
}

impl BodySelector {
    /// Whether the body is the whole request message
    pub fn is_whole(&self) -> bool { self.field_path.is_empty() }
}

/// A path parameter resolved against the request message
#[derive(Debug, Clone)]
pub struct PathParam {
    /// Field path the parameter populates
    pub field_path: FieldPath,
    /// Target field descriptor
    pub target: Field,
    /// Target enum, if the field is enum-typed
    pub enum_ref: Option<EnumEntry>,
}

impl PathParam {
    /// Dotted key used in the path-parameter map
    pub fn key(&self) -> String { self.field_path.dotted() }

    /// Whether the target is repeated
    pub fn is_repeated(&self) -> bool { self.target.is_repeated() }

    /// Whether population traverses into a sub-message
    pub fn is_nested(&self) -> bool { self.field_path.is_nested() }

    /// Whether the target is an enum
    pub fn is_enum(&self) -> bool { self.enum_ref.is_some() }
}

/// One HTTP binding with every field reference resolved
#[derive(Debug, Clone)]
pub struct ResolvedBinding {
    /// Position in the method's binding list
    pub index: usize,
    /// HTTP verb
    pub http_method: HttpMethod,
    /// Compiled path template
    pub path_template: PathTemplate,
    /// Body selector, if the binding has a body
    pub body: Option<BodySelector>,
    /// Response sub-field returned instead of the whole response
    pub response_body: Option<FieldPath>,
    /// Path parameters in template order
    pub path_params: Vec<PathParam>,
}

/// A method with at least one binding
#[derive(Debug, Clone)]
pub struct ResolvedMethod {
    /// Method name
    pub name: String,
    /// Request message
    pub input: MessageEntry,
    /// Response message
    pub output: MessageEntry,
    /// Request is a stream
    pub client_streaming: bool,
    /// Response is a stream
    pub server_streaming: bool,
    /// Bindings, never empty
    pub bindings: Vec<ResolvedBinding>,
}

/// A service with its bound methods
#[derive(Debug, Clone)]
pub struct ResolvedService {
    /// Service name
    pub name: String,
    /// Proto package of the owning file
    pub package: String,
    /// Rust module of the owning file
    pub module: RustModule,
    /// Methods that carry bindings, in declaration order
    pub methods: Vec<ResolvedMethod>,
}

impl ResolvedService {
    /// `package.Service`
    pub fn qualified_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }

    /// Whether any method carries a binding
    pub fn has_bindings(&self) -> bool { !self.methods.is_empty() }
}

/// Resolve every binding of `service`.
///
/// Methods without bindings are dropped. A duplicate (verb, template) pair
/// within the service fails the whole service.
pub fn resolve_service(lookup: &dyn DescriptorLookup, file: &File, service: &Service) -> Result<ResolvedService> {
    let mut guard = DuplicateGuard::new(&service.name);
    let mut methods = Vec::new();

    for method in &service.methods {
        if method.bindings.is_empty() {
            tracing::trace!(service = %service.name, method = %method.name, "method has no bindings");
            continue;
        }
        let input = lookup.lookup_message(&method.input_type)?.clone();
        let output = lookup.lookup_message(&method.output_type)?.clone();

        let mut bindings = Vec::with_capacity(method.bindings.len());
        for (index, binding) in method.bindings.iter().enumerate() {
            guard.check(&method.name, binding)?;

            let body = match binding.body.as_deref() {
                None | Some("") => None,
                Some(WHOLE_BODY) => Some(BodySelector { field_path: FieldPath::default() }),
                Some(path) => {
                    let field_path = lookup.resolve_field_path(&input.fqn, path)?;
                    let singular_message = field_path.target().is_some_and(|f| f.is_message() && !f.is_repeated());
                    if !singular_message {
                        return Err(AnalysisError::UnsupportedBody {
                            method: method.name.clone(),
                            body: path.to_string(),
                        });
                    }
                    Some(BodySelector { field_path })
                }
            };

            let response_body = match binding.response_body.as_deref() {
                None | Some("") => None,
                Some(path) => Some(lookup.resolve_field_path(&output.fqn, path)?),
            };

            let mut path_params = Vec::with_capacity(binding.path_params.len());
            for param in &binding.path_params {
                let field_path = lookup.resolve_field_path(&input.fqn, param)?;
                let Some(target) = field_path.target().cloned() else {
                    continue;
                };
                if target.is_message() {
                    return Err(AnalysisError::UnsupportedPathParam {
                        method: method.name.clone(),
                        param: param.clone(),
                        field: target.name,
                    });
                }
                let enum_ref = match target.enum_type() {
                    Some(fqn) => Some(lookup.lookup_enum(fqn)?.clone()),
                    None => None,
                };
                path_params.push(PathParam { field_path, target, enum_ref });
            }

            bindings.push(ResolvedBinding {
                index,
                http_method: binding.http_method,
                path_template: binding.path_template.clone(),
                body,
                response_body,
                path_params,
            });
        }

        methods.push(ResolvedMethod {
            name: method.name.clone(),
            input,
            output,
            client_streaming: method.client_streaming,
            server_streaming: method.server_streaming,
            bindings,
        });
    }

    Ok(ResolvedService {
        name: service.name.clone(),
        package: file.package.clone(),
        module: file.module.clone(),
        methods,
    })
}
