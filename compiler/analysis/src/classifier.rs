//! Binding Classifier
//!
//! Decision functions consulted by the code generator. Each one answers a
//! single question about a method or binding so the text producers never
//! branch on raw descriptor state.

use std::collections::BTreeSet;

use ir::{Field, HttpMethod, Message};

use crate::binding::{ResolvedBinding, ResolvedMethod};

/// How requests and responses flow for a method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    /// Single request, single response
    Unary,
    /// Single request, streamed response
    ServerStreaming,
    /// Streamed request, single response
    ClientStreaming,
    /// Streamed request and response
    Bidirectional,
}

impl CallShape {
    /// Whether the response is a stream
    pub fn streams_response(self) -> bool { matches!(self, CallShape::ServerStreaming | CallShape::Bidirectional) }

    /// Whether the request is a stream
    pub fn streams_request(self) -> bool { matches!(self, CallShape::ClientStreaming | CallShape::Bidirectional) }
}

/// Call shape of `method`; both streaming flags make it bidirectional
pub fn call_shape(method: &ResolvedMethod) -> CallShape {
    match (method.client_streaming, method.server_streaming) {
        (true, true) => CallShape::Bidirectional,
        (true, false) => CallShape::ClientStreaming,
        (false, true) => CallShape::ServerStreaming,
        (false, false) => CallShape::Unary,
    }
}

/// Whether the in-process registration can serve `method`
pub fn supports_local(method: &ResolvedMethod) -> bool { call_shape(method) == CallShape::Unary }

/// Whether the handler must populate fields from the query string.
///
/// False when the body is the whole request message. Otherwise the dotted
/// body and path-parameter paths are struck from the request's top-level
/// field names and any survivor means true. Nested paths never strike their
/// top-level field, so this over-approximates: a binding whose fields are all
/// consumed through nested paths still parses the query string.
pub fn requires_query_passthrough(method: &ResolvedMethod, binding: &ResolvedBinding) -> bool {
    if binding.body.as_ref().is_some_and(|body| body.is_whole()) {
        return false;
    }
    let mut remaining: BTreeSet<String> = method.input.message.fields.iter().map(|f| f.name.clone()).collect();
    if let Some(body) = &binding.body {
        remaining.remove(&body.field_path.dotted());
    }
    for param in &binding.path_params {
        remaining.remove(&param.key());
    }
    !remaining.is_empty()
}

/// Whether some path parameter is an enum with the given cardinality
pub fn has_enum_path_param(binding: &ResolvedBinding, repeated: bool) -> bool {
    binding.path_params.iter().any(|p| p.is_enum() && p.is_repeated() == repeated)
}

/// The request message's field-mask field, if it has exactly one
pub fn field_mask_field(message: &Message) -> Option<&Field> {
    let mut masks = message.fields.iter().filter(|f| f.is_field_mask());
    match (masks.next(), masks.next()) {
        (Some(field), None) => Some(field),
        _ => None,
    }
}

/// The field mask to derive from the raw body, if this binding qualifies.
///
/// Requires the patch feature, a PATCH verb, a body that is not the whole
/// message, and a unique field-mask field in the request.
pub fn auto_field_mask<'a>(
    method: &'a ResolvedMethod,
    binding: &ResolvedBinding,
    allow_patch_feature: bool,
) -> Option<&'a Field> {
    if !allow_patch_feature || binding.http_method != HttpMethod::Patch {
        return None;
    }
    match &binding.body {
        Some(body) if !body.is_whole() => field_mask_field(&method.input.message),
        _ => None,
    }
}
