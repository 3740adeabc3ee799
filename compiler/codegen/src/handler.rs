//! Request handlers.
//!
//! One remote handler per binding calls the method through a client stub; a
//! local handler calls a server implementation directly and exists only for
//! unary methods. All branching goes through the classifier so the emitters
//! below only choose between text fragments.

use std::fmt::Write as _;

use analysis::classifier::{auto_field_mask, call_shape, has_enum_path_param, requires_query_passthrough};
use analysis::{CallShape, PathParam, QueryParamFilter, ResolvedBinding, ResolvedMethod, ResolvedService};
use ir::{FieldPath, FieldPathComponent, FieldType, ScalarType};
use registry::Separator;

use crate::mask::{masked_body, table_name};
use crate::scope::FileScope;
use crate::utils::{escape_str, field_ident, pascal_to_snake_case, sanitize_external_identifier, screaming_snake_case};
use crate::{GeneratorOptions, Result};

/// Identifiers derived from one binding
#[derive(Debug, Clone)]
pub(crate) struct BindingNames {
    /// `{svc}_{method}_{index}`
    pub stem: String,
    /// `FILTER_…` static
    pub filter: String,
    /// `PATTERN_…` constant
    pub pattern: String,
    /// Forwarder alias
    pub forward: String,
    /// Response-body wrapper type
    pub wrapper: String,
}

impl BindingNames {
    pub(crate) fn new(service: &str, method: &str, index: usize) -> Self {
        let stem = format!("{}_{}_{index}", pascal_to_snake_case(service), pascal_to_snake_case(method));
        let upper = format!("{}_{}_{index}", screaming_snake_case(service), screaming_snake_case(method));
        Self {
            filter: format!("FILTER_{upper}"),
            pattern: format!("PATTERN_{upper}"),
            forward: format!("forward_{stem}"),
            wrapper: format!("Response{service}{method}{index}"),
            stem,
        }
    }

    pub(crate) fn remote(&self) -> String { format!("request_{}", self.stem) }

    pub(crate) fn local(&self) -> String { format!("local_request_{}", self.stem) }
}

/// Rust identifier of the stub method for an RPC method
pub(crate) fn method_ident(method: &str) -> String { sanitize_external_identifier(&pascal_to_snake_case(method)) }

const INVALID: &str = "|err| tonic::Status::invalid_argument(err.to_string())";

/// Static holding the binding's query filter, when the query string is read
pub(crate) fn emit_filter(
    code: &mut String,
    service: &ResolvedService,
    method: &ResolvedMethod,
    binding: &ResolvedBinding,
) -> Result<()> {
    if !requires_query_passthrough(method, binding) {
        return Ok(());
    }
    let names = BindingNames::new(&service.name, &method.name, binding.index);
    let filter = QueryParamFilter::build(binding);
    let array = filter.array();
    let encoding: Vec<String> =
        array.encoding().map(|(token, id)| format!("(\"{}\", {id})", escape_str(token))).collect();
    let base: Vec<String> = array.base().iter().map(usize::to_string).collect();
    let check: Vec<String> = array.check().iter().map(usize::to_string).collect();

    writeln!(
        code,
        "static {}: sync::LazyLock<utilities::DoubleArray> = sync::LazyLock::new(|| {{
    utilities::DoubleArray::from_parts(&[{}], &[{}], &[{}])
}});
",
        names.filter,
        encoding.join(", "),
        base.join(", "),
        check.join(", "),
    )?;
    Ok(())
}

/// Handler that calls the method through a client stub
pub(crate) fn emit_remote_handler(
    code: &mut String,
    scope: &mut FileScope<'_>,
    service: &ResolvedService,
    method: &ResolvedMethod,
    binding: &ResolvedBinding,
    separator: Separator,
    options: &GeneratorOptions,
) -> Result<()> {
    let names = BindingNames::new(&service.name, &method.name, binding.index);
    let shape = call_shape(method);
    let client = scope.client_path(&service.name)?;
    let request = scope.message_path(&method.input)?;
    let response = response_type(scope, method)?;
    let params = if shape.streams_request() { "_path_params" } else { "path_params" };

    writeln!(
        code,
        "async fn {}(
    ctx: &mux::Context,
    marshaler: &mux::Marshaler,
    client: &mut {client},
    req: mux::Request,
    {params}: &mux::PathParams,
) -> Result<({response}, runtime::ServerMetadata), runtime::CallError> {{",
        names.remote(),
    )?;

    let call = method_ident(&method.name);
    match shape {
        CallShape::Unary => {
            emit_population(code, scope, &names, method, binding, separator, options)?;
            writeln!(
                code,
                "    let mut request = ctx.outgoing_request(proto_req);
    request.extensions_mut().insert(runtime::InterfaceKey::new(\"{}\"));
    let response = client.{call}(request).await.map_err(runtime::CallError::from_rpc)?;
    let (header, msg, extensions) = response.into_parts();
    let mut metadata = runtime::ServerMetadata::with_header(header);
    if let Some(attachments) = extensions.get::<runtime::Attachments>() {{
        runtime::merge_attachments(&mut metadata.trailer, attachments);
    }}
    Ok((msg, metadata))",
                escape_str(&service.qualified_name()),
            )?;
        }
        CallShape::ServerStreaming => {
            emit_population(code, scope, &names, method, binding, separator, options)?;
            writeln!(
                code,
                "    let response = client.{call}(ctx.outgoing_request(proto_req)).await.map_err(runtime::CallError::from_rpc)?;
    let (header, stream, _) = response.into_parts();
    Ok((stream, runtime::ServerMetadata::with_header(header)))"
            )?;
        }
        CallShape::ClientStreaming => {
            writeln!(
                code,
                "    let (tx, rx) = tokio::sync::mpsc::channel::<{request}>(1);
    let mut call = Box::pin(client.{call}(ctx.outgoing_request(tokio_stream::wrappers::ReceiverStream::new(rx))));
    let mut decoder = marshaler.new_decoder(req.into_body());
    let mut send = Box::pin(async move {{
        loop {{
            let mut msg = {request}::default();
            match decoder.decode(&mut msg).await {{
                Ok(true) => {{
                    if tx.send(msg).await.is_err() {{
                        return Ok(());
                    }}
                }}
                Ok(false) => return Ok(()),
                Err(err) => return Err((tx, tonic::Status::invalid_argument(err.to_string()))),
            }}
        }}
    }});
    // Ok: the request stream ended first. Err: the call finished first.
    let first = tokio::select! {{
        sent = &mut send => Ok(sent),
        response = &mut call => Err(response),
    }};
    let response = match first {{
        Ok(Ok(())) => call.await,
        Ok(Err((tx, status))) => {{
            // Cancel the call while the request stream is still open.
            drop(call);
            drop(tx);
            return Err(status.into());
        }}
        Err(response) => response,
    }};
    let (header, msg, _) = response.map_err(runtime::CallError::from_rpc)?.into_parts();
    Ok((msg, runtime::ServerMetadata::with_header(header)))"
            )?;
        }
        CallShape::Bidirectional => {
            writeln!(
                code,
                "    let (tx, rx) = tokio::sync::mpsc::channel::<{request}>(1);
    let mut decoder = marshaler.new_decoder(req.into_body());
    tokio::spawn(async move {{
        loop {{
            let mut msg = {request}::default();
            match decoder.decode(&mut msg).await {{
                Ok(true) => {{
                    if let Err(err) = tx.send(msg).await {{
                        tracing::info!(\"failed to send request: {{err}}\");
                        break;
                    }}
                }}
                Ok(false) => break,
                Err(err) => {{
                    tracing::info!(\"failed to decode request: {{err}}\");
                    break;
                }}
            }}
        }}
    }});
    let response = client
        .{call}(ctx.outgoing_request(tokio_stream::wrappers::ReceiverStream::new(rx)))
        .await
        .map_err(runtime::CallError::from_rpc)?;
    let (header, stream, _) = response.into_parts();
    Ok((stream, runtime::ServerMetadata::with_header(header)))"
            )?;
        }
    }
    writeln!(code, "}}\n")?;
    Ok(())
}

/// Handler that calls a server implementation in process; unary only
pub(crate) fn emit_local_handler(
    code: &mut String,
    scope: &mut FileScope<'_>,
    service: &ResolvedService,
    method: &ResolvedMethod,
    binding: &ResolvedBinding,
    separator: Separator,
    options: &GeneratorOptions,
) -> Result<()> {
    let names = BindingNames::new(&service.name, &method.name, binding.index);
    let server = scope.server_path(&service.name)?;
    let response = scope.message_path(&method.output)?;

    writeln!(
        code,
        "async fn {}<S: {server}>(
    ctx: &mux::Context,
    marshaler: &mux::Marshaler,
    server: &S,
    req: mux::Request,
    path_params: &mux::PathParams,
) -> Result<({response}, runtime::ServerMetadata), runtime::CallError> {{",
        names.local(),
    )?;
    emit_population(code, scope, &names, method, binding, separator, options)?;
    writeln!(
        code,
        "    let response = server.{}(ctx.incoming_request(proto_req)).await.map_err(runtime::CallError::from_rpc)?;
    let (header, msg, _) = response.into_parts();
    Ok((msg, runtime::ServerMetadata::with_header(header)))
}}
",
        method_ident(&method.name),
    )?;
    Ok(())
}

fn response_type(scope: &mut FileScope<'_>, method: &ResolvedMethod) -> Result<String> {
    let output = scope.message_path(&method.output)?;
    Ok(if call_shape(method).streams_response() { format!("tonic::Streaming<{output}>") } else { output })
}

/// Build `proto_req` from the body, the path parameters and the query string
fn emit_population(
    code: &mut String,
    scope: &mut FileScope<'_>,
    names: &BindingNames,
    method: &ResolvedMethod,
    binding: &ResolvedBinding,
    separator: Separator,
    options: &GeneratorOptions,
) -> Result<()> {
    let request = scope.message_path(&method.input)?;
    let query = requires_query_passthrough(method, binding);
    let mutated = binding.body.is_some() || !binding.path_params.is_empty() || query;

    let parts = if query { "parts" } else { "_parts" };
    let body = if binding.body.is_some() { "body" } else { "_body" };
    writeln!(code, "    let ({parts}, {body}) = req.into_parts();")?;
    if binding.path_params.is_empty() {
        writeln!(code, "    let _ = path_params;")?;
    }
    if binding.body.is_none() {
        writeln!(code, "    let _ = marshaler;")?;
    }
    let binding_kw = if mutated { "let mut" } else { "let" };
    writeln!(code, "    {binding_kw} proto_req = {request}::default();")?;

    if let Some(selector) = &binding.body {
        let target = if selector.is_whole() {
            "&mut proto_req".to_string()
        } else {
            format!("proto_req.{}", presence_chain(selector.field_path.components()))
        };
        writeln!(
            code,
            "    let body = mux::read_all(body).await.map_err({INVALID})?;
    if !body.is_empty() {{
        marshaler.decode(&body, {target}).map_err({INVALID})?;
    }}"
        )?;
        let masked = auto_field_mask(method, binding, options.allow_patch_feature).zip(masked_body(method, binding, options));
        if let Some((mask, body_type)) = masked {
            let mask = field_ident(&mask.name);
            writeln!(
                code,
                "    if proto_req.{mask}.as_ref().map_or(true, |mask| mask.paths.is_empty()) {{
        proto_req.{mask} = Some(runtime::field_mask::from_request_body(&body, &{}).map_err({INVALID})?);
    }}",
                table_name(body_type)
            )?;
        }
    }

    if has_enum_path_param(binding, false) {
        writeln!(code, "    #[allow(unused_mut)]\n    let mut e: i32;")?;
    }
    if has_enum_path_param(binding, true) {
        writeln!(code, "    #[allow(unused_mut)]\n    let mut es: Vec<i32>;")?;
    }
    for param in &binding.path_params {
        emit_path_param(code, scope, param, separator)?;
    }

    if query {
        writeln!(
            code,
            "    let form = mux::parse_form(parts.uri.query()).map_err({INVALID})?;
    mux::populate_query_parameters(&mut proto_req, &form, &{}).map_err({INVALID})?;",
            names.filter,
        )?;
    }
    Ok(())
}

/// Populate one path parameter
fn emit_path_param(code: &mut String, scope: &mut FileScope<'_>, param: &PathParam, separator: Separator) -> Result<()> {
    let key = param.key();
    let mismatch = format!(
        "|err| tonic::Status::invalid_argument(format!(\"type mismatch, parameter: {key}, error: {{err}}\"))"
    );
    writeln!(
        code,
        "    let val = path_params
        .get(\"{key}\")
        .ok_or_else(|| tonic::Status::invalid_argument(\"missing parameter {key}\"))?;"
    )?;

    let sep = escape_str(&separator.as_char().to_string());
    let target = &param.target;
    let optional = target.proto3_optional && !target.is_repeated();

    if param.is_nested() {
        writeln!(code, "    mux::populate_field_from_path(&mut proto_req, \"{key}\", val).map_err({mismatch})?;")?;
    }

    match (&target.field_type, &param.enum_ref) {
        (FieldType::Enum(_), Some(entry)) => {
            let enum_path = scope.enum_path(entry)?;
            let lhs = assignment_target(&param.field_path);
            if param.is_repeated() {
                writeln!(
                    code,
                    "    es = runtime::convert::enum_values(val, \"{sep}\", {enum_path}::from_str_name).map_err({mismatch})?;
    proto_req.{lhs} = es;"
                )?;
            } else {
                let value = if optional { "Some(e)" } else { "e" };
                writeln!(
                    code,
                    "    e = runtime::convert::enum_value(val, {enum_path}::from_str_name).map_err({mismatch})?;
    proto_req.{lhs} = {value};"
                )?;
            }
        }
        (FieldType::Scalar(scalar), _) if !param.is_nested() => {
            let convert = match (scalar, param.is_repeated()) {
                (ScalarType::Bytes, true) => format!("runtime::convert::bytes_repeated(val, \"{sep}\")"),
                (ScalarType::Bytes, false) => "runtime::convert::bytes(val)".to_string(),
                (other, true) => format!("runtime::convert::parse_repeated::<{}>(val, \"{sep}\")", other.rust_type()),
                (other, false) => format!("runtime::convert::parse::<{}>(val)", other.rust_type()),
            };
            let field = field_ident(&target.name);
            if optional {
                writeln!(code, "    proto_req.{field} = Some({convert}.map_err({mismatch})?);")?;
            } else {
                writeln!(code, "    proto_req.{field} = {convert}.map_err({mismatch})?;")?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// `a.get_or_insert_with(Default::default)…` through `parents`, which must
/// all be singular messages
fn presence_chain(parents: &[FieldPathComponent]) -> String {
    parents
        .iter()
        .map(|c| format!("{}.get_or_insert_with(Default::default)", field_ident(c.name())))
        .collect::<Vec<_>>()
        .join(".")
}

/// Place expression for the last component of `path`, creating parents
fn assignment_target(path: &FieldPath) -> String {
    match path.components().split_last() {
        Some((last, [])) => field_ident(last.name()),
        Some((last, parents)) => format!("{}.{}", presence_chain(parents), field_ident(last.name())),
        None => String::new(),
    }
}
