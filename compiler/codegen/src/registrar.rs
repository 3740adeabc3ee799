//! Registration functions and the trailer block.
//!
//! Every service gets four entry points: in-process registration against a
//! server implementation, registration against a client stub, registration
//! against an open channel, and registration that dials an endpoint. The
//! remote ones share a private registration over a `runtime::SharedClient`,
//! which routes check a stub out of per request. The trailer then declares
//! the response-body wrappers, compiled patterns and forwarder aliases the
//! registrations refer to.

use std::fmt::Write as _;

use analysis::classifier::{call_shape, supports_local};
use analysis::{ResolvedBinding, ResolvedMethod, ResolvedService};
use ir::FieldPath;

use crate::handler::BindingNames;
use crate::scope::FileScope;
use crate::utils::{escape_str, field_ident, pascal_to_snake_case};
use crate::{GeneratorOptions, Result};

/// How long a dialed connection may sit unused before it is closed
pub(crate) const CONN_IDLE_LIFETIME: &str =
    "const CONN_IDLE_LIFETIME: time::Duration = time::Duration::from_secs(24 * 60 * 60);\n";

/// Which handler a registration wires in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Local,
    Remote,
}

fn register_name(service: &ResolvedService, options: &GeneratorOptions, kind: &str) -> String {
    format!("register_{}_{}{kind}", pascal_to_snake_case(&service.name), options.register_fn_suffix)
}

/// The four registration functions of one service
pub(crate) fn emit_registrars(
    code: &mut String,
    scope: &mut FileScope<'_>,
    service: &ResolvedService,
    options: &GeneratorOptions,
) -> Result<()> {
    let server = scope.server_path(&service.name)?;
    let client = scope.client_path(&service.name)?;
    let server_fn = register_name(service, options, "_server");
    let client_fn = register_name(service, options, "_client");
    let conn_fn = register_name(service, options, "");
    let endpoint_fn = register_name(service, options, "_from_endpoint");
    let shared_fn = register_name(service, options, "_shared_client");
    let prologue = if options.use_request_context {
        "    let _ = ctx;\n    let gw = serve_mux.gateway();"
    } else {
        "    let gw = serve_mux.gateway();"
    };

    writeln!(
        code,
        "/// Registers the HTTP handlers for service {svc} on `serve_mux`.
///
/// Unary calls go straight to `server`. Streaming calls answer with an
/// unimplemented status.
pub fn {server_fn}<S: {server}>(
    ctx: &mux::Context,
    serve_mux: &mut mux::ServeMux,
    server: sync::Arc<S>,
) -> Result<(), mux::Error> {{
{prologue}",
        svc = service.name,
    )?;
    for method in &service.methods {
        for binding in &method.bindings {
            if supports_local(method) {
                emit_route(code, service, method, binding, Target::Local, options)?;
            } else {
                emit_unimplemented_route(code, service, method, binding, options)?;
            }
        }
    }
    writeln!(code, "    Ok(())\n}}\n")?;

    writeln!(
        code,
        "/// Registers the HTTP handlers for service {svc} on `serve_mux`, forwarding
/// requests through `client`.
pub fn {client_fn}(
    ctx: &mux::Context,
    serve_mux: &mut mux::ServeMux,
    client: {client},
) -> Result<(), mux::Error> {{
    {shared_fn}(ctx, serve_mux, runtime::SharedClient::new(client))
}}

fn {shared_fn}(
    ctx: &mux::Context,
    serve_mux: &mut mux::ServeMux,
    client: runtime::SharedClient<{client}>,
) -> Result<(), mux::Error> {{
{prologue}",
        svc = service.name,
    )?;
    for method in &service.methods {
        for binding in &method.bindings {
            emit_route(code, service, method, binding, Target::Remote, options)?;
        }
    }
    writeln!(code, "    Ok(())\n}}\n")?;

    writeln!(
        code,
        "/// Registers the HTTP handlers for service {svc} on `serve_mux`, calling
/// over `conn`.
pub fn {conn_fn}(
    ctx: &mux::Context,
    serve_mux: &mut mux::ServeMux,
    conn: grpc_transport::Channel,
) -> Result<(), mux::Error> {{
    {client_fn}(ctx, serve_mux, <{client}>::new(conn))
}}

/// Dials `endpoint` and registers the HTTP handlers for service {svc}.
///
/// The connection is closed after `CONN_IDLE_LIFETIME` without calls and
/// redialed on the next one. It is released for good when `ctx` is
/// cancelled.
pub async fn {endpoint_fn}(
    ctx: &mux::Context,
    serve_mux: &mut mux::ServeMux,
    endpoint: grpc_transport::Endpoint,
) -> Result<(), mux::Error> {{
    let channel = endpoint.connect().await?;
    let client = runtime::SharedClient::dialed(<{client}>::new(channel), CONN_IDLE_LIFETIME, move || {{
        <{client}>::new(endpoint.connect_lazy())
    }});
    if let Err(err) = {shared_fn}(ctx, serve_mux, client.clone()) {{
        client.release();
        return Err(err);
    }}
    let ctx = ctx.clone();
    tokio::spawn(async move {{
        client.supervise(ctx.cancelled()).await;
        tracing::debug!(\"released connection for {qualified}\");
    }});
    Ok(())
}}
",
        svc = service.name,
        qualified = escape_str(&service.qualified_name()),
    )?;
    Ok(())
}

/// Context binding inside the per-request closure
fn request_context(options: &GeneratorOptions) -> &'static str {
    if options.use_request_context {
        "mux::Context::from_request(&req)"
    } else {
        "ctx.child()"
    }
}

fn emit_route(
    code: &mut String,
    service: &ResolvedService,
    method: &ResolvedMethod,
    binding: &ResolvedBinding,
    target: Target,
    options: &GeneratorOptions,
) -> Result<()> {
    let names = BindingNames::new(&service.name, &method.name, binding.index);
    let (handle, handler, annotate) = match target {
        Target::Local => ("server", names.local(), "annotate_incoming_context"),
        Target::Remote => ("client", names.remote(), "annotate_context"),
    };
    let handle_arg = match target {
        Target::Local => "&*server",
        Target::Remote => "&mut client",
    };
    let rebind = match target {
        Target::Local => "let server = server.clone();",
        Target::Remote => "let client = client.clone();",
    };
    let checkout = match target {
        Target::Local => "",
        Target::Remote => {
            "
                let mut client = match client.get() {
                    Ok(client) => client,
                    Err(status) => return mux::http_error(&ctx, &gw, &outbound, status),
                };"
        }
    };
    let outer_ctx = if options.use_request_context { "" } else { "\n        let ctx = ctx.clone();" };
    let resp = if binding.response_body.is_none() {
        "resp".to_string()
    } else if call_shape(method).streams_response() {
        format!("tokio_stream::StreamExt::map(resp, |res| res.map({}))", names.wrapper)
    } else {
        format!("{}(resp)", names.wrapper)
    };

    writeln!(
        code,
        "    serve_mux.handle(http::Method::{verb}, &{pattern}, {{{outer_ctx}
        let gw = gw.clone();
        let {handle} = {handle}.clone();
        move |req: mux::Request, path_params: mux::PathParams| {{
            let ctx = {context};
            let gw = gw.clone();
            {rebind}
            async move {{
                let (inbound, outbound) = mux::marshaler_for_request(&gw, &req);
                let ctx = match mux::{annotate}(&ctx, &gw, &req, \"/{qualified}/{rpc}\", \"{template}\") {{
                    Ok(ctx) => ctx,
                    Err(status) => return mux::http_error(&ctx, &gw, &outbound, status),
                }};{checkout}
                match {handler}(&ctx, &inbound, {handle_arg}, req, &path_params).await {{
                    Ok((resp, metadata)) => {{
                        let ctx = ctx.with_server_metadata(metadata);
                        {forward}(&ctx, &gw, &outbound, {resp})
                    }}
                    Err(runtime::CallError {{ status, metadata }}) => {{
                        let ctx = ctx.with_server_metadata(metadata);
                        mux::http_error(&ctx, &gw, &outbound, status)
                    }}
                }}
            }}
        }}
    }})?;",
        verb = binding.http_method.as_str(),
        pattern = names.pattern,
        context = request_context(options),
        qualified = escape_str(&service.qualified_name()),
        rpc = escape_str(&method.name),
        template = escape_str(&binding.path_template.template),
        forward = names.forward,
    )?;
    Ok(())
}

fn emit_unimplemented_route(
    code: &mut String,
    service: &ResolvedService,
    method: &ResolvedMethod,
    binding: &ResolvedBinding,
    options: &GeneratorOptions,
) -> Result<()> {
    let names = BindingNames::new(&service.name, &method.name, binding.index);
    let outer_ctx = if options.use_request_context { "" } else { "\n        let ctx = ctx.clone();" };
    writeln!(
        code,
        "    serve_mux.handle(http::Method::{verb}, &{pattern}, {{{outer_ctx}
        let gw = gw.clone();
        move |req: mux::Request, _path_params: mux::PathParams| {{
            let ctx = {context};
            let gw = gw.clone();
            async move {{
                let (_, outbound) = mux::marshaler_for_request(&gw, &req);
                let status = tonic::Status::unimplemented(
                    \"streaming calls are not yet supported in the in-process transport\",
                );
                mux::http_error(&ctx, &gw, &outbound, status)
            }}
        }}
    }})?;",
        verb = binding.http_method.as_str(),
        pattern = names.pattern,
        context = request_context(options),
    )?;
    Ok(())
}

/// Response-body wrappers, compiled patterns and forwarder aliases
pub(crate) fn emit_trailer(code: &mut String, scope: &mut FileScope<'_>, service: &ResolvedService) -> Result<()> {
    for method in &service.methods {
        for binding in &method.bindings {
            let Some(path) = &binding.response_body else {
                continue;
            };
            let names = BindingNames::new(&service.name, &method.name, binding.index);
            let output = scope.message_path(&method.output)?;
            writeln!(
                code,
                "struct {wrapper}({output});

impl mux::ResponseBody for {wrapper} {{
    fn response_body(&self) -> Box<dyn mux::Marshal + '_> {{
        Box::new({selector})
    }}
}}
",
                wrapper = names.wrapper,
                selector = response_selector(path),
            )?;
        }
    }

    for method in &service.methods {
        for binding in &method.bindings {
            let names = BindingNames::new(&service.name, &method.name, binding.index);
            let template = &binding.path_template;
            let ops: Vec<String> = template.op_codes.iter().map(i32::to_string).collect();
            let pool: Vec<String> = template.pool.iter().map(|p| format!("\"{}\"", escape_str(p))).collect();
            writeln!(
                code,
                "const {}: mux::PatternSpec = mux::PatternSpec {{
    version: {},
    ops: &[{}],
    pool: &[{}],
    verb: \"{}\",
}};
",
                names.pattern,
                template.version,
                ops.join(", "),
                pool.join(", "),
                escape_str(&template.verb),
            )?;
        }
    }

    for method in &service.methods {
        let forwarder =
            if call_shape(method).streams_response() { "forward_response_stream" } else { "forward_response_message" };
        for binding in &method.bindings {
            let names = BindingNames::new(&service.name, &method.name, binding.index);
            writeln!(code, "use mux::{forwarder} as {};", names.forward)?;
        }
    }
    writeln!(code)?;
    Ok(())
}

/// Borrow of the response sub-field selected by `path`
fn response_selector(path: &FieldPath) -> String {
    match path.components().split_last() {
        Some((last, [])) => format!("&self.0.{}", field_ident(last.name())),
        Some((last, parents)) => {
            let mut expr = format!("self.0.{}.as_ref()", field_ident(parents[0].name()));
            for parent in &parents[1..] {
                expr.push_str(&format!(".and_then(|v| v.{}.as_ref())", field_ident(parent.name())));
            }
            expr.push_str(&format!(".map(|v| &v.{})", field_ident(last.name())));
            expr
        }
        None => "&self.0".to_string(),
    }
}
