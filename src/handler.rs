//! MCP Request Handler
//!
//! The JSON-RPC dispatcher: one [`McpRequestHandler`] per server instance,
//! borrowing the registries for the process lifetime. Every incoming message
//! is wrapped in a [`MiddlewareContext`] and pushed through the pipeline;
//! the innermost terminal routes to the per-method handlers below and
//! assembles a complete JSON-RPC response.
//!
//! Protocol-level failures (unknown method, bad params, missing entities)
//! become error *responses* inside the terminal. Anything else surfaces as
//! an `Err` out of the pipeline, where [`ErrorHandlingMiddleware`] — when
//! installed — turns it into a `-32603` response.
//!
//! [`ErrorHandlingMiddleware`]: crate::middleware::ErrorHandlingMiddleware

use {
    crate::{
        context::ToolContext,
        elicitation::ElicitationCallback,
        error::{McpError, McpResult},
        middleware::{terminal_fn, MessageKind, MiddlewareContext, MiddlewarePipeline},
        prompts::PromptManager,
        protocol::McpProtocol,
        resources::ResourceManager,
        sampling::SamplingCallback,
        tools::{check_arguments, ToolManager},
    },
    serde_json::{json, Value},
    std::sync::Arc,
    tracing::{debug, error},
};

pub(crate) struct HandlerInner {
    pub protocol: McpProtocol,
    pub tools: Arc<ToolManager>,
    pub resources: Arc<ResourceManager>,
    pub prompts: Arc<PromptManager>,
    pub pipeline: MiddlewarePipeline,
    pub elicitation: Option<Arc<ElicitationCallback>>,
    pub sampling: Option<Arc<SamplingCallback>>,
}

/// JSON-RPC dispatcher implementing the MCP methods over the registries.
#[derive(Clone)]
pub struct McpRequestHandler {
    inner: Arc<HandlerInner>,
}

impl McpRequestHandler {
    pub(crate) fn from_inner(inner: HandlerInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Handle one JSON-RPC message.
    ///
    /// Returns `Ok(Some(response))` for requests, `Ok(None)` for
    /// notifications (which are dispatched but produce no response bytes),
    /// and `Err` when a failure escapes the pipeline untranslated — the
    /// transport should fail the connection in that case.
    pub async fn handle(&self, message: Value) -> McpResult<Option<Value>> {
        if !message.is_object() || message.get("method").and_then(Value::as_str).is_none() {
            error!("Rejecting malformed JSON-RPC message");
            let id = message.get("id").cloned();
            return Ok(Some(
                McpError::InvalidRequest("missing method".to_string()).to_json_rpc_error(id),
            ));
        }

        let ctx = MiddlewareContext::from_message(&message);
        debug!(
            "📥 Dispatching method '{}' (id: {:?})",
            ctx.method, ctx.request_id
        );

        let inner = Arc::clone(&self.inner);
        let terminal = terminal_fn(move |ctx: MiddlewareContext| {
            let inner = Arc::clone(&inner);
            async move { dispatch(&inner, &ctx).await }
        });

        let response = self.inner.pipeline.execute(&ctx, &terminal).await?;
        match ctx.kind {
            MessageKind::Notification => Ok(None),
            MessageKind::Request => Ok(Some(response)),
        }
    }
}

/// The pipeline terminal: route to the per-method handler and assemble a
/// full JSON-RPC response.
async fn dispatch(inner: &HandlerInner, ctx: &MiddlewareContext) -> McpResult<Value> {
    let id = ctx.message.get("id").cloned().unwrap_or(Value::Null);
    let params = ctx
        .message
        .get("params")
        .cloned()
        .unwrap_or_else(|| json!({}));

    let result = match ctx.method.as_str() {
        "initialize" => Ok(inner.protocol.create_initialize_result()),
        "ping" => Ok(json!({})),
        "notifications/initialized" => Ok(json!({})),
        "tools/list" => handle_tools_list(inner),
        "tools/call" => handle_tool_call(inner, &params, ctx).await,
        "resources/list" => handle_resources_list(inner),
        "resources/read" => handle_resource_read(inner, &params).await,
        "prompts/list" => handle_prompts_list(inner),
        "prompts/get" => handle_prompt_get(inner, &params),
        other => Err(McpError::UnknownMethod(other.to_string())),
    };

    match result {
        Ok(value) => Ok(inner.protocol.create_success_response(id, value)),
        // Internal-class failures escape to the middleware; protocol-level
        // failures are themselves valid responses.
        Err(e) if e.error_code() == -32603 => Err(e),
        Err(e) => Ok(e.to_json_rpc_error(Some(id))),
    }
}

fn handle_tools_list(inner: &HandlerInner) -> McpResult<Value> {
    let tools: Vec<Value> = inner
        .tools
        .list()
        .iter()
        .map(|tool| tool.to_descriptor())
        .collect();
    Ok(json!({ "tools": tools }))
}

async fn handle_tool_call(
    inner: &HandlerInner,
    params: &Value,
    ctx: &MiddlewareContext,
) -> McpResult<Value> {
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| McpError::InvalidParams("missing tool name".to_string()))?;
    let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
    if !arguments.is_object() {
        return Err(McpError::InvalidParams(
            "arguments must be an object".to_string(),
        ));
    }

    let tool = inner.tools.get(name)?;
    check_arguments(&tool.input_schema, &arguments)?;

    let tool_ctx = ToolContext::new(
        Arc::clone(&inner.resources),
        Arc::clone(&inner.prompts),
        inner.elicitation.clone(),
        inner.sampling.clone(),
        ctx.request_id.clone(),
    );

    debug!("🛠️  Invoking tool '{}'", name);
    match tool.invoke(arguments, tool_ctx).await {
        Ok(value) => wrap_tool_result(value),
        // A failing tool is a successful protocol response describing the
        // failure, never a JSON-RPC error.
        Err(e) => {
            error!("Tool '{}' failed: {}", name, e);
            Ok(json!({
                "content": [{ "type": "text", "text": e.to_string() }],
                "isError": true,
            }))
        }
    }
}

/// Wrap a tool return into MCP content form. Results that already carry a
/// `content` array pass through verbatim; strings become their raw text;
/// everything else is serialized compactly.
fn wrap_tool_result(value: Value) -> McpResult<Value> {
    if value
        .get("content")
        .is_some_and(Value::is_array)
    {
        return Ok(value);
    }
    let text = match value {
        Value::String(s) => s,
        other => serde_json::to_string(&other)?,
    };
    Ok(json!({ "content": [{ "type": "text", "text": text }] }))
}

fn handle_resources_list(inner: &HandlerInner) -> McpResult<Value> {
    let resources: Vec<Value> = inner
        .resources
        .list()
        .iter()
        .map(|resource| resource.to_descriptor())
        .collect();
    Ok(json!({ "resources": resources }))
}

async fn handle_resource_read(inner: &HandlerInner, params: &Value) -> McpResult<Value> {
    let uri = params
        .get("uri")
        .and_then(Value::as_str)
        .ok_or_else(|| McpError::InvalidParams("missing resource uri".to_string()))?;

    let resource = inner.resources.get(uri)?;
    let content = resource.read().await?;
    Ok(json!({ "contents": [content.to_json()] }))
}

fn handle_prompts_list(inner: &HandlerInner) -> McpResult<Value> {
    let prompts: Vec<Value> = inner
        .prompts
        .list()
        .iter()
        .map(|prompt| prompt.to_descriptor())
        .collect();
    Ok(json!({ "prompts": prompts }))
}

fn handle_prompt_get(inner: &HandlerInner, params: &Value) -> McpResult<Value> {
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| McpError::InvalidParams("missing prompt name".to_string()))?;

    let prompt = inner.prompts.get(name)?;
    let messages: Vec<Value> = prompt
        .render(params.get("arguments"))?
        .iter()
        .map(|message| message.to_json())
        .collect();
    Ok(json!({ "messages": messages }))
}
