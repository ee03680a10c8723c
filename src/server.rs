//! Server Assembly
//!
//! [`McpServerBuilder`] is the main entry point: register tools, resources,
//! prompts, middleware, and client callbacks with fluent chaining, then
//! `build()` an [`McpServer`] and run it over stdio or HTTP.

use {
    crate::{
        elicitation::{ElicitationCallback, ElicitationResult},
        error::McpResult,
        handler::{HandlerInner, McpRequestHandler},
        http,
        middleware::{Middleware, MiddlewarePipeline},
        prompts::{Prompt, PromptManager},
        protocol::McpProtocol,
        resources::{Resource, ResourceManager},
        sampling::SamplingCallback,
        tools::{Tool, ToolManager},
        transform::TransformedTool,
        transport,
    },
    anyhow::Result,
    serde_json::Value,
    std::{future::Future, sync::Arc},
    tracing::info,
};

/// Fluent builder for an MCP server instance.
///
/// # Examples
///
/// ```rust,no_run
/// use forgemcp::{McpServerBuilder, Tool};
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() -> forgemcp::McpResult<()> {
/// let add = Tool::new(
///     "add",
///     json!({
///         "type": "object",
///         "properties": {
///             "a": { "type": "number" },
///             "b": { "type": "number" }
///         },
///         "required": ["a", "b"]
///     }),
///     |args, _ctx| async move {
///         let a = args["a"].as_f64().unwrap_or(0.0);
///         let b = args["b"].as_f64().unwrap_or(0.0);
///         Ok(json!(a + b))
///     },
/// )?
/// .with_description("Add two numbers");
///
/// let server = McpServerBuilder::new("calculator", "1.0.0")
///     .with_tool(add)
///     .build()?;
///
/// server.run_stdio().await
/// # }
/// ```
pub struct McpServerBuilder {
    name: String,
    version: String,
    tools: Vec<Tool>,
    resources: Vec<Resource>,
    prompts: Vec<Prompt>,
    pipeline: MiddlewarePipeline,
    elicitation: Option<Arc<ElicitationCallback>>,
    sampling: Option<Arc<SamplingCallback>>,
}

impl McpServerBuilder {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            tools: Vec::new(),
            resources: Vec::new(),
            prompts: Vec::new(),
            pipeline: MiddlewarePipeline::new(),
            elicitation: None,
            sampling: None,
        }
    }

    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    /// Register a derived tool alongside (or instead of) its source.
    pub fn with_transformed_tool(mut self, tool: TransformedTool) -> Self {
        self.tools.push(tool.into_tool());
        self
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn with_prompt(mut self, prompt: Prompt) -> Self {
        self.prompts.push(prompt);
        self
    }

    /// Append a middleware; the first added runs outermost.
    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.pipeline.add(middleware);
        self
    }

    /// Install the callback that carries elicitation requests to the client.
    pub fn with_elicitation_callback<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(String, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ElicitationResult>> + Send + 'static,
    {
        self.elicitation = Some(Arc::new(
            move |message, schema| -> futures_util::future::BoxFuture<'static, Result<ElicitationResult>> {
                Box::pin(callback(message, schema))
            },
        ));
        self
    }

    /// Install the callback that serves sampling requests; build one with
    /// [`sampling_callback`](crate::sampling::sampling_callback).
    pub fn with_sampling_callback(mut self, callback: Arc<SamplingCallback>) -> Self {
        self.sampling = Some(callback);
        self
    }

    /// Assemble the server. Duplicate tool, resource, or prompt names are
    /// rejected here.
    pub fn build(self) -> McpResult<McpServer> {
        let tools = ToolManager::new();
        for tool in self.tools {
            tools.register(tool)?;
        }
        let resources = ResourceManager::new();
        for resource in self.resources {
            resources.register(resource)?;
        }
        let prompts = PromptManager::new();
        for prompt in self.prompts {
            prompts.register(prompt)?;
        }

        info!(
            "🏗️  Assembled MCP server '{}' v{} ({} tools, {} resources, {} prompts)",
            self.name,
            self.version,
            tools.len(),
            resources.len(),
            prompts.len()
        );

        let handler = McpRequestHandler::from_inner(HandlerInner {
            protocol: McpProtocol::new(self.name.clone(), self.version.clone()),
            tools: Arc::new(tools),
            resources: Arc::new(resources),
            prompts: Arc::new(prompts),
            pipeline: self.pipeline,
            elicitation: self.elicitation,
            sampling: self.sampling,
        });

        Ok(McpServer {
            name: self.name,
            version: self.version,
            handler,
        })
    }
}

/// An assembled MCP server: a request handler plus transport entry points.
pub struct McpServer {
    name: String,
    version: String,
    handler: McpRequestHandler,
}

impl McpServer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The request handler, for driving the server without a transport.
    pub fn handler(&self) -> &McpRequestHandler {
        &self.handler
    }

    /// Handle one JSON-RPC message directly.
    pub async fn handle(&self, message: Value) -> McpResult<Option<Value>> {
        self.handler.handle(message).await
    }

    /// Serve newline-delimited JSON-RPC over stdin/stdout until EOF.
    pub async fn run_stdio(&self) -> McpResult<()> {
        info!("🚀 MCP server '{}' v{} on stdio", self.name, self.version);
        transport::run_stdio(&self.handler).await
    }

    /// Serve JSON-RPC over HTTP POST on the given port.
    pub async fn serve_http(&self, port: u16) {
        info!("🚀 MCP server '{}' v{} on port {}", self.name, self.version, port);
        http::serve(self.handler.clone(), port).await
    }
}
