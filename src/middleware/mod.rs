//! Middleware Pipeline
//!
//! Composable request/response interception between the transport and the
//! method terminal. A [`MiddlewarePipeline`] chains [`Middleware`] values in
//! registration order: the first added runs outermost, seeing the request
//! first and the response last. Each middleware receives the
//! [`MiddlewareContext`] and a [`Next`] handle; it may short-circuit by not
//! calling `next`, post-process the result, or return an error.
//!
//! Hook dispatch inside a middleware goes method-specific hook, then the
//! request/notification hook, then `on_message`, each defaulting to the
//! next. Override `on_message` to observe every message, or a method hook
//! to intercept just one operation.

pub mod builtin;

pub use builtin::{
    CacheConfig, CacheStats, CachingMiddleware, ErrorHandlingMiddleware, ErrorObserver, LogSink,
    LoggingMiddleware, RateLimitConfig, RateLimitingMiddleware, TimingMiddleware, TimingStats,
};

use {
    crate::error::McpResult,
    async_trait::async_trait,
    futures_util::future::BoxFuture,
    serde_json::Value,
    std::{future::Future, sync::Arc, time::Instant},
};

/// Message origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSource {
    Client,
    Server,
}

/// Request/notification discriminator: notifications carry no id and get no
/// response bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Request,
    Notification,
}

/// Context threaded through the middleware chain for one message.
///
/// `Clone` produces a deep, independent copy.
#[derive(Debug, Clone)]
pub struct MiddlewareContext {
    /// The full JSON-RPC message.
    pub message: Value,
    /// MCP method name (e.g. `tools/call`).
    pub method: String,
    pub source: MessageSource,
    pub kind: MessageKind,
    /// Monotonic instant at pipeline entry.
    pub timestamp: Instant,
    /// Request id, stringified, when present.
    pub request_id: Option<String>,
    /// Tool name for `tools/call`.
    pub tool_name: Option<String>,
    /// Resource URI for `resources/read`.
    pub resource_uri: Option<String>,
    /// Prompt name for `prompts/get`.
    pub prompt_name: Option<String>,
}

impl MiddlewareContext {
    pub fn new(method: impl Into<String>, message: Value) -> Self {
        Self {
            message,
            method: method.into(),
            source: MessageSource::Client,
            kind: MessageKind::Request,
            timestamp: Instant::now(),
            request_id: None,
            tool_name: None,
            resource_uri: None,
            prompt_name: None,
        }
    }

    /// Build a context from a raw JSON-RPC message, extracting the method,
    /// id, and any tool/resource/prompt identifier the method names.
    pub fn from_message(message: &Value) -> Self {
        let method = message
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let request_id = match message.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let kind = if message.get("id").is_some() {
            MessageKind::Request
        } else {
            MessageKind::Notification
        };

        let params = message.get("params");
        let param_str = |key: &str| -> Option<String> {
            params
                .and_then(|p| p.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let mut ctx = Self::new(method, message.clone());
        ctx.kind = kind;
        ctx.request_id = request_id;
        match ctx.method.as_str() {
            "tools/call" => ctx.tool_name = param_str("name"),
            "resources/read" => ctx.resource_uri = param_str("uri"),
            "prompts/get" => ctx.prompt_name = param_str("name"),
            _ => {}
        }
        ctx
    }
}

/// The innermost callable of a pipeline run. It receives its own deep copy
/// of the context and returns a complete JSON-RPC response; it never maps
/// its own failures to JSON-RPC errors — that is middleware's job.
pub type Terminal = Arc<dyn Fn(MiddlewareContext) -> BoxFuture<'static, McpResult<Value>> + Send + Sync>;

/// Build a [`Terminal`] from an async closure.
pub fn terminal_fn<F, Fut>(f: F) -> Terminal
where
    F: Fn(MiddlewareContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = McpResult<Value>> + Send + 'static,
{
    Arc::new(move |ctx| -> BoxFuture<'static, McpResult<Value>> { Box::pin(f(ctx)) })
}

/// The remainder of the chain after the current middleware.
pub struct Next<'a> {
    rest: &'a [Arc<dyn Middleware>],
    terminal: &'a Terminal,
}

impl Next<'_> {
    /// Run the rest of the chain, ending at the terminal.
    pub async fn run(self, ctx: &MiddlewareContext) -> McpResult<Value> {
        match self.rest.split_first() {
            Some((middleware, rest)) => {
                middleware
                    .handle(
                        ctx,
                        Next {
                            rest,
                            terminal: self.terminal,
                        },
                    )
                    .await
            }
            None => (self.terminal)(ctx.clone()).await,
        }
    }
}

/// A single interceptor in the pipeline.
///
/// The entry point is [`handle`](Middleware::handle), whose default
/// implementation dispatches to the hook matching `ctx.method`, falling
/// back through the type hooks to [`on_message`](Middleware::on_message).
/// A middleware must not retain the context beyond the call.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: &MiddlewareContext, next: Next<'_>) -> McpResult<Value> {
        match ctx.method.as_str() {
            "initialize" => self.on_initialize(ctx, next).await,
            "tools/call" => self.on_call_tool(ctx, next).await,
            "tools/list" => self.on_list_tools(ctx, next).await,
            "resources/read" => self.on_read_resource(ctx, next).await,
            "resources/list" => self.on_list_resources(ctx, next).await,
            "prompts/get" => self.on_get_prompt(ctx, next).await,
            "prompts/list" => self.on_list_prompts(ctx, next).await,
            _ => match ctx.kind {
                MessageKind::Request => self.on_request(ctx, next).await,
                MessageKind::Notification => self.on_notification(ctx, next).await,
            },
        }
    }

    // Method-specific hooks; each defaults to the request hook.
    async fn on_initialize(&self, ctx: &MiddlewareContext, next: Next<'_>) -> McpResult<Value> {
        self.on_request(ctx, next).await
    }

    async fn on_call_tool(&self, ctx: &MiddlewareContext, next: Next<'_>) -> McpResult<Value> {
        self.on_request(ctx, next).await
    }

    async fn on_list_tools(&self, ctx: &MiddlewareContext, next: Next<'_>) -> McpResult<Value> {
        self.on_request(ctx, next).await
    }

    async fn on_read_resource(&self, ctx: &MiddlewareContext, next: Next<'_>) -> McpResult<Value> {
        self.on_request(ctx, next).await
    }

    async fn on_list_resources(
        &self,
        ctx: &MiddlewareContext,
        next: Next<'_>,
    ) -> McpResult<Value> {
        self.on_request(ctx, next).await
    }

    async fn on_get_prompt(&self, ctx: &MiddlewareContext, next: Next<'_>) -> McpResult<Value> {
        self.on_request(ctx, next).await
    }

    async fn on_list_prompts(&self, ctx: &MiddlewareContext, next: Next<'_>) -> McpResult<Value> {
        self.on_request(ctx, next).await
    }

    // Type hooks; each defaults to the generic hook.
    async fn on_request(&self, ctx: &MiddlewareContext, next: Next<'_>) -> McpResult<Value> {
        self.on_message(ctx, next).await
    }

    async fn on_notification(&self, ctx: &MiddlewareContext, next: Next<'_>) -> McpResult<Value> {
        self.on_message(ctx, next).await
    }

    /// Ultimate fallback; defaults to calling the rest of the chain.
    async fn on_message(&self, ctx: &MiddlewareContext, next: Next<'_>) -> McpResult<Value> {
        next.run(ctx).await
    }
}

/// Ordered middleware chain. First added runs outermost.
#[derive(Default)]
pub struct MiddlewarePipeline {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl MiddlewarePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware; execution order is the order of addition.
    pub fn add(&mut self, middleware: Arc<dyn Middleware>) {
        self.middleware.push(middleware);
    }

    /// Run the chain around `terminal` for one message.
    pub async fn execute(&self, ctx: &MiddlewareContext, terminal: &Terminal) -> McpResult<Value> {
        Next {
            rest: &self.middleware,
            terminal,
        }
        .run(ctx)
        .await
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }
}
