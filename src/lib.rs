//! # ForgeMCP - Embeddable MCP Server Framework
//!
//! ForgeMCP is a Rust toolkit for building
//! [Model Context Protocol (MCP)](https://modelcontextprotocol.io) servers:
//! expose **tools**, **resources**, and **prompts** to a client over
//! JSON-RPC 2.0, and broker elicitation and sampling round-trips back
//! through that client.
//!
//! ## Key Features
//!
//! - **Composable middleware**: logging, timing, LRU caching, token-bucket
//!   rate limiting, and uniform error translation, chained in onion order
//! - **Declarative tool transformation**: derive a new tool from an existing
//!   one by renaming, hiding, defaulting, or re-typing its arguments
//! - **Bidirectional capabilities**: elicitation forms and client-side LLM
//!   sampling, with schema normalization built in
//! - **Transport agnostic**: newline-delimited stdio and HTTP POST bridges
//!   over the same handler
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use forgemcp::{McpServerBuilder, Tool};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> forgemcp::McpResult<()> {
//!     let add = Tool::new(
//!         "add",
//!         json!({
//!             "type": "object",
//!             "properties": {
//!                 "a": { "type": "number" },
//!                 "b": { "type": "number" }
//!             },
//!             "required": ["a", "b"]
//!         }),
//!         |args, _ctx| async move {
//!             let a = args["a"].as_f64().unwrap_or(0.0);
//!             let b = args["b"].as_f64().unwrap_or(0.0);
//!             Ok(json!(a + b))
//!         },
//!     )?
//!     .with_description("Add two numbers");
//!
//!     McpServerBuilder::new("calculator", "1.0.0")
//!         .with_tool(add)
//!         .build()?
//!         .run_stdio()
//!         .await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Transport Layer              │  ← stdio line loop / HTTP bridge
//! ├─────────────────────────────────────────┤
//! │          Middleware Pipeline            │  ← onion-ordered interceptors
//! ├─────────────────────────────────────────┤
//! │            Request Handler              │  ← JSON-RPC method dispatch
//! ├─────────────────────────────────────────┤
//! │   Registries (tools/resources/prompts)  │  ← name → entity maps
//! └─────────────────────────────────────────┘
//! ```
//!
//! A transport delivers one JSON-RPC frame to the handler, which wraps it
//! in a [`MiddlewareContext`] and runs it through the pipeline. The
//! innermost terminal consults the registries, invokes the tool function
//! with a fresh [`ToolContext`], and assembles the response.
//!
//! ## Error Handling
//!
//! Protocol-level failures (`-32600`/`-32601`/`-32602`) are ordinary
//! responses assembled by the dispatcher. Everything else propagates as
//! [`McpError`] until [`ErrorHandlingMiddleware`] — conventionally the first
//! middleware added — translates it into a `-32603` response. A failing
//! tool function is neither: it becomes a successful `tools/call` response
//! with `isError: true`, per MCP convention.

// Internal modules (not exposed)
mod context;
mod elicitation;
mod error;
mod handler;
mod http;
mod logging;
mod middleware;
mod prompts;
mod protocol;
mod resources;
mod sampling;
mod server;
mod tools;
mod transform;
mod transport;

// Test modules
#[cfg(test)]
mod tests;

// === PUBLIC API ===
// Keep this minimal and stable!

// Server assembly
pub use crate::server::{McpServer, McpServerBuilder};

// Request handling
pub use crate::handler::McpRequestHandler;

// Registries and their entities
pub use crate::prompts::{Prompt, PromptArgument, PromptManager, PromptMessage};
pub use crate::resources::{
    Resource, ResourceBody, ResourceContent, ResourceKind, ResourceManager,
};
pub use crate::tools::{Icon, Tool, ToolFn, ToolManager};

// Tool transformation
pub use crate::transform::{ArgTransform, TransformedTool};

// Per-request context and client capabilities
pub use crate::context::ToolContext;
pub use crate::elicitation::{
    build_elicitation_schema, validate_elicitation_schema, ElicitationCallback, ElicitationResult,
};
pub use crate::sampling::{
    sampling_callback, text_result, SamplingCallback, SamplingReply, CLIENT_MODEL,
};

// Middleware
pub use crate::middleware::{
    terminal_fn, CacheConfig, CacheStats, CachingMiddleware, ErrorHandlingMiddleware,
    ErrorObserver, LogSink, LoggingMiddleware, MessageKind, MessageSource, Middleware,
    MiddlewareContext, MiddlewarePipeline, Next, RateLimitConfig, RateLimitingMiddleware,
    Terminal, TimingMiddleware, TimingStats,
};

// Protocol constants and framing
pub use crate::protocol::{
    parse_error_response, McpProtocol, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION,
};

// Transports
pub use crate::logging::{ConnectionId, ConnectionLogger};
pub use crate::transport::{run_stdio, transport_fn, TransportFn};

// Error types
pub use crate::error::{McpError, McpResult};

// Re-export commonly used dependencies
pub use schemars::JsonSchema;
pub use serde_json::{json, Value};
