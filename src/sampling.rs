//! Sampling Callbacks
//!
//! Helpers for the client side of MCP sampling (`sampling/createMessage`):
//! the server asks the client to run an LLM completion and return the
//! assistant message. A handler may answer with a bare string, which is
//! wrapped into a single-text-content assistant message, or with a full
//! `CreateMessageResult` object which passes through untouched.

use {
    anyhow::Result,
    futures_util::future::BoxFuture,
    serde_json::{json, Value},
    std::{future::Future, sync::Arc},
};

/// Model name stamped on text results wrapped by this crate.
pub const CLIENT_MODEL: &str = "forgemcp-client";

/// What a sampling handler can return.
#[derive(Debug, Clone)]
pub enum SamplingReply {
    /// Plain assistant text; wrapped into a `CreateMessageResult`.
    Text(String),
    /// A pre-shaped `CreateMessageResult` object, passed through as-is.
    Message(Value),
}

/// Callback signature the server invokes with `CreateMessageRequestParams`.
pub type SamplingCallback = dyn Fn(Value) -> BoxFuture<'static, Result<Value>> + Send + Sync;

/// Build a minimal `CreateMessageResult` with a single text content block.
pub fn text_result(text: impl Into<String>) -> Value {
    json!({
        "role": "assistant",
        "model": CLIENT_MODEL,
        "content": [{ "type": "text", "text": text.into() }],
    })
}

/// Wrap a handler so it can be installed as the server's sampling callback.
/// Errors propagate to the caller unchanged.
pub fn sampling_callback<F, Fut>(handler: F) -> Arc<SamplingCallback>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<SamplingReply>> + Send + 'static,
{
    Arc::new(move |params| -> BoxFuture<'static, Result<Value>> {
        let reply = handler(params);
        Box::pin(async move {
            match reply.await? {
                SamplingReply::Text(text) => Ok(text_result(text)),
                SamplingReply::Message(message) => Ok(message),
            }
        })
    })
}
