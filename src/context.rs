//! Per-Request Tool Context
//!
//! [`ToolContext`] is the capability surface handed to tool functions: read
//! access to the resource and prompt registries, elicitation and sampling
//! round-trips through the client, and level-tagged logging. A context is
//! created at method entry and dropped when the handler returns.

use {
    crate::{
        elicitation::{build_elicitation_schema, ElicitationCallback, ElicitationResult},
        error::{McpError, McpResult},
        prompts::{Prompt, PromptManager},
        resources::{Resource, ResourceManager},
        sampling::SamplingCallback,
    },
    serde_json::Value,
    std::sync::Arc,
    tracing::{debug, error, info, warn},
};

/// Request-scoped facade passed to tool functions and prompt renderers.
#[derive(Clone)]
pub struct ToolContext {
    resources: Arc<ResourceManager>,
    prompts: Arc<PromptManager>,
    elicitation: Option<Arc<ElicitationCallback>>,
    sampling: Option<Arc<SamplingCallback>>,
    request_id: Option<String>,
}

impl ToolContext {
    pub(crate) fn new(
        resources: Arc<ResourceManager>,
        prompts: Arc<PromptManager>,
        elicitation: Option<Arc<ElicitationCallback>>,
        sampling: Option<Arc<SamplingCallback>>,
        request_id: Option<String>,
    ) -> Self {
        Self {
            resources,
            prompts,
            elicitation,
            sampling,
            request_id,
        }
    }

    /// A standalone context with empty registries and no client callbacks,
    /// for exercising tools outside a running server.
    pub fn detached() -> Self {
        Self::new(
            Arc::new(ResourceManager::new()),
            Arc::new(PromptManager::new()),
            None,
            None,
            None,
        )
    }

    /// The JSON-RPC id of the request this context serves, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn get_resource(&self, uri: &str) -> McpResult<Resource> {
        self.resources.get(uri)
    }

    pub fn list_resources(&self) -> Vec<Resource> {
        self.resources.list()
    }

    pub fn get_prompt(&self, name: &str) -> McpResult<Prompt> {
        self.prompts.get(name)
    }

    /// Ask the user to fill a flat form described by `schema`.
    ///
    /// The schema is normalized (defaulted fields become optional) before
    /// the installed elicitation callback carries it to the client. The
    /// round-trip may block for as long as the user takes to answer.
    pub async fn elicit(
        &self,
        message: impl Into<String>,
        schema: &Value,
    ) -> McpResult<ElicitationResult> {
        let normalized = build_elicitation_schema(schema)?;
        let callback = self.elicitation.as_ref().ok_or_else(|| {
            McpError::Internal("no elicitation callback installed".to_string())
        })?;
        callback(message.into(), normalized)
            .await
            .map_err(McpError::from)
    }

    /// Ask the client to run an LLM completion with the given
    /// `CreateMessageRequestParams` and return the assistant message.
    pub async fn sample(&self, params: Value) -> McpResult<Value> {
        let callback = self
            .sampling
            .as_ref()
            .ok_or_else(|| McpError::Internal("no sampling callback installed".to_string()))?;
        callback(params).await.map_err(McpError::from)
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        debug!(request_id = ?self.request_id, "{}", message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        info!(request_id = ?self.request_id, "{}", message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        warn!(request_id = ?self.request_id, "{}", message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        error!(request_id = ?self.request_id, "{}", message.as_ref());
    }
}
