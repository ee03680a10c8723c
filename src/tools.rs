//! Tools and the Tool Registry
//!
//! A [`Tool`] is a named, schema-described async callable exposed over
//! `tools/list` / `tools/call`. The [`ToolManager`] keeps the name → tool
//! map and guarantees name uniqueness.

use {
    crate::{
        context::ToolContext,
        error::{McpError, McpResult},
    },
    anyhow::Result,
    dashmap::{mapref::entry::Entry, DashMap},
    futures_util::future::BoxFuture,
    schemars::JsonSchema,
    serde_json::{json, Map, Value},
    std::{future::Future, sync::Arc},
};

/// Boxed async tool function: validated arguments in, JSON result out.
pub type ToolFn =
    Arc<dyn Fn(Value, ToolContext) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// Icon metadata advertised in `tools/list`.
#[derive(Debug, Clone)]
pub struct Icon {
    pub src: String,
    pub mime_type: Option<String>,
}

/// A named, schema-described callable exposed by the server.
#[derive(Clone)]
pub struct Tool {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub input_schema: Value,
    pub output_schema: Option<Value>,
    pub icons: Option<Vec<Icon>>,
    func: ToolFn,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .field("output_schema", &self.output_schema)
            .field("icons", &self.icons)
            .finish()
    }
}

impl Tool {
    /// Create a tool from an explicit JSON Schema.
    ///
    /// The schema must be an object schema (`"type": "object"`); anything
    /// else is rejected here rather than at call time.
    pub fn new<F, Fut>(name: impl Into<String>, input_schema: Value, func: F) -> McpResult<Self>
    where
        F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(McpError::Validation("tool name must not be empty".into()));
        }
        if input_schema.get("type").and_then(Value::as_str) != Some("object") {
            return Err(McpError::Validation(format!(
                "tool '{name}' input schema must be an object schema"
            )));
        }
        Ok(Self::assemble(name, input_schema, wrap_fn(func)))
    }

    /// Create a tool whose input schema is derived from a `JsonSchema` type.
    pub fn from_schema<T, F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        func: F,
    ) -> Self
    where
        T: JsonSchema,
        F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let schema = schemars::schema_for!(T);
        let input_schema = serde_json::to_value(schema).unwrap_or_else(|_| {
            json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            })
        });

        Self::assemble(name.into(), input_schema, wrap_fn(func)).with_description(description)
    }

    pub(crate) fn assemble(name: String, input_schema: Value, func: ToolFn) -> Self {
        Self {
            name,
            title: None,
            description: None,
            input_schema,
            output_schema: None,
            icons: None,
            func,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_output_schema(mut self, output_schema: Value) -> Self {
        self.output_schema = Some(output_schema);
        self
    }

    pub fn with_icons(mut self, icons: Vec<Icon>) -> Self {
        self.icons = Some(icons);
        self
    }

    /// Invoke the tool function with already-validated arguments.
    pub async fn invoke(&self, arguments: Value, ctx: ToolContext) -> Result<Value> {
        (self.func)(arguments, ctx).await
    }

    /// The `tools/list` item for this tool.
    pub fn to_descriptor(&self) -> Value {
        let mut descriptor = json!({
            "name": self.name,
            "inputSchema": self.input_schema,
        });
        if let Some(title) = &self.title {
            descriptor["title"] = json!(title);
        }
        if let Some(description) = &self.description {
            descriptor["description"] = json!(description);
        }
        if let Some(output_schema) = &self.output_schema {
            descriptor["outputSchema"] = output_schema.clone();
        }
        if let Some(icons) = &self.icons {
            let icons: Vec<Value> = icons
                .iter()
                .map(|icon| {
                    let mut entry = json!({ "src": icon.src });
                    if let Some(mime) = &icon.mime_type {
                        entry["mimeType"] = json!(mime);
                    }
                    entry
                })
                .collect();
            descriptor["icons"] = Value::Array(icons);
        }
        descriptor
    }
}

fn wrap_fn<F, Fut>(func: F) -> ToolFn
where
    F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Arc::new(move |args, ctx| -> BoxFuture<'static, Result<Value>> { Box::pin(func(args, ctx)) })
}

/// Structural argument validation against an object schema.
///
/// Checks only what MCP requires: every `required` key is present, and any
/// supplied argument whose property declares a primitive type carries a JSON
/// value of that type. Deeper schema keywords are advisory.
pub(crate) fn check_arguments(schema: &Value, arguments: &Value) -> McpResult<()> {
    let args = arguments
        .as_object()
        .ok_or_else(|| McpError::InvalidParams("arguments must be an object".into()))?;

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !args.contains_key(key) {
                return Err(McpError::InvalidParams(format!("missing {key}")));
            }
        }
    }

    let empty = Map::new();
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    for (prop, prop_schema) in properties {
        let Some(value) = args.get(prop) else {
            continue;
        };
        let Some(expected) = prop_schema.get("type").and_then(Value::as_str) else {
            continue;
        };
        let matches = match expected {
            "string" => value.is_string(),
            "number" => value.is_number(),
            "integer" => value.is_i64() || value.is_u64(),
            "boolean" => value.is_boolean(),
            "object" => value.is_object(),
            "array" => value.is_array(),
            "null" => value.is_null(),
            _ => true,
        };
        if !matches {
            return Err(McpError::InvalidParams(format!(
                "argument '{prop}' must be of type {expected}"
            )));
        }
    }

    Ok(())
}

/// Name-keyed tool registry.
///
/// Registration normally happens once at startup; lookups are lock-free
/// reads on the shared map.
#[derive(Default)]
pub struct ToolManager {
    tools: DashMap<String, Tool>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; a second registration under the same name is an error.
    pub fn register(&self, tool: Tool) -> McpResult<()> {
        match self.tools.entry(tool.name.clone()) {
            Entry::Occupied(_) => Err(McpError::AlreadyExists(format!("tool '{}'", tool.name))),
            Entry::Vacant(slot) => {
                slot.insert(tool);
                Ok(())
            }
        }
    }

    /// Register a tool, replacing any existing registration of that name.
    pub fn register_with_replace(&self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    pub fn get(&self, name: &str) -> McpResult<Tool> {
        self.tools
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| McpError::NotFound(format!("tool '{name}'")))
    }

    /// All tools, sorted by name so list responses are stable.
    pub fn list(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self.tools.iter().map(|e| e.value().clone()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
