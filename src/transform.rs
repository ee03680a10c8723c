//! Tool Transformation
//!
//! Derives a new tool from an existing one by declaratively rewriting its
//! arguments: rename, hide, default, retype, or annotate. Unchanged
//! arguments keep their behavior; hidden arguments are folded into the
//! underlying invocation as fixed defaults.

use {
    crate::{
        context::ToolContext,
        error::{McpError, McpResult},
        tools::Tool,
    },
    anyhow::Result,
    futures_util::future::BoxFuture,
    serde_json::{Map, Value},
    std::{
        collections::{HashMap, HashSet},
        sync::Arc,
    },
};

/// Per-argument rewrite rule. All fields are optional overrides.
#[derive(Debug, Clone, Default)]
pub struct ArgTransform {
    /// New external name for the argument.
    pub name: Option<String>,
    /// Replacement description.
    pub description: Option<String>,
    /// Schema keywords shallow-merged over the original property schema.
    pub type_schema: Option<Value>,
    /// Example values installed under `examples`.
    pub examples: Option<Value>,
    /// Value substituted when the caller omits the argument.
    pub default_value: Option<Value>,
    /// Explicit `required` override.
    pub required: Option<bool>,
    /// Remove the argument from the external schema entirely.
    pub hide: bool,
}

impl ArgTransform {
    /// Rename-only rule.
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Hide the argument and pin it to a fixed value.
    pub fn hidden(default_value: Value) -> Self {
        Self {
            default_value: Some(default_value),
            hide: true,
            ..Self::default()
        }
    }

    pub fn with_default(mut self, default_value: Value) -> Self {
        self.default_value = Some(default_value);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// A hidden argument cannot also be demanded of the caller.
    pub fn validate(&self) -> McpResult<()> {
        if self.hide && self.required == Some(true) {
            return Err(McpError::Validation(
                "hidden arguments cannot be marked required".into(),
            ));
        }
        Ok(())
    }
}

/// A tool derived from a source tool through an [`ArgTransform`] map.
///
/// Holds the source tool alive, the derived external schema, and the
/// defaults that get spliced into every underlying invocation.
#[derive(Clone, Debug)]
pub struct TransformedTool {
    source: Tool,
    name: String,
    description: Option<String>,
    transforms: HashMap<String, ArgTransform>,
    input_schema: Value,
    hidden_defaults: HashMap<String, Value>,
}

impl TransformedTool {
    /// Build a transformed tool from a source tool and a rewrite map.
    ///
    /// Rejected here: rules with `hide && required`, rules referencing
    /// arguments the source schema does not declare, and hiding a required
    /// argument without supplying a default for it.
    pub fn from_tool(
        source: Tool,
        name: Option<String>,
        description: Option<String>,
        transforms: HashMap<String, ArgTransform>,
    ) -> McpResult<Self> {
        let source_properties = properties_of(&source.input_schema);
        let source_required = required_of(&source.input_schema);

        for (arg, rule) in &transforms {
            rule.validate()?;
            if !source_properties.contains_key(arg) {
                return Err(McpError::Validation(format!(
                    "transform references unknown argument '{arg}' of tool '{}'",
                    source.name
                )));
            }
            if rule.hide && rule.default_value.is_none() && source_required.contains(arg) {
                return Err(McpError::Validation(format!(
                    "cannot hide required argument '{arg}' without a default value"
                )));
            }
        }

        let input_schema = derive_schema(&source.input_schema, &transforms);
        let hidden_defaults = transforms
            .iter()
            .filter(|(_, rule)| rule.hide)
            .filter_map(|(arg, rule)| {
                rule.default_value
                    .as_ref()
                    .map(|value| (arg.clone(), value.clone()))
            })
            .collect();

        let name = name.unwrap_or_else(|| source.name.clone());
        let description = description.or_else(|| source.description.clone());

        Ok(Self {
            source,
            name,
            description,
            transforms,
            input_schema,
            hidden_defaults,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The derived external schema.
    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Defaults spliced into every invocation for hidden arguments.
    pub fn hidden_defaults(&self) -> &HashMap<String, Value> {
        &self.hidden_defaults
    }

    /// Map external arguments to the source tool's and invoke it.
    pub async fn invoke(&self, arguments: Value, ctx: ToolContext) -> Result<Value> {
        let internal = self.map_arguments(&arguments);
        self.source.invoke(internal, ctx).await
    }

    /// Translate external caller arguments into source-tool arguments.
    fn map_arguments(&self, external: &Value) -> Value {
        let empty = Map::new();
        let external = external.as_object().unwrap_or(&empty);
        let mut internal = Map::new();

        for (arg, rule) in &self.transforms {
            if rule.hide {
                if let Some(default) = &rule.default_value {
                    internal.insert(arg.clone(), default.clone());
                }
                continue;
            }
            let key = rule.name.as_deref().unwrap_or(arg);
            if let Some(value) = external.get(key) {
                internal.insert(arg.clone(), value.clone());
            } else if let Some(default) = &rule.default_value {
                internal.insert(arg.clone(), default.clone());
            }
        }

        for arg in properties_of(&self.source.input_schema).keys() {
            if self.transforms.contains_key(arg) {
                continue;
            }
            if let Some(value) = external.get(arg) {
                internal.insert(arg.clone(), value.clone());
            }
        }

        Value::Object(internal)
    }

    /// Convert into a plain [`Tool`] carrying the derived schema, suitable
    /// for registration alongside untransformed tools.
    pub fn into_tool(self) -> Tool {
        let name = self.name.clone();
        let description = self.description.clone();
        let input_schema = self.input_schema.clone();
        let output_schema = self.source.output_schema.clone();
        let icons = self.source.icons.clone();

        let this = Arc::new(self);
        let func = Arc::new(move |args: Value, ctx: ToolContext| -> BoxFuture<'static, Result<Value>> {
            let this = Arc::clone(&this);
            Box::pin(async move { this.invoke(args, ctx).await })
        });

        let mut tool = Tool::assemble(name, input_schema, func);
        tool.description = description;
        tool.output_schema = output_schema;
        tool.icons = icons;
        tool
    }
}

fn properties_of(schema: &Value) -> Map<String, Value> {
    schema
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn required_of(schema: &Value) -> HashSet<String> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|required| {
            required
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Rebuild the external schema: drop hidden arguments, rename and override
/// the rest, and recompute `required` from the source schema and rules.
fn derive_schema(source_schema: &Value, transforms: &HashMap<String, ArgTransform>) -> Value {
    if transforms.is_empty() {
        return source_schema.clone();
    }

    let source_properties = properties_of(source_schema);
    let source_required = required_of(source_schema);

    let mut properties = Map::new();
    let mut required = Vec::new();

    for (prop, prop_schema) in &source_properties {
        match transforms.get(prop) {
            Some(rule) if rule.hide => {}
            Some(rule) => {
                let key = rule.name.clone().unwrap_or_else(|| prop.clone());
                let mut schema = prop_schema.clone();

                if let Some(target) = schema.as_object_mut() {
                    if let Some(overrides) = rule.type_schema.as_ref().and_then(Value::as_object) {
                        for (keyword, value) in overrides {
                            target.insert(keyword.clone(), value.clone());
                        }
                    }
                    if let Some(description) = &rule.description {
                        target.insert(
                            "description".to_string(),
                            Value::String(description.clone()),
                        );
                    }
                    if let Some(examples) = &rule.examples {
                        target.insert("examples".to_string(), examples.clone());
                    }
                }

                let is_required = match rule.required {
                    Some(explicit) => explicit,
                    None => source_required.contains(prop) && rule.default_value.is_none(),
                };
                if is_required {
                    required.push(Value::String(key.clone()));
                }
                properties.insert(key, schema);
            }
            None => {
                if source_required.contains(prop) {
                    required.push(Value::String(prop.clone()));
                }
                properties.insert(prop.clone(), prop_schema.clone());
            }
        }
    }

    let mut schema = source_schema.clone();
    schema["properties"] = Value::Object(properties);
    if required.is_empty() {
        if let Some(object) = schema.as_object_mut() {
            object.remove("required");
        }
    } else {
        schema["required"] = Value::Array(required);
    }
    schema
}
