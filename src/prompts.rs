//! Prompts and the Prompt Registry
//!
//! A [`Prompt`] is a named, parameterized template that renders into a
//! message list for `prompts/get`. Placeholders use `{argument}` syntax.

use {
    crate::error::{McpError, McpResult},
    dashmap::{mapref::entry::Entry, DashMap},
    serde_json::{json, Map, Value},
};

/// Declared prompt parameter.
#[derive(Debug, Clone)]
pub struct PromptArgument {
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
}

/// A rendered prompt message.
#[derive(Debug, Clone)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

impl PromptMessage {
    pub fn to_json(&self) -> Value {
        json!({
            "role": self.role,
            "content": {
                "type": "text",
                "text": self.content,
            }
        })
    }
}

/// A named, parameterized message template.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub name: String,
    pub description: Option<String>,
    pub template: String,
    pub arguments: Vec<PromptArgument>,
}

impl Prompt {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            template: template.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_argument(
        mut self,
        name: impl Into<String>,
        description: Option<String>,
        required: bool,
    ) -> Self {
        self.arguments.push(PromptArgument {
            name: name.into(),
            description,
            required,
        });
        self
    }

    /// Render the template into messages, substituting `{name}` placeholders.
    ///
    /// Missing required arguments are a validation error; optional arguments
    /// without a value leave their placeholder untouched.
    pub fn render(&self, arguments: Option<&Value>) -> McpResult<Vec<PromptMessage>> {
        let empty = Map::new();
        let args = arguments.and_then(Value::as_object).unwrap_or(&empty);

        for declared in &self.arguments {
            if declared.required && !args.contains_key(&declared.name) {
                return Err(McpError::Validation(format!(
                    "prompt '{}' missing required argument '{}'",
                    self.name, declared.name
                )));
            }
        }

        let mut text = self.template.clone();
        for (name, value) in args {
            let placeholder = format!("{{{name}}}");
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            text = text.replace(&placeholder, &rendered);
        }

        Ok(vec![PromptMessage {
            role: "user".to_string(),
            content: text,
        }])
    }

    /// The `prompts/list` item for this prompt.
    pub fn to_descriptor(&self) -> Value {
        let mut descriptor = json!({ "name": self.name });
        if let Some(description) = &self.description {
            descriptor["description"] = json!(description);
        }
        if !self.arguments.is_empty() {
            let arguments: Vec<Value> = self
                .arguments
                .iter()
                .map(|arg| {
                    let mut entry = json!({
                        "name": arg.name,
                        "required": arg.required,
                    });
                    if let Some(description) = &arg.description {
                        entry["description"] = json!(description);
                    }
                    entry
                })
                .collect();
            descriptor["arguments"] = Value::Array(arguments);
        }
        descriptor
    }
}

/// Name-keyed prompt registry.
#[derive(Default)]
pub struct PromptManager {
    prompts: DashMap<String, Prompt>,
}

impl PromptManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, prompt: Prompt) -> McpResult<()> {
        match self.prompts.entry(prompt.name.clone()) {
            Entry::Occupied(_) => Err(McpError::AlreadyExists(format!(
                "prompt '{}'",
                prompt.name
            ))),
            Entry::Vacant(slot) => {
                slot.insert(prompt);
                Ok(())
            }
        }
    }

    pub fn register_with_replace(&self, prompt: Prompt) {
        self.prompts.insert(prompt.name.clone(), prompt);
    }

    pub fn get(&self, name: &str) -> McpResult<Prompt> {
        self.prompts
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| McpError::NotFound(format!("prompt '{name}'")))
    }

    /// All prompts, sorted by name so list responses are stable.
    pub fn list(&self) -> Vec<Prompt> {
        let mut prompts: Vec<Prompt> = self.prompts.iter().map(|e| e.value().clone()).collect();
        prompts.sort_by(|a, b| a.name.cmp(&b.name));
        prompts
    }

    pub fn contains(&self, name: &str) -> bool {
        self.prompts.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}
