//! Resources and the Resource Registry
//!
//! A [`Resource`] is a named, read-only piece of content addressed by URI:
//! a file on disk, an inline text blob, or an inline JSON document.
//! Resources are registered once and never mutated afterwards.

use {
    crate::error::{McpError, McpResult},
    dashmap::{mapref::entry::Entry, DashMap},
    serde_json::{json, Value},
    std::path::PathBuf,
    tracing::debug,
};

/// Resource payload kind, as advertised to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    File,
    Text,
    Json,
    Unknown,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Text => "text",
            Self::Json => "json",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a kind string; anything unrecognized maps to `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "file" => Self::File,
            "text" => Self::Text,
            "json" => Self::Json,
            _ => Self::Unknown,
        }
    }
}

/// The payload behind a resource.
#[derive(Debug, Clone)]
pub enum ResourceBody {
    File(PathBuf),
    Text(String),
    Json(Value),
}

/// A named, read-only piece of content exposed over `resources/*`.
#[derive(Debug, Clone)]
pub struct Resource {
    pub uri: String,
    pub name: String,
    pub description: Option<String>,
    pub mime_type: Option<String>,
    pub body: ResourceBody,
}

/// Resolved content for a `resources/read` response.
#[derive(Debug, Clone)]
pub struct ResourceContent {
    pub uri: String,
    pub mime_type: Option<String>,
    pub text: String,
}

impl Resource {
    pub fn file(uri: impl Into<String>, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: None,
            body: ResourceBody::File(path.into()),
        }
    }

    pub fn text(uri: impl Into<String>, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: Some("text/plain".to_string()),
            body: ResourceBody::Text(text.into()),
        }
    }

    pub fn json(uri: impl Into<String>, name: impl Into<String>, value: Value) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: Some("application/json".to_string()),
            body: ResourceBody::Json(value),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn kind(&self) -> ResourceKind {
        match &self.body {
            ResourceBody::File(_) => ResourceKind::File,
            ResourceBody::Text(_) => ResourceKind::Text,
            ResourceBody::Json(_) => ResourceKind::Json,
        }
    }

    /// Resolve the payload into readable content.
    pub async fn read(&self) -> McpResult<ResourceContent> {
        let text = match &self.body {
            ResourceBody::File(path) => {
                debug!("📖 Reading resource file: {}", path.display());
                tokio::fs::read_to_string(path).await?
            }
            ResourceBody::Text(text) => text.clone(),
            ResourceBody::Json(value) => serde_json::to_string_pretty(value)?,
        };
        Ok(ResourceContent {
            uri: self.uri.clone(),
            mime_type: self.mime_type.clone(),
            text,
        })
    }

    /// The `resources/list` item for this resource.
    pub fn to_descriptor(&self) -> Value {
        let mut descriptor = json!({
            "uri": self.uri,
            "name": self.name,
        });
        if let Some(description) = &self.description {
            descriptor["description"] = json!(description);
        }
        if let Some(mime) = &self.mime_type {
            descriptor["mimeType"] = json!(mime);
        }
        descriptor
    }
}

impl ResourceContent {
    /// The `resources/read` contents entry.
    pub fn to_json(&self) -> Value {
        let mut entry = json!({
            "uri": self.uri,
            "text": self.text,
        });
        if let Some(mime) = &self.mime_type {
            entry["mimeType"] = json!(mime);
        }
        entry
    }
}

/// URI-keyed resource registry.
#[derive(Default)]
pub struct ResourceManager {
    resources: DashMap<String, Resource>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, resource: Resource) -> McpResult<()> {
        match self.resources.entry(resource.uri.clone()) {
            Entry::Occupied(_) => Err(McpError::AlreadyExists(format!(
                "resource '{}'",
                resource.uri
            ))),
            Entry::Vacant(slot) => {
                slot.insert(resource);
                Ok(())
            }
        }
    }

    pub fn register_with_replace(&self, resource: Resource) {
        self.resources.insert(resource.uri.clone(), resource);
    }

    pub fn get(&self, uri: &str) -> McpResult<Resource> {
        self.resources
            .get(uri)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| McpError::NotFound(format!("resource '{uri}'")))
    }

    /// All resources, sorted by URI so list responses are stable.
    pub fn list(&self) -> Vec<Resource> {
        let mut resources: Vec<Resource> =
            self.resources.iter().map(|e| e.value().clone()).collect();
        resources.sort_by(|a, b| a.uri.cmp(&b.uri));
        resources
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.resources.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in [ResourceKind::File, ResourceKind::Text, ResourceKind::Json] {
            assert_eq!(ResourceKind::parse(kind.as_str()), kind);
        }
        assert_eq!(ResourceKind::parse("blob"), ResourceKind::Unknown);
    }

    #[tokio::test]
    async fn test_json_resource_reads_pretty() {
        let resource = Resource::json("mem://cfg", "cfg", serde_json::json!({"a": 1}));
        assert_eq!(resource.kind(), ResourceKind::Json);
        let content = resource.read().await.unwrap();
        assert!(content.text.contains("\"a\": 1"));
        assert_eq!(content.mime_type.as_deref(), Some("application/json"));
    }
}
