//! Elicitation Schemas
//!
//! Elicitation asks the user, through the client, to fill a small flat form
//! described by a JSON Schema. Clients only render flat objects with
//! primitive properties, so schemas are validated and normalized here before
//! they go over the wire: [`validate_elicitation_schema`] enforces the flat
//! primitive shape, and [`build_elicitation_schema`] rebuilds `required` so
//! that defaulted and nullable fields are optional.

use {
    crate::error::{McpError, McpResult},
    anyhow::Result,
    futures_util::future::BoxFuture,
    once_cell::sync::Lazy,
    serde_json::{Map, Value},
    std::collections::HashSet,
};

static ALLOWED_PRIMITIVES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["string", "number", "integer", "boolean"].into_iter().collect());

/// Outcome of an elicitation round-trip through the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ElicitationResult {
    Accepted(Value),
    Declined,
    Cancelled,
}

impl ElicitationResult {
    /// Parse the client's `{action, content?}` wire payload.
    pub fn from_wire(value: &Value) -> McpResult<Self> {
        match value.get("action").and_then(Value::as_str) {
            Some("accept") => Ok(Self::Accepted(
                value.get("content").cloned().unwrap_or(Value::Null),
            )),
            Some("decline") => Ok(Self::Declined),
            Some("cancel") => Ok(Self::Cancelled),
            other => Err(McpError::Validation(format!(
                "unknown elicitation action: {other:?}"
            ))),
        }
    }
}

/// Callback installed by the embedding application; receives the message and
/// the normalized schema, and performs the client round-trip.
pub type ElicitationCallback =
    dyn Fn(String, Value) -> BoxFuture<'static, Result<ElicitationResult>> + Send + Sync;

fn type_list_allows_null(type_field: &Value) -> bool {
    match type_field.as_array() {
        Some(types) => types.iter().any(|t| t.as_str() == Some("null")),
        None => false,
    }
}

fn union_allows_null(schema: &Value) -> bool {
    for keyword in ["oneOf", "anyOf"] {
        let Some(branches) = schema.get(keyword).and_then(Value::as_array) else {
            continue;
        };
        for branch in branches {
            if let Some(branch_type) = branch.get("type") {
                if branch_type.as_str() == Some("null") || type_list_allows_null(branch_type) {
                    return true;
                }
            }
        }
    }
    false
}

/// Validate that a JSON Schema follows MCP elicitation requirements.
///
/// - Root must be an object schema (`type == "object"`).
/// - Properties must use primitive types: string, number, integer, boolean.
/// - `const` and `enum` fields are always allowed.
/// - `$ref` targets are allowed only when they resolve to an enum or
///   primitive type under `#/$defs/`.
/// - `oneOf`/`anyOf` branches must also be primitive (or const/enum).
/// - `"null"` entries in an array-of-type form are ignored; a bare
///   `nullable: true` with no type is permitted.
pub fn validate_elicitation_schema(schema: &Value) -> McpResult<()> {
    if schema.get("type").and_then(Value::as_str) != Some("object") {
        let got = schema
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Err(McpError::Validation(format!(
            "Elicitation schema must be an object schema, got type '{got}'. \
             Elicitation schemas are limited to flat objects with primitive properties only."
        )));
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(()); // Nothing to validate
    };

    for (prop_name, prop_schema) in properties {
        let mut prop_type = prop_schema.get("type").cloned().unwrap_or(Value::Null);

        // type: ["string", "null"] collapses to "string"
        if let Some(types) = prop_type.as_array() {
            let filtered: Vec<String> = types
                .iter()
                .filter_map(Value::as_str)
                .filter(|t| *t != "null")
                .map(str::to_string)
                .collect();
            if filtered.len() == 1 {
                prop_type = Value::String(filtered[0].clone());
            }
        } else if prop_schema.get("nullable").and_then(Value::as_bool) == Some(true) {
            // Nullable with no other type is fine
            continue;
        }

        if prop_schema.get("const").is_some() || prop_schema.get("enum").is_some() {
            continue;
        }

        if let Some(ref_path) = prop_schema.get("$ref").and_then(Value::as_str) {
            if let Some(def_name) = ref_path.strip_prefix("#/$defs/") {
                let ref_def = schema
                    .get("$defs")
                    .and_then(|defs| defs.get(def_name))
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new()));

                if ref_def.get("enum").is_some() {
                    continue;
                }
                if let Some(ref_type) = ref_def.get("type").and_then(Value::as_str) {
                    if ALLOWED_PRIMITIVES.contains(ref_type) {
                        continue;
                    }
                }
            }

            return Err(McpError::Validation(format!(
                "Elicitation schema field '{prop_name}' contains a reference '{ref_path}' that \
                 could not be validated. Only references to enum types or primitive types are \
                 allowed."
            )));
        }

        let one_of = prop_schema.get("oneOf").and_then(Value::as_array);
        let any_of = prop_schema.get("anyOf").and_then(Value::as_array);
        if one_of.is_some() || any_of.is_some() {
            let branches = one_of
                .into_iter()
                .flatten()
                .chain(any_of.into_iter().flatten());
            for branch in branches {
                if !branch.is_object() {
                    continue;
                }
                if branch.get("const").is_some() || branch.get("enum").is_some() {
                    continue;
                }
                let Some(union_type) = branch.get("type").and_then(Value::as_str) else {
                    return Err(McpError::Validation(format!(
                        "Elicitation schema field '{prop_name}' has union type with missing \
                         'type' which is not allowed."
                    )));
                };
                if !ALLOWED_PRIMITIVES.contains(union_type) {
                    return Err(McpError::Validation(format!(
                        "Elicitation schema field '{prop_name}' has union type '{union_type}' \
                         which is not a primitive type. Only primitive types are allowed in \
                         elicitation schemas."
                    )));
                }
            }
            continue;
        }

        let type_str = prop_type.as_str().unwrap_or_default();
        if !ALLOWED_PRIMITIVES.contains(type_str) {
            return Err(McpError::Validation(format!(
                "Elicitation schema field '{prop_name}' has type '{type_str}' which is not a \
                 primitive type. Only primitive types are allowed in elicitation schemas."
            )));
        }
    }

    Ok(())
}

/// Build an MCP elicitation schema from a base JSON Schema.
///
/// Ensures the root is an object schema, rebuilds `required` so that a
/// property is required iff it has no `default`, is not `nullable: true`,
/// and does not admit `null` through its type array or a `oneOf`/`anyOf`
/// branch, preserves every other keyword, and validates the result.
pub fn build_elicitation_schema(base_schema: &Value) -> McpResult<Value> {
    let mut schema = if base_schema.is_object() {
        base_schema.clone()
    } else {
        Value::Object(Map::new())
    };

    if schema.get("type").and_then(Value::as_str).is_none() {
        schema["type"] = Value::String("object".to_string());
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object).cloned() {
        let mut required = Vec::new();
        for (name, prop_schema) in &properties {
            let has_default = prop_schema.get("default").is_some();
            let is_nullable = prop_schema.get("nullable").and_then(Value::as_bool) == Some(true);
            let type_allows_null = prop_schema
                .get("type")
                .map(type_list_allows_null)
                .unwrap_or(false)
                || union_allows_null(prop_schema);

            if !has_default && !is_nullable && !type_allows_null {
                required.push(Value::String(name.clone()));
            }
        }

        if required.is_empty() {
            if let Some(object) = schema.as_object_mut() {
                object.remove("required");
            }
        } else {
            schema["required"] = Value::Array(required);
        }
    }

    validate_elicitation_schema(&schema)?;
    Ok(schema)
}
