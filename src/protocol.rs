//! JSON-RPC 2.0 Framing
//!
//! Response builders and wire constants for the MCP protocol layer.
//! Every message on the wire is a single JSON-RPC 2.0 object; transports
//! frame them (one line per message for stdio, one body per POST for HTTP).

use {
    serde_json::{json, Value},
    tracing::info,
};

/// MCP protocol revision implemented by this crate.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC standard error codes used on the wire.
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// Server identity plus JSON-RPC response assembly.
pub struct McpProtocol {
    version: String,
    server_name: String,
    server_version: String,
}

impl McpProtocol {
    pub fn new(server_name: impl Into<String>, server_version: impl Into<String>) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            server_name: server_name.into(),
            server_version: server_version.into(),
        }
    }

    /// Get protocol version
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get server name
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Get server version
    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    /// Create the `initialize` result payload
    pub fn create_initialize_result(&self) -> Value {
        info!("🔧 MCP client initializing against '{}'", self.server_name);
        json!({
            "protocolVersion": self.version,
            "serverInfo": {
                "name": self.server_name,
                "version": self.server_version
            },
            "capabilities": {
                "tools": {},
                "resources": {},
                "prompts": {}
            }
        })
    }

    /// Create success response
    pub fn create_success_response(&self, id: Value, result: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": result
        })
    }

    /// Create error response
    pub fn create_error_response(&self, id: Value, code: i32, message: &str) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {
                "code": code,
                "message": message
            }
        })
    }
}

/// Response for input that never parsed into a JSON-RPC message.
pub fn parse_error_response() -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": null,
        "error": {
            "code": PARSE_ERROR,
            "message": "Parse error"
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_initialize_result() {
        let proto = McpProtocol::new("calculator", "1.0.0");
        let result = proto.create_initialize_result();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "calculator");
        assert_eq!(result["serverInfo"]["version"], "1.0.0");
        assert!(result["capabilities"]["tools"].is_object());
        assert!(result["capabilities"]["resources"].is_object());
        assert!(result["capabilities"]["prompts"].is_object());
    }

    #[test]
    fn test_error_response() {
        let proto = McpProtocol::new("s", "0.0.1");
        let err = proto.create_error_response(json!(42), -1, "fail");
        assert_eq!(err["id"], 42);
        assert_eq!(err["error"]["code"], -1);
        assert_eq!(err["error"]["message"], "fail");
    }

    #[test]
    fn test_success_response() {
        let proto = McpProtocol::new("s", "0.0.1");
        let ok = proto.create_success_response(json!(7), json!({"foo": 1}));
        assert_eq!(ok["id"], 7);
        assert_eq!(ok["result"]["foo"], 1);
    }

    #[test]
    fn test_parse_error_has_null_id() {
        let resp = parse_error_response();
        assert!(resp["id"].is_null());
        assert_eq!(resp["error"]["code"], PARSE_ERROR);
    }
}
