use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    // Protocol Errors
    #[error("Method not found: {0}")]
    UnknownMethod(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    // Registry Errors
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already registered: {0}")]
    AlreadyExists(String),

    // Schema Errors
    #[error("Validation error: {0}")]
    Validation(String),

    // Limit Errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    // IO Errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // JSON Errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Internal Errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Convert to JSON-RPC error code
    pub fn error_code(&self) -> i32 {
        match self {
            Self::UnknownMethod(_) => -32601,
            Self::InvalidRequest(_) => -32600,
            Self::InvalidParams(_) | Self::NotFound(_) | Self::Validation(_) => -32602,
            Self::Json(_) => -32700,
            _ => -32603, // Internal error
        }
    }

    /// Create JSON-RPC error response
    pub fn to_json_rpc_error(&self, id: Option<Value>) -> Value {
        serde_json::json!({
            "jsonrpc": "2.0",
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            },
            "id": id,
        })
    }
}

// Result type alias for convenience
pub type McpResult<T> = Result<T, McpError>;

// Tool, provider, and callback functions return anyhow::Error; at the
// framework boundary those become internal errors.
impl From<anyhow::Error> for McpError {
    fn from(err: anyhow::Error) -> Self {
        McpError::Internal(err.to_string())
    }
}
