//! Connection Debug Logging
//!
//! Format helpers for transport-level logging, tagged with a per-connection
//! id so interleaved connections can be told apart in the log stream.

use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ConnectionLogger {
    connection_id: ConnectionId,
    start_time: std::time::Instant,
}

impl ConnectionLogger {
    pub fn new() -> Self {
        Self {
            connection_id: ConnectionId::new(),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    pub fn fmt_connection_start(&self) -> String {
        format!(
            "[MCP:{}] 🔄 Starting message processing loop",
            self.connection_id.0
        )
    }

    pub fn fmt_message_received(&self, message_size: usize) -> String {
        format!(
            "[MCP:{}] 📥 Received message ({} bytes)",
            self.connection_id.0, message_size
        )
    }

    pub fn fmt_parse_error(&self, error: &str) -> String {
        format!(
            "[MCP:{}] 🚫 Failed to parse message: {}",
            self.connection_id.0, error
        )
    }

    pub fn fmt_response_suppressed(&self) -> String {
        format!(
            "[MCP:{}] 📭 Response suppressed (notification or null id)",
            self.connection_id.0
        )
    }

    pub fn fmt_connection_closed(&self) -> String {
        format!(
            "[MCP:{}] 🔌 Connection closed after {:?}",
            self.connection_id.0,
            self.start_time.elapsed()
        )
    }
}

impl Default for ConnectionLogger {
    fn default() -> Self {
        Self::new()
    }
}
