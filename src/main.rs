//! Demo MCP Server
//!
//! A stdio calculator server, mainly for exercising the crate end to end:
//! `cargo run --features bin --bin forgemcp-server`, then send JSON-RPC
//! requests one per line, e.g.
//! `{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}`.

use anyhow::Result;
use forgemcp::{McpServerBuilder, Tool};
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn number_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "a": { "type": "number" },
            "b": { "type": "number" }
        },
        "required": ["a", "b"]
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Stderr-only logging; stdout carries the JSON-RPC stream.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let add = Tool::new("add", number_schema(), |args, _ctx| async move {
        let a = args["a"].as_f64().unwrap_or(0.0);
        let b = args["b"].as_f64().unwrap_or(0.0);
        Ok(json!(a + b))
    })?
    .with_description("Add two numbers");

    let subtract = Tool::new("subtract", number_schema(), |args, _ctx| async move {
        let a = args["a"].as_f64().unwrap_or(0.0);
        let b = args["b"].as_f64().unwrap_or(0.0);
        Ok(json!(a - b))
    })?
    .with_description("Subtract two numbers");

    let server = McpServerBuilder::new("calculator", "1.0.0")
        .with_tool(add)
        .with_tool(subtract)
        .build()?;

    server.run_stdio().await?;
    Ok(())
}
