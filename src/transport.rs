//! Stdio Transport
//!
//! The stdio transport is a byte pump: it reads one JSON-RPC message per
//! line from stdin, feeds it to the request handler, and writes one
//! response per line to stdout. All logging goes to stderr so stdout stays
//! a pure JSON-RPC stream.
//!
//! Any transport can bridge to the core the same way: supply each message
//! to [`McpRequestHandler::handle`] and deliver responses in the order the
//! pipeline produced them. A [`TransportFn`] captures that contract for
//! adapters that want a plain function.

use {
    crate::{
        error::McpResult,
        handler::McpRequestHandler,
        logging::ConnectionLogger,
        protocol::parse_error_response,
    },
    futures_util::future::BoxFuture,
    serde_json::Value,
    std::sync::Arc,
    tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    tracing::{debug, warn},
};

/// The request → response callback a transport drives.
pub type TransportFn =
    Arc<dyn Fn(Value) -> BoxFuture<'static, McpResult<Option<Value>>> + Send + Sync>;

/// Adapt a handler into a [`TransportFn`].
pub fn transport_fn(handler: McpRequestHandler) -> TransportFn {
    Arc::new(move |message| -> BoxFuture<'static, McpResult<Option<Value>>> {
        let handler = handler.clone();
        Box::pin(async move { handler.handle(message).await })
    })
}

/// Run the newline-delimited stdio loop until EOF.
///
/// Unparseable lines get a `-32700` response; notification responses and
/// responses addressed to a null id are suppressed. An error escaping the
/// pipeline fails the connection.
pub async fn run_stdio(handler: &McpRequestHandler) -> McpResult<()> {
    let logger = ConnectionLogger::new();
    debug!("{}", logger.fmt_connection_start());

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        debug!("{}", logger.fmt_message_received(line.len()));

        let message: Value = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(e) => {
                warn!("{}", logger.fmt_parse_error(&e.to_string()));
                write_frame(&mut stdout, &parse_error_response()).await?;
                continue;
            }
        };

        match handler.handle(message).await? {
            Some(response) => {
                // Responses addressed to a null id are suppressed; the
                // transport's own parse errors above are the exception.
                if response.get("id").is_some_and(Value::is_null) {
                    debug!("{}", logger.fmt_response_suppressed());
                    continue;
                }
                write_frame(&mut stdout, &response).await?;
            }
            None => debug!("{}", logger.fmt_response_suppressed()),
        }
    }

    debug!("{}", logger.fmt_connection_closed());
    Ok(())
}

async fn write_frame(stdout: &mut tokio::io::Stdout, response: &Value) -> McpResult<()> {
    let frame = serde_json::to_string(response)?;
    stdout.write_all(frame.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}
