//! HTTP Transport Bridge
//!
//! A minimal warp bridge: each `POST /` body is one JSON-RPC message, each
//! response body one JSON-RPC response. Notifications return 204 No
//! Content. Requests are served independently; ordering across requests is
//! up to the client.

use {
    crate::{handler::McpRequestHandler, protocol::parse_error_response},
    serde_json::Value,
    std::convert::Infallible,
    tracing::{debug, error},
    warp::{http::StatusCode, Filter, Rejection},
};

/// Serve the handler over HTTP POST on `127.0.0.1:port` until shutdown.
pub async fn serve(handler: McpRequestHandler, port: u16) {
    let handler = warp::any().map(move || handler.clone());

    let route = warp::post()
        .and(warp::path::end())
        .and(warp::body::json())
        .and(handler)
        .and_then(handle_request)
        .recover(handle_rejection);

    warp::serve(route).run(([127, 0, 0, 1], port)).await;
}

/// Bodies that never parsed into JSON get the standard `-32700` response.
async fn handle_rejection(_rejection: Rejection) -> Result<impl warp::Reply, Infallible> {
    Ok(warp::reply::with_status(
        warp::reply::json(&parse_error_response()),
        StatusCode::BAD_REQUEST,
    ))
}

async fn handle_request(
    message: Value,
    handler: McpRequestHandler,
) -> Result<impl warp::Reply, Rejection> {
    debug!("📥 HTTP request: {}", message);
    match handler.handle(message).await {
        Ok(Some(response)) => Ok(warp::reply::with_status(
            warp::reply::json(&response),
            StatusCode::OK,
        )),
        Ok(None) => Ok(warp::reply::with_status(
            warp::reply::json(&Value::Null),
            StatusCode::NO_CONTENT,
        )),
        Err(e) => {
            error!("💥 Unhandled pipeline error: {}", e);
            Ok(warp::reply::with_status(
                warp::reply::json(&e.to_json_rpc_error(None)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}
