//! Middleware Pipeline Tests
//!
//! Onion ordering, hook dispatch, and the built-in logging, timing,
//! caching, rate-limiting, and error-handling middleware.

use {
    crate::{
        error::{McpError, McpResult},
        middleware::{
            terminal_fn, CacheConfig, CachingMiddleware, ErrorHandlingMiddleware,
            LoggingMiddleware, Middleware, MiddlewareContext, MiddlewarePipeline, Next,
            RateLimitConfig, RateLimitingMiddleware, Terminal, TimingMiddleware,
        },
    },
    async_trait::async_trait,
    serde_json::{json, Value},
    std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
        time::Duration,
    },
};

fn tools_list_ctx() -> MiddlewareContext {
    MiddlewareContext::from_message(&json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/list"
    }))
}

fn empty_terminal() -> Terminal {
    terminal_fn(|_ctx| async { Ok(json!({ "tools": [] })) })
}

#[tokio::test]
async fn test_empty_pipeline_reaches_terminal() {
    let pipeline = MiddlewarePipeline::new();
    assert!(pipeline.is_empty());

    let result = pipeline
        .execute(&tools_list_ctx(), &empty_terminal())
        .await
        .unwrap();
    assert!(result["tools"].is_array());
}

#[tokio::test]
async fn test_context_copy_is_independent() {
    let ctx = tools_list_ctx();
    let mut copy = ctx.clone();
    copy.method = "tools/call".to_string();
    copy.message["method"] = json!("tools/call");

    assert_eq!(ctx.method, "tools/list");
    assert_eq!(ctx.message["method"], "tools/list");
}

struct MarkerMiddleware;

#[async_trait]
impl Middleware for MarkerMiddleware {
    async fn on_message(&self, ctx: &MiddlewareContext, next: Next<'_>) -> McpResult<Value> {
        let mut result = next.run(ctx).await?;
        result["middleware_ran"] = json!(true);
        Ok(result)
    }
}

#[tokio::test]
async fn test_single_middleware_post_processes_result() {
    let mut pipeline = MiddlewarePipeline::new();
    pipeline.add(Arc::new(MarkerMiddleware));
    assert_eq!(pipeline.len(), 1);

    let result = pipeline
        .execute(&tools_list_ctx(), &empty_terminal())
        .await
        .unwrap();
    assert!(result["tools"].is_array());
    assert_eq!(result["middleware_ran"], true);
}

struct OrderMiddleware {
    id: i64,
    order: Arc<Mutex<Vec<i64>>>,
}

#[async_trait]
impl Middleware for OrderMiddleware {
    async fn on_message(&self, ctx: &MiddlewareContext, next: Next<'_>) -> McpResult<Value> {
        self.order.lock().unwrap().push(self.id);
        let result = next.run(ctx).await;
        self.order.lock().unwrap().push(-self.id);
        result
    }
}

#[tokio::test]
async fn test_first_added_runs_outermost() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut pipeline = MiddlewarePipeline::new();
    for id in [1, 2, 3] {
        pipeline.add(Arc::new(OrderMiddleware {
            id,
            order: Arc::clone(&order),
        }));
    }

    let handler_order = Arc::clone(&order);
    let terminal = terminal_fn(move |_ctx| {
        let order = Arc::clone(&handler_order);
        async move {
            order.lock().unwrap().push(0);
            Ok(json!({}))
        }
    });

    pipeline
        .execute(&tools_list_ctx(), &terminal)
        .await
        .unwrap();

    assert_eq!(*order.lock().unwrap(), vec![1, 2, 3, 0, -3, -2, -1]);
}

struct ToolsOnlyMiddleware {
    tools_call_count: AtomicUsize,
    other_count: AtomicUsize,
}

#[async_trait]
impl Middleware for ToolsOnlyMiddleware {
    async fn on_call_tool(&self, ctx: &MiddlewareContext, next: Next<'_>) -> McpResult<Value> {
        self.tools_call_count.fetch_add(1, Ordering::SeqCst);
        next.run(ctx).await
    }

    async fn on_message(&self, ctx: &MiddlewareContext, next: Next<'_>) -> McpResult<Value> {
        self.other_count.fetch_add(1, Ordering::SeqCst);
        next.run(ctx).await
    }
}

#[tokio::test]
async fn test_method_hook_wins_over_generic_hook() {
    let middleware = Arc::new(ToolsOnlyMiddleware {
        tools_call_count: AtomicUsize::new(0),
        other_count: AtomicUsize::new(0),
    });
    let mut pipeline = MiddlewarePipeline::new();
    pipeline.add(middleware.clone());

    let terminal = terminal_fn(|_ctx| async { Ok(json!({})) });

    let call_ctx = MiddlewareContext::from_message(&json!({
        "jsonrpc": "2.0", "id": 1, "method": "tools/call",
        "params": { "name": "echo", "arguments": {} }
    }));
    pipeline.execute(&call_ctx, &terminal).await.unwrap();

    let other_ctx = MiddlewareContext::from_message(&json!({
        "jsonrpc": "2.0", "id": 2, "method": "other/method"
    }));
    pipeline.execute(&other_ctx, &terminal).await.unwrap();

    assert_eq!(middleware.tools_call_count.load(Ordering::SeqCst), 1);
    assert_eq!(middleware.other_count.load(Ordering::SeqCst), 1);
    assert_eq!(call_ctx.tool_name.as_deref(), Some("echo"));
}

#[tokio::test]
async fn test_logging_middleware_writes_request_and_response_lines() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink_lines = Arc::clone(&lines);
    let logging = LoggingMiddleware::with_sink(
        Arc::new(move |line: &str| sink_lines.lock().unwrap().push(line.to_string())),
        false,
    );

    let mut pipeline = MiddlewarePipeline::new();
    pipeline.add(Arc::new(logging));

    pipeline
        .execute(&tools_list_ctx(), &empty_terminal())
        .await
        .unwrap();

    let lines = lines.lock().unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("REQUEST tools/list"));
    assert!(lines[1].contains("RESPONSE tools/list"));
    // Payload logging is off by default.
    assert!(!lines[0].contains("jsonrpc"));
}

#[tokio::test]
async fn test_timing_middleware_counts_per_method() {
    let timing = Arc::new(TimingMiddleware::new());
    let mut pipeline = MiddlewarePipeline::new();
    pipeline.add(timing.clone());

    for _ in 0..5 {
        pipeline
            .execute(&tools_list_ctx(), &empty_terminal())
            .await
            .unwrap();
    }

    let stats = timing.get_stats("tools/list").unwrap();
    assert_eq!(stats.request_count, 5);
    assert!(timing.get_stats("tools/call").is_none());
}

#[tokio::test]
async fn test_caching_middleware_invokes_handler_once() {
    let caching = Arc::new(CachingMiddleware::new());
    let mut pipeline = MiddlewarePipeline::new();
    pipeline.add(caching.clone());

    let calls = Arc::new(AtomicUsize::new(0));
    let terminal_calls = Arc::clone(&calls);
    let terminal = terminal_fn(move |_ctx| {
        let calls = Arc::clone(&terminal_calls);
        async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "tools": [{ "name": format!("tool{n}") }] }))
        }
    });

    let ctx = tools_list_ctx();
    let first = pipeline.execute(&ctx, &terminal).await.unwrap();
    let second = pipeline.execute(&ctx, &terminal).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);

    let stats = caching.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn test_caching_key_includes_params() {
    let caching = Arc::new(CachingMiddleware::new());
    let mut pipeline = MiddlewarePipeline::new();
    pipeline.add(caching.clone());

    let terminal = terminal_fn(|ctx| async move {
        Ok(json!({ "echo": ctx.message["params"]["name"] }))
    });

    let ctx_a = MiddlewareContext::from_message(&json!({
        "jsonrpc": "2.0", "id": 1, "method": "prompts/get", "params": { "name": "a" }
    }));
    let ctx_b = MiddlewareContext::from_message(&json!({
        "jsonrpc": "2.0", "id": 2, "method": "prompts/get", "params": { "name": "b" }
    }));

    let a = pipeline.execute(&ctx_a, &terminal).await.unwrap();
    let b = pipeline.execute(&ctx_b, &terminal).await.unwrap();
    assert_ne!(a, b);
    assert_eq!(caching.stats().misses, 2);
}

#[tokio::test]
async fn test_caching_lru_eviction_at_capacity() {
    let caching = Arc::new(CachingMiddleware::with_config(CacheConfig {
        max_entries: Some(2),
        ttl: None,
    }));
    let mut pipeline = MiddlewarePipeline::new();
    pipeline.add(caching.clone());

    let calls = Arc::new(AtomicUsize::new(0));
    let terminal_calls = Arc::clone(&calls);
    let terminal = terminal_fn(move |_ctx| {
        let calls = Arc::clone(&terminal_calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({}))
        }
    });

    let ctx_for = |name: &str| {
        MiddlewareContext::from_message(&json!({
            "jsonrpc": "2.0", "id": 1, "method": "prompts/get", "params": { "name": name }
        }))
    };

    // Fill the cache, then touch "a" so "b" is the LRU entry.
    pipeline.execute(&ctx_for("a"), &terminal).await.unwrap();
    pipeline.execute(&ctx_for("b"), &terminal).await.unwrap();
    pipeline.execute(&ctx_for("a"), &terminal).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // "c" evicts "b"; "a" stays cached.
    pipeline.execute(&ctx_for("c"), &terminal).await.unwrap();
    pipeline.execute(&ctx_for("a"), &terminal).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // "b" was evicted, so it runs the handler again.
    pipeline.execute(&ctx_for("b"), &terminal).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_caching_ttl_expiry() {
    let caching = Arc::new(CachingMiddleware::with_config(CacheConfig {
        max_entries: None,
        ttl: Some(Duration::ZERO),
    }));
    let mut pipeline = MiddlewarePipeline::new();
    pipeline.add(caching.clone());

    let calls = Arc::new(AtomicUsize::new(0));
    let terminal_calls = Arc::clone(&calls);
    let terminal = terminal_fn(move |_ctx| {
        let calls = Arc::clone(&terminal_calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({}))
        }
    });

    let ctx = tools_list_ctx();
    pipeline.execute(&ctx, &terminal).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    pipeline.execute(&ctx, &terminal).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(caching.stats().hits, 0);
}

#[tokio::test]
async fn test_token_bucket_exhaustion() {
    let limiter = RateLimitingMiddleware::new(RateLimitConfig {
        tokens_per_second: 0.0,
        max_tokens: 3.0,
    });
    let mut pipeline = MiddlewarePipeline::new();
    pipeline.add(Arc::new(limiter));

    let ctx = tools_list_ctx();
    for _ in 0..3 {
        pipeline.execute(&ctx, &empty_terminal()).await.unwrap();
    }

    let err = pipeline.execute(&ctx, &empty_terminal()).await.unwrap_err();
    assert!(matches!(err, McpError::RateLimitExceeded));
    assert_eq!(err.to_string(), "Rate limit exceeded");
}

#[tokio::test]
async fn test_error_handling_translates_to_internal_error() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let observer_seen = Arc::clone(&seen);
    let error_handler = Arc::new(ErrorHandlingMiddleware::with_observer(Arc::new(
        move |method: &str, error: &McpError| {
            observer_seen
                .lock()
                .unwrap()
                .push(format!("{method}: {error}"));
        },
    )));

    let mut pipeline = MiddlewarePipeline::new();
    pipeline.add(error_handler.clone());

    let ctx = MiddlewareContext::from_message(&json!({
        "jsonrpc": "2.0", "id": 9, "method": "tools/call",
        "params": { "name": "boom", "arguments": {} }
    }));
    let failing = terminal_fn(|_ctx| async {
        Err(McpError::Internal("Test error".to_string()))
    });

    let response = pipeline.execute(&ctx, &failing).await.unwrap();
    assert_eq!(response["error"]["code"], -32603);
    assert!(response["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Test error"));
    assert_eq!(response["id"], "9");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].contains("tools/call"));
    assert_eq!(error_handler.error_counts().get("tools/call"), Some(&1));
}

#[tokio::test]
async fn test_error_escapes_without_error_handling_middleware() {
    let pipeline = MiddlewarePipeline::new();
    let failing = terminal_fn(|_ctx| async {
        Err(McpError::Internal("Test error".to_string()))
    });

    let err = pipeline
        .execute(&tools_list_ctx(), &failing)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Test error"));
}

#[tokio::test]
async fn test_combined_pipeline() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink_lines = Arc::clone(&lines);

    let error_handler = Arc::new(ErrorHandlingMiddleware::new());
    let logging = Arc::new(LoggingMiddleware::with_sink(
        Arc::new(move |line: &str| sink_lines.lock().unwrap().push(line.to_string())),
        false,
    ));
    let timing = Arc::new(TimingMiddleware::new());
    let caching = Arc::new(CachingMiddleware::new());

    let mut pipeline = MiddlewarePipeline::new();
    pipeline.add(error_handler); // Outermost, catches downstream failures
    pipeline.add(logging);
    pipeline.add(timing.clone());
    pipeline.add(caching.clone());

    let ctx = tools_list_ctx();
    pipeline.execute(&ctx, &empty_terminal()).await.unwrap();
    pipeline.execute(&ctx, &empty_terminal()).await.unwrap();

    assert_eq!(lines.lock().unwrap().len(), 4); // 2 requests + 2 responses

    let stats = timing.get_stats("tools/list").unwrap();
    assert_eq!(stats.request_count, 2);

    let cache_stats = caching.stats();
    assert_eq!(cache_stats.hits, 1);
    assert_eq!(cache_stats.misses, 1);
}
