//! Built-in Middleware
//!
//! Stock interceptors: request/response logging, per-method timing, result
//! caching with LRU eviction, token-bucket rate limiting, and uniform error
//! translation into JSON-RPC error responses. Each instance guards its own
//! state with its own mutex; no lock is ever held across another
//! middleware's work.

use {
    super::{Middleware, MiddlewareContext, Next},
    crate::error::{McpError, McpResult},
    async_trait::async_trait,
    serde_json::{json, Value},
    std::{
        collections::{HashMap, VecDeque},
        sync::{Arc, Mutex},
        time::{Duration, Instant},
    },
    tracing::info,
};

/// Destination for logging middleware lines.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Logs one line on request entry and one on response exit.
///
/// Payload logging is off by default so request bodies (which may carry
/// secrets) never reach the sink unless explicitly enabled.
pub struct LoggingMiddleware {
    sink: LogSink,
    include_payloads: bool,
}

impl LoggingMiddleware {
    /// Log through `tracing` at info level.
    pub fn new() -> Self {
        Self {
            sink: Arc::new(|line| info!("{line}")),
            include_payloads: false,
        }
    }

    /// Log through a caller-supplied sink.
    pub fn with_sink(sink: LogSink, include_payloads: bool) -> Self {
        Self {
            sink,
            include_payloads,
        }
    }
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn on_message(&self, ctx: &MiddlewareContext, next: Next<'_>) -> McpResult<Value> {
        if self.include_payloads {
            (self.sink)(&format!("REQUEST {} {}", ctx.method, ctx.message));
        } else {
            (self.sink)(&format!("REQUEST {}", ctx.method));
        }

        let result = next.run(ctx).await?;

        if self.include_payloads {
            (self.sink)(&format!("RESPONSE {} {}", ctx.method, result));
        } else {
            (self.sink)(&format!("RESPONSE {}", ctx.method));
        }
        Ok(result)
    }
}

/// Per-method call counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingStats {
    pub request_count: u64,
    pub total_duration: Duration,
}

impl TimingStats {
    pub fn total_millis(&self) -> u128 {
        self.total_duration.as_millis()
    }
}

/// Records request count and total wall time per method.
#[derive(Default)]
pub struct TimingMiddleware {
    stats: Mutex<HashMap<String, TimingStats>>,
}

impl TimingMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_stats(&self, method: &str) -> Option<TimingStats> {
        self.stats.lock().unwrap().get(method).copied()
    }
}

#[async_trait]
impl Middleware for TimingMiddleware {
    async fn on_message(&self, ctx: &MiddlewareContext, next: Next<'_>) -> McpResult<Value> {
        let started = Instant::now();
        let result = next.run(ctx).await;
        let elapsed = started.elapsed();

        let mut stats = self.stats.lock().unwrap();
        let entry = stats.entry(ctx.method.clone()).or_default();
        entry.request_count += 1;
        entry.total_duration += elapsed;
        drop(stats);

        result
    }
}

/// Caching middleware configuration. Unbounded and non-expiring by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheConfig {
    /// Maximum number of entries; least-recently-used entries are evicted
    /// once the cap is reached.
    pub max_entries: Option<usize>,
    /// Entry lifetime; expired entries are discarded on lookup.
    pub ttl: Option<Duration>,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

struct CacheEntry {
    value: Value,
    inserted: Instant,
}

struct CacheInner {
    map: HashMap<String, CacheEntry>,
    // LRU order: front is coldest, back is hottest.
    order: VecDeque<String>,
}

/// Caches successful results keyed by `(method, canonical params)`.
///
/// Cache hits bypass the rest of the chain entirely.
pub struct CachingMiddleware {
    config: CacheConfig,
    inner: Mutex<CacheInner>,
    stats: Mutex<CacheStats>,
}

impl CachingMiddleware {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(CacheInner {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock().unwrap()
    }

    // serde_json object maps are key-sorted, so serializing the params is
    // already the sorted-key canonical form.
    fn cache_key(ctx: &MiddlewareContext) -> String {
        let params = ctx.message.get("params").cloned().unwrap_or(Value::Null);
        format!("{}:{}", ctx.method, params)
    }

    fn touch(order: &mut VecDeque<String>, key: &str) {
        if let Some(position) = order.iter().position(|k| k == key) {
            order.remove(position);
        }
        order.push_back(key.to_string());
    }
}

impl Default for CachingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for CachingMiddleware {
    async fn on_message(&self, ctx: &MiddlewareContext, next: Next<'_>) -> McpResult<Value> {
        let key = Self::cache_key(ctx);

        {
            let mut inner = self.inner.lock().unwrap();
            let cached = inner.map.get(&key).and_then(|entry| {
                let expired = self
                    .config
                    .ttl
                    .is_some_and(|ttl| entry.inserted.elapsed() > ttl);
                (!expired).then(|| entry.value.clone())
            });

            if let Some(value) = cached {
                Self::touch(&mut inner.order, &key);
                self.stats.lock().unwrap().hits += 1;
                return Ok(value);
            }

            // Expired entries leave both the map and the LRU order.
            if inner.map.remove(&key).is_some() {
                if let Some(position) = inner.order.iter().position(|k| k == &key) {
                    inner.order.remove(position);
                }
            }
            self.stats.lock().unwrap().misses += 1;
        }

        let value = next.run(ctx).await?;

        let mut inner = self.inner.lock().unwrap();
        inner.map.insert(
            key.clone(),
            CacheEntry {
                value: value.clone(),
                inserted: Instant::now(),
            },
        );
        Self::touch(&mut inner.order, &key);
        if let Some(max) = self.config.max_entries {
            while inner.map.len() > max {
                let Some(coldest) = inner.order.pop_front() else {
                    break;
                };
                inner.map.remove(&coldest);
            }
        }

        Ok(value)
    }
}

/// Token-bucket configuration.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub tokens_per_second: f64,
    pub max_tokens: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            tokens_per_second: 10.0,
            max_tokens: 20.0,
        }
    }
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket rate limiting across the whole pipeline.
///
/// The bucket starts full, refills proportionally to elapsed time, and
/// rejects calls once less than one token remains.
pub struct RateLimitingMiddleware {
    config: RateLimitConfig,
    bucket: Mutex<Bucket>,
}

impl RateLimitingMiddleware {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            bucket: Mutex::new(Bucket {
                tokens: config.max_tokens,
                last_refill: Instant::now(),
            }),
            config,
        }
    }
}

impl Default for RateLimitingMiddleware {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[async_trait]
impl Middleware for RateLimitingMiddleware {
    async fn on_message(&self, ctx: &MiddlewareContext, next: Next<'_>) -> McpResult<Value> {
        {
            let mut bucket = self.bucket.lock().unwrap();
            let now = Instant::now();
            let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
            bucket.tokens =
                (bucket.tokens + elapsed * self.config.tokens_per_second).min(self.config.max_tokens);
            bucket.last_refill = now;

            if bucket.tokens < 1.0 {
                return Err(McpError::RateLimitExceeded);
            }
            bucket.tokens -= 1.0;
        }

        next.run(ctx).await
    }
}

/// Callback invoked with `(method, error)` for every translated failure.
pub type ErrorObserver = Arc<dyn Fn(&str, &McpError) + Send + Sync>;

/// Translates downstream errors into JSON-RPC `-32603` responses.
///
/// Normally added first so it wraps everything else in the chain; without
/// it, errors propagate out of the pipeline to the transport.
#[derive(Default)]
pub struct ErrorHandlingMiddleware {
    observer: Option<ErrorObserver>,
    counts: Mutex<HashMap<String, u64>>,
}

impl ErrorHandlingMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(observer: ErrorObserver) -> Self {
        Self {
            observer: Some(observer),
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// Per-method count of errors translated so far.
    pub fn error_counts(&self) -> HashMap<String, u64> {
        self.counts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Middleware for ErrorHandlingMiddleware {
    async fn on_message(&self, ctx: &MiddlewareContext, next: Next<'_>) -> McpResult<Value> {
        match next.run(ctx).await {
            Ok(value) => Ok(value),
            Err(error) => {
                *self
                    .counts
                    .lock()
                    .unwrap()
                    .entry(ctx.method.clone())
                    .or_insert(0) += 1;
                if let Some(observer) = &self.observer {
                    observer(&ctx.method, &error);
                }

                let id = match &ctx.request_id {
                    Some(id) => json!(id),
                    None => Value::Null,
                };
                Ok(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {
                        "code": -32603,
                        "message": error.to_string(),
                    }
                }))
            }
        }
    }
}
