/// Rate limiting middleware
///
/// Token bucket rate limiting with Redis-backed state so limits hold across
/// API instances. Authenticated requests are limited per user; anonymous
/// requests (register/login/refresh) per client address.
///
/// # Limits
///
/// 50 requests per hour for both user and anonymous buckets.
///
/// # Algorithm
///
/// Token bucket:
/// - Tokens refill at a constant rate
/// - Each request consumes 1 token
/// - Request rejected with 429 if the bucket is empty
///
/// State lives in Redis under `throttle:user:{id}` / `throttle:anon:{addr}`
/// with a TTL of twice the window for self-cleanup. Refill-and-consume runs
/// as a single Lua script, so concurrent requests cannot double-spend.
///
/// # Headers
///
/// Responses include:
/// - `X-RateLimit-Limit`: requests allowed per window
/// - `X-RateLimit-Remaining`: tokens remaining
/// - `Retry-After`: seconds to wait (429 responses only)

use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::{SystemTime, UNIX_EPOCH};
use taskdeck_shared::auth::middleware::AuthUser;

/// Requests admitted per window
pub const REQUESTS_PER_WINDOW: u32 = 50;

/// Window length in seconds (one hour)
pub const WINDOW_SECONDS: u64 = 3600;

/// Rate limit configuration
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    /// Maximum tokens in the bucket (burst capacity)
    pub bucket_capacity: u32,

    /// Token refill rate (tokens per second)
    pub refill_rate: f64,
}

impl Default for RateLimit {
    fn default() -> Self {
        RateLimit {
            bucket_capacity: REQUESTS_PER_WINDOW,
            refill_rate: REQUESTS_PER_WINDOW as f64 / WINDOW_SECONDS as f64,
        }
    }
}

/// Result of a rate limit check
#[derive(Debug)]
pub struct RateLimitResult {
    /// Whether the request is admitted
    pub ok: bool,

    /// Tokens remaining after this request
    pub remaining: u32,

    /// Seconds until a token is available (only meaningful when rejected)
    pub reset_after: u64,
}

/// Rate limiting middleware layer
///
/// Keyed per authenticated user when [`AuthUser`] is present in request
/// extensions (i.e. the auth middleware ran first), otherwise per client
/// address.
///
/// # Errors
///
/// - 429 Too Many Requests: limit exceeded (fixed message, Retry-After set)
/// - 500 Internal Server Error: Redis failure
pub async fn rate_limit_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = match request.extensions().get::<AuthUser>() {
        Some(auth) => format!("throttle:user:{}", auth.user_id),
        None => format!("throttle:anon:{}", client_addr(&request)),
    };

    let limit = RateLimit::default();
    let result = check_rate_limit(&state.cache, &key, limit).await?;

    if !result.ok {
        tracing::warn!(key = %key, retry_after = result.reset_after, "Request throttled");
        return Err(ApiError::RateLimitExceeded {
            retry_after: result.reset_after,
        });
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        "X-RateLimit-Limit",
        HeaderValue::from_str(&limit.bucket_capacity.to_string())
            .unwrap_or(HeaderValue::from_static("0")),
    );
    headers.insert(
        "X-RateLimit-Remaining",
        HeaderValue::from_str(&result.remaining.to_string())
            .unwrap_or(HeaderValue::from_static("0")),
    );

    Ok(response)
}

/// Best-effort client address for anonymous buckets
///
/// Prefers proxy headers; falls back to a shared bucket when none is
/// present.
fn client_addr(request: &Request) -> String {
    for header in ["x-forwarded-for", "x-real-ip"] {
        if let Some(value) = request.headers().get(header).and_then(|v| v.to_str().ok()) {
            // X-Forwarded-For may carry a chain; the first hop is the client
            if let Some(first) = value.split(',').next() {
                let trimmed = first.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
        }
    }
    "unknown".to_string()
}

/// Checks the rate limit via an atomic Redis token bucket
///
/// The Lua script refills by elapsed time, consumes one token, and sets a
/// TTL of twice the window so idle buckets clean themselves up.
async fn check_rate_limit(
    cache: &taskdeck_shared::cache::CacheClient,
    key: &str,
    limit: RateLimit,
) -> Result<RateLimitResult, ApiError> {
    let mut conn = cache.connection();

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let script = redis::Script::new(
        r#"
        local key = KEYS[1]
        local capacity = tonumber(ARGV[1])
        local refill_rate = tonumber(ARGV[2])
        local now = tonumber(ARGV[3])
        local ttl = tonumber(ARGV[4])

        local bucket = redis.call('HMGET', key, 'tokens', 'last_refill')
        local tokens = tonumber(bucket[1])
        local last_refill = tonumber(bucket[2])

        if not tokens then
            tokens = capacity
            last_refill = now
        end

        local elapsed = now - last_refill
        tokens = math.min(capacity, tokens + (elapsed * refill_rate))

        if tokens >= 1 then
            tokens = tokens - 1
            redis.call('HMSET', key, 'tokens', tokens, 'last_refill', now)
            redis.call('EXPIRE', key, ttl)
            return {1, math.floor(tokens), 0}
        else
            redis.call('HMSET', key, 'tokens', tokens, 'last_refill', now)
            redis.call('EXPIRE', key, ttl)
            return {0, 0, math.ceil((1 - tokens) / refill_rate)}
        end
        "#,
    );

    let result: Vec<i64> = script
        .key(key)
        .arg(limit.bucket_capacity)
        .arg(limit.refill_rate)
        .arg(now)
        .arg(WINDOW_SECONDS * 2)
        .invoke_async(&mut conn)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Rate limit script failed");
            ApiError::InternalError("Rate limit check failed".to_string())
        })?;

    Ok(RateLimitResult {
        ok: result.first().copied() == Some(1),
        remaining: result.get(1).copied().unwrap_or(0) as u32,
        reset_after: result.get(2).copied().unwrap_or(0) as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_default() {
        let limit = RateLimit::default();
        assert_eq!(limit.bucket_capacity, 50);
        // 50 tokens per hour
        assert!((limit.refill_rate - 50.0 / 3600.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_constants() {
        assert_eq!(REQUESTS_PER_WINDOW, 50);
        assert_eq!(WINDOW_SECONDS, 3600);
    }

    #[test]
    fn test_refill_rate_covers_window() {
        // A full window's refill should restore the whole bucket
        let limit = RateLimit::default();
        let refilled = limit.refill_rate * WINDOW_SECONDS as f64;
        assert!((refilled - limit.bucket_capacity as f64).abs() < 1e-6);
    }

    // The Redis-backed path is covered by ignored integration tests in tests/
}
