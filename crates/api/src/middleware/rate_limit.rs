//! Per-client token-bucket rate limiting.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use dashmap::DashMap;

use crate::error::ApiError;

/// Buckets idle this long are dropped during pruning.
const IDLE_BUCKET_TTL: Duration = Duration::from_secs(3600);

/// Pruning kicks in once this many clients are tracked.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    updated: Instant,
}

/// Token buckets keyed by client address. Each bucket holds up to
/// `per_hour` tokens and refills continuously.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
    capacity: f64,
    refill_per_sec: f64,
}

impl RateLimiter {
    pub fn per_hour(limit: u32) -> Self {
        let capacity = f64::from(limit.max(1));
        Self {
            buckets: DashMap::new(),
            capacity,
            refill_per_sec: capacity / 3600.0,
        }
    }

    /// Takes one token for `key`, or returns how long until one is available.
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
        if self.buckets.len() >= PRUNE_THRESHOLD {
            self.buckets
                .retain(|_, bucket| now.saturating_duration_since(bucket.updated) < IDLE_BUCKET_TTL);
        }

        let mut bucket = self.buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: self.capacity,
            updated: now,
        });

        let elapsed = now.saturating_duration_since(bucket.updated).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.updated = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let wait = (1.0 - bucket.tokens) / self.refill_per_sec;
            Err(Duration::from_secs_f64(wait))
        }
    }
}

/// Identifies the client: first `X-Forwarded-For` hop, then the peer
/// address, then a shared fallback key.
fn client_key(req: &Request) -> String {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Answers 429 with `Retry-After` once a client runs out of tokens.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client_key(&req);
    if let Err(wait) = limiter.check(&key) {
        tracing::warn!(client = %key, "rate limit exceeded");
        return Err(ApiError::TooManyRequests {
            retry_after_secs: wait.as_secs_f64().ceil().max(1.0) as u64,
        });
    }
    Ok(next.run(req).await)
}
