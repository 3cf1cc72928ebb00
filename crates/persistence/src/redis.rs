//! Redis-backed cart storage.
//!
//! Each cart is one JSON string under the owner's user ID, written with
//! `SET EX` so every save refreshes the expiry.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::Pool;
use bb8_redis::redis::AsyncCommands;
use common::{Context, UserId};
use domain::{Cart, CartRepository};

use crate::call;
use crate::error::{PersistenceError, Result};

/// Builds the connection URL from its parts.
pub fn redis_url(addr: &str, password: Option<&str>, db: u32) -> String {
    match password.filter(|p| !p.is_empty()) {
        Some(password) => format!("redis://:{password}@{addr}/{db}"),
        None => format!("redis://{addr}/{db}"),
    }
}

/// Opens a Redis connection pool.
pub async fn connect_redis(
    addr: &str,
    password: Option<&str>,
    db: u32,
) -> Result<Pool<RedisConnectionManager>> {
    let manager = RedisConnectionManager::new(redis_url(addr, password, db))?;
    let pool = Pool::builder()
        .max_size(16)
        .connection_timeout(Duration::from_secs(5))
        .build(manager)
        .await?;
    Ok(pool)
}

/// Cart repository that keeps carts in Redis with a sliding TTL.
#[derive(Clone)]
pub struct RedisCartRepository {
    pool: Pool<RedisConnectionManager>,
    ttl: Duration,
}

impl RedisCartRepository {
    pub fn new(pool: Pool<RedisConnectionManager>, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    async fn load(&self, user_id: &UserId) -> Result<Cart> {
        let mut conn = self.pool.get().await?;
        let raw: Option<String> = conn.get(user_id.as_str()).await?;
        let raw = raw.ok_or(PersistenceError::NotFound { entity: "cart" })?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn store(&self, cart: &Cart) -> Result<()> {
        let json = serde_json::to_string(cart)?;
        let mut conn = self.pool.get().await?;
        let () = conn
            .set_ex(cart.user_id.as_str(), json, self.ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    async fn remove(&self, user_id: &UserId) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let _: i64 = conn.del(user_id.as_str()).await?;
        Ok(())
    }
}

#[async_trait]
impl CartRepository for RedisCartRepository {
    async fn find_by_user_id(&self, ctx: &Context, user_id: &UserId) -> domain::Result<Cart> {
        call(ctx, "carts.find_by_user_id", self.load(user_id)).await
    }

    async fn save(&self, ctx: &Context, cart: &Cart) -> domain::Result<()> {
        call(ctx, "carts.save", self.store(cart)).await
    }

    async fn delete_by_user_id(&self, ctx: &Context, user_id: &UserId) -> domain::Result<()> {
        call(ctx, "carts.delete_by_user_id", self.remove(user_id)).await
    }
}
