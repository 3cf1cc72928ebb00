//! Storage adapters for the e-book store.
//!
//! - PostgreSQL repositories for users, books and orders
//! - a Redis cart repository with per-entry TTL
//! - translation of domain queries into SQL predicates
//! - the runtime migration runner

pub mod error;
pub mod migrate;
pub mod postgres;
pub mod redis;
pub mod sql;

use std::future::Future;
use std::time::Instant;

use common::Context;
use domain::deadline::bounded;

pub use error::{PersistenceError, Result};
pub use migrate::{connect, run_migrations};
pub use postgres::{PostgresBookRepository, PostgresOrderRepository, PostgresUserRepository};
pub use redis::{RedisCartRepository, connect_redis};
pub use sql::{Predicate, SqlParam, translate};

/// Runs a storage call under the request deadline and records its latency.
pub(crate) async fn call<T, F>(ctx: &Context, operation: &'static str, fut: F) -> domain::Result<T>
where
    F: Future<Output = Result<T>>,
{
    let start = Instant::now();
    let result = bounded(ctx, operation, async { fut.await.map_err(Into::into) }).await;
    metrics::histogram!("storage_call_duration_seconds", "operation" => operation)
        .record(start.elapsed().as_secs_f64());
    if let Err(err) = &result {
        tracing::debug!(operation, error = %err, "storage call failed");
    }
    result
}
