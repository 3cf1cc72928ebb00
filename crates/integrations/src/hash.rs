//! bcrypt password hashing.
//!
//! bcrypt is CPU-bound, so both operations run on the blocking pool.

use async_trait::async_trait;
use common::Context;
use domain::deadline::bounded;
use domain::{DomainError, HashHandler};

use crate::error::IntegrationError;

/// Cost used in production.
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

pub struct BcryptHashHandler {
    cost: u32,
}

impl BcryptHashHandler {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHashHandler {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

#[async_trait]
impl HashHandler for BcryptHashHandler {
    async fn hash(&self, ctx: &Context, password: &str) -> domain::Result<String> {
        let password = password.to_string();
        let cost = self.cost;
        bounded(ctx, "bcrypt.hash", async move {
            let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
                .await
                .map_err(IntegrationError::from)?
                .map_err(IntegrationError::from)?;
            Ok(hashed)
        })
        .await
    }

    async fn compare(&self, ctx: &Context, hash: &str, password: &str) -> domain::Result<()> {
        let hash = hash.to_string();
        let password = password.to_string();
        let matches = bounded(ctx, "bcrypt.verify", async move {
            let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
                .await
                .map_err(IntegrationError::from)?
                .map_err(IntegrationError::from)?;
            Ok(matches)
        })
        .await?;

        if matches {
            Ok(())
        } else {
            Err(DomainError::WrongPassword)
        }
    }
}
