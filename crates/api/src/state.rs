//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use domain::{Authenticator, Catalog, Shop};

use crate::config::DEFAULT_RATE_LIMIT_PER_HOUR;

/// Services shared by every handler.
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    pub catalog: Arc<Catalog>,
    pub shop: Arc<Shop>,
    /// Enables `Stripe-Signature` verification on the webhook when set.
    pub webhook_secret: Option<String>,
}

/// Transport limits applied by the middleware chain.
#[derive(Debug, Clone, Copy)]
pub struct HttpSettings {
    pub request_timeout: Duration,
    pub rate_limit_per_hour: u32,
    pub body_limit_bytes: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            rate_limit_per_hour: DEFAULT_RATE_LIMIT_PER_HOUR,
            body_limit_bytes: 2 * 1024 * 1024,
        }
    }
}
