//! Integration error types.

use domain::DomainError;
use thiserror::Error;

/// Errors raised by outbound adapters.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// The payment provider answered with a non-success status.
    #[error("payment provider returned {status}: {message}")]
    PaymentProvider { status: u16, message: String },

    /// Transport failure talking to an HTTP service.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Presigning failed.
    #[error("object storage error: {0}")]
    Storage(String),

    /// The mail service rejected or failed the send.
    #[error("email delivery error: {0}")]
    Email(String),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("password hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    /// A blocking task panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The webhook signature header is missing, malformed or wrong.
    #[error("invalid webhook signature: {0}")]
    InvalidSignature(&'static str),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for integration results.
pub type Result<T> = std::result::Result<T, IntegrationError>;

impl From<IntegrationError> for DomainError {
    fn from(err: IntegrationError) -> Self {
        DomainError::internal(err)
    }
}
