//! Outbound adapters for the e-book store.
//!
//! Each adapter implements one domain port and bounds its calls by the
//! request deadline:
//!
//! - [`StripePaymentClient`]: payment intents, plus webhook verification
//! - [`S3StorageClient`]: presigned GET/PUT URLs
//! - [`SesEmailClient`]: plain-text email
//! - [`JwtTokenHandler`] and [`BcryptHashHandler`]
//! - [`UuidGenerator`] and [`RandomPasswordGenerator`]

pub mod error;
pub mod generators;
pub mod hash;
pub mod jwt;
pub mod s3;
pub mod ses;
pub mod stripe;
pub mod webhook;

pub use error::{IntegrationError, Result};
pub use generators::{RandomPasswordGenerator, UuidGenerator};
pub use hash::BcryptHashHandler;
pub use jwt::JwtTokenHandler;
pub use s3::S3StorageClient;
pub use ses::SesEmailClient;
pub use stripe::{PaymentIntent, StripePaymentClient};
pub use webhook::{WebhookEvent, verify_signature};
