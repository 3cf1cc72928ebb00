//! Request middleware, listed from outermost to innermost as applied by
//! [`crate::create_app`].

pub mod access_log;
pub mod auth;
pub mod context;
pub mod rate_limit;

pub use access_log::log_response;
pub use auth::{authenticate, bearer_token};
pub use context::{REQUEST_ID_HEADER, RequestContext, request_context};
pub use rate_limit::{RateLimiter, rate_limit};
