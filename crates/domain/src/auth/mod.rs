//! Authentication bounded context.

mod requests;
mod service;
mod user;

pub use requests::{Credentials, LoginRequest, PasswordResetRequest, RegisterRequest};
pub use service::{Authenticator, PASSWORD_RESET_SUBJECT};
pub use user::{Role, User, normalize_email};
