//! Authenticator service: registration, login and password reset.

use std::sync::Arc;

use common::{Context, UserId};

use crate::error::{Result, ResultExt};
use crate::ports::{
    Email, EmailClient, HashHandler, IdGenerator, PasswordGenerator, TokenClaims, TokenHandler,
    UserRepository,
};
use crate::validation::validate;

use super::requests::{Credentials, LoginRequest, PasswordResetRequest, RegisterRequest};
use super::user::{User, normalize_email};

/// Subject line of the password-reset email.
pub const PASSWORD_RESET_SUBJECT: &str = "Your password has been reset";

/// Establishes and verifies user identity.
pub struct Authenticator {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenHandler>,
    hasher: Arc<dyn HashHandler>,
    email: Arc<dyn EmailClient>,
    ids: Arc<dyn IdGenerator>,
    passwords: Arc<dyn PasswordGenerator>,
}

impl Authenticator {
    /// Creates an authenticator over its collaborators.
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenHandler>,
        hasher: Arc<dyn HashHandler>,
        email: Arc<dyn EmailClient>,
        ids: Arc<dyn IdGenerator>,
        passwords: Arc<dyn PasswordGenerator>,
    ) -> Self {
        Self {
            users,
            tokens,
            hasher,
            email,
            ids,
            passwords,
        }
    }

    /// Creates a customer account and returns its credentials.
    #[tracing::instrument(skip(self, ctx, req), fields(email = %req.email))]
    pub async fn register(&self, ctx: &Context, req: RegisterRequest) -> Result<Credentials> {
        validate(&req)?;

        let id = UserId::new(self.ids.new_id());
        let password_hash = self
            .hasher
            .hash(ctx, &req.password)
            .await
            .context("hash password")?;

        let user = User::new_customer(id, req.first_name, req.last_name, &req.email, password_hash);
        self.users
            .create(ctx, &user)
            .await
            .with_context(|| format!("create user {}", user.email))?;

        metrics::counter!("users_registered_total").increment(1);
        tracing::info!(user_id = %user.id, "user registered");

        self.issue(&user)
    }

    /// Verifies email and password and returns fresh credentials.
    #[tracing::instrument(skip(self, ctx, req), fields(email = %req.email))]
    pub async fn login(&self, ctx: &Context, req: LoginRequest) -> Result<Credentials> {
        validate(&req)?;

        let email = normalize_email(&req.email);
        let user = self
            .users
            .find_by_email(ctx, &email)
            .await
            .with_context(|| format!("find user {email}"))?;

        // WrongPassword is returned bare so the transport maps it to 401.
        self.hasher.compare(ctx, &user.password_hash, &req.password).await?;

        self.issue(&user)
    }

    /// Replaces the user's password with a generated one and emails it.
    ///
    /// The email is sent before the new hash is stored, so a delivery
    /// failure leaves the old password in place.
    #[tracing::instrument(skip(self, ctx, req), fields(email = %req.email))]
    pub async fn reset_password(&self, ctx: &Context, req: PasswordResetRequest) -> Result<()> {
        validate(&req)?;

        let email = normalize_email(&req.email);
        let mut user = self
            .users
            .find_by_email(ctx, &email)
            .await
            .with_context(|| format!("find user {email}"))?;

        let password = self.passwords.generate();
        let password_hash = self
            .hasher
            .hash(ctx, &password)
            .await
            .context("hash generated password")?;

        self.email
            .send(ctx, password_reset_email(&user, &password))
            .await
            .with_context(|| format!("send password reset email to {email}"))?;

        user.password_hash = password_hash;
        self.users
            .update(ctx, &user)
            .await
            .with_context(|| format!("update user {}", user.id))?;

        tracing::info!(user_id = %user.id, "password reset");
        Ok(())
    }

    /// Parses a bearer token into its claims.
    pub fn authenticate(&self, token: &str) -> Result<TokenClaims> {
        self.tokens.parse(token)
    }

    fn issue(&self, user: &User) -> Result<Credentials> {
        let token = self
            .tokens
            .generate(&TokenClaims::for_user(user))
            .with_context(|| format!("issue token for {}", user.id))?;
        Ok(Credentials { token })
    }
}

fn password_reset_email(user: &User, password: &str) -> Email {
    Email {
        to: user.email.clone(),
        subject: PASSWORD_RESET_SUBJECT.to_string(),
        body: format!(
            "Hello {},\n\nYour password has been reset. Your new password is: {}\n\nPlease change it after logging in.",
            user.full_name(),
            password
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::error::{DomainError, ErrorKind};
    use crate::memory::{
        InMemoryEmailClient, InMemoryHashHandler, InMemoryTokenHandler, InMemoryUserRepository,
        SequentialIdGenerator, StaticPasswordGenerator,
    };

    struct Harness {
        auth: Authenticator,
        users: Arc<InMemoryUserRepository>,
        email: Arc<InMemoryEmailClient>,
        tokens: Arc<InMemoryTokenHandler>,
    }

    fn harness() -> Harness {
        let users = Arc::new(InMemoryUserRepository::new());
        let email = Arc::new(InMemoryEmailClient::new());
        let tokens = Arc::new(InMemoryTokenHandler::new());
        let auth = Authenticator::new(
            users.clone(),
            tokens.clone(),
            Arc::new(InMemoryHashHandler::new()),
            email.clone(),
            Arc::new(SequentialIdGenerator::new("user")),
            Arc::new(StaticPasswordGenerator::new("NewPass1")),
        );
        Harness {
            auth,
            users,
            email,
            tokens,
        }
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: "Raphael".to_string(),
            last_name: "Collin".to_string(),
            email: email.to_string(),
            password: "password".to_string(),
            password_confirmation: "password".to_string(),
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_persists_customer_and_issues_token() {
        let h = harness();
        let ctx = Context::new();

        let creds = h
            .auth
            .register(&ctx, register_request("raphael@test.com"))
            .await
            .unwrap();
        assert!(!creds.token.is_empty());

        let user = h.users.find_by_email(&ctx, "raphael@test.com").await.unwrap();
        assert_eq!(user.role, Role::Customer);
        assert_ne!(user.password_hash, "password");

        let claims = h.tokens.parse(&creds.token).unwrap();
        assert_eq!(claims.id, user.id);
        assert_eq!(claims.full_name, "Raphael Collin");
        assert!(!claims.is_admin);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_is_conflict() {
        let h = harness();
        let ctx = Context::new();
        h.auth
            .register(&ctx, register_request("raphael@test.com"))
            .await
            .unwrap();

        let err = h
            .auth
            .register(&ctx, register_request("Raphael@Test.com"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(matches!(err.leaf(), DomainError::DuplicateKey { field } if field == "email"));
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_request() {
        let h = harness();
        let mut req = register_request("not-an-email");
        req.password_confirmation = "different".to_string();

        let err = h.auth.register(&Context::new(), req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(h.users.is_empty().await);
    }

    #[tokio::test]
    async fn test_login_with_correct_password() {
        let h = harness();
        let ctx = Context::new();
        h.auth
            .register(&ctx, register_request("raphael@test.com"))
            .await
            .unwrap();

        let creds = h
            .auth
            .login(&ctx, login_request("raphael@test.com", "password"))
            .await
            .unwrap();
        assert!(!creds.token.is_empty());
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let h = harness();
        let ctx = Context::new();
        h.auth
            .register(&ctx, register_request("raphael@test.com"))
            .await
            .unwrap();

        let err = h
            .auth
            .login(&ctx, login_request("raphael@test.com", "password2"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::WrongPassword));
        assert_eq!(err.kind(), ErrorKind::WrongPassword);
    }

    #[tokio::test]
    async fn test_login_unknown_user_is_not_found() {
        let h = harness();
        let err = h
            .auth
            .login(&Context::new(), login_request("ghost@test.com", "password"))
            .await
            .unwrap_err();
        assert!(err.is_not_found("User"));
    }

    #[tokio::test]
    async fn test_reset_password_emails_and_updates_hash() {
        let h = harness();
        let ctx = Context::new();
        h.auth
            .register(&ctx, register_request("raphael@test.com"))
            .await
            .unwrap();

        h.auth
            .reset_password(
                &ctx,
                PasswordResetRequest {
                    email: "raphael@test.com".to_string(),
                },
            )
            .await
            .unwrap();

        let sent = h.email.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "raphael@test.com");
        assert!(sent[0].body.contains("NewPass1"));

        h.auth
            .login(&ctx, login_request("raphael@test.com", "NewPass1"))
            .await
            .unwrap();
        let err = h
            .auth
            .login(&ctx, login_request("raphael@test.com", "password"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WrongPassword);
    }

    #[tokio::test]
    async fn test_reset_password_keeps_old_password_when_email_fails() {
        let h = harness();
        let ctx = Context::new();
        h.auth
            .register(&ctx, register_request("raphael@test.com"))
            .await
            .unwrap();
        h.email.set_fail(true);

        let err = h
            .auth
            .reset_password(
                &ctx,
                PasswordResetRequest {
                    email: "raphael@test.com".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);

        h.auth
            .login(&ctx, login_request("raphael@test.com", "password"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reset_password_unknown_email() {
        let h = harness();
        let err = h
            .auth
            .reset_password(
                &Context::new(),
                PasswordResetRequest {
                    email: "ghost@test.com".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EntityNotFound);
        assert!(h.email.sent().await.is_empty());
    }
}
