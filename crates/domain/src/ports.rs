//! Capabilities the domain consumes from the outside world.
//!
//! Each trait is a narrow seam: repositories own aggregates, clients wrap a
//! single outbound service, and handlers hold only immutable configuration.
//! Every method that may suspend takes the request [`Context`] so adapters
//! can bound the call by its deadline.

use async_trait::async_trait;
use common::{BookId, Context, OrderId, Page, Paginated, Query, UserId};
use serde::{Deserialize, Serialize};

use crate::auth::User;
use crate::catalog::Book;
use crate::error::Result;
use crate::shop::{Cart, Order};

/// Persistence for [`User`] aggregates.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Returns users matching `query`, one page at a time.
    async fn find_by_query(&self, ctx: &Context, query: &Query, page: Page)
    -> Result<Paginated<User>>;

    /// Returns the user with `id`, or `EntityNotFound("User")`.
    async fn find_by_id(&self, ctx: &Context, id: &UserId) -> Result<User>;

    /// Returns the user registered under the (normalized) email.
    async fn find_by_email(&self, ctx: &Context, email: &str) -> Result<User>;

    /// Inserts a new user. A taken email yields `DuplicateKey("email")`.
    async fn create(&self, ctx: &Context, user: &User) -> Result<()>;

    /// Overwrites the mutable fields of an existing user.
    async fn update(&self, ctx: &Context, user: &User) -> Result<()>;
}

/// Persistence for [`Book`] aggregates and their images.
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn find_by_query(&self, ctx: &Context, query: &Query, page: Page)
    -> Result<Paginated<Book>>;

    /// Returns the book with `id`, or `EntityNotFound("book")`.
    async fn find_by_id(&self, ctx: &Context, id: &BookId) -> Result<Book>;

    async fn create(&self, ctx: &Context, book: &Book) -> Result<()>;

    /// Updates the book row and replaces its image set.
    async fn update(&self, ctx: &Context, book: &Book) -> Result<()>;

    /// Deletes the book and its images; `EntityNotFound("book")` if nothing
    /// was deleted.
    async fn delete(&self, ctx: &Context, id: &BookId) -> Result<()>;
}

/// Persistence for [`Order`] aggregates and their items.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_query(&self, ctx: &Context, query: &Query, page: Page)
    -> Result<Paginated<Order>>;

    /// Returns the order with `id`, or `EntityNotFound("order")`.
    async fn find_by_id(&self, ctx: &Context, id: &OrderId) -> Result<Order>;

    /// Inserts the order together with its items.
    async fn create(&self, ctx: &Context, order: &Order) -> Result<()>;

    /// Persists status and payment fields. Items are never rewritten.
    async fn update(&self, ctx: &Context, order: &Order) -> Result<()>;
}

/// TTL-bounded storage for carts, keyed by user.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Returns the user's cart, or `EntityNotFound("cart")`.
    async fn find_by_user_id(&self, ctx: &Context, user_id: &UserId) -> Result<Cart>;

    /// Stores the cart and refreshes its TTL.
    async fn save(&self, ctx: &Context, cart: &Cart) -> Result<()>;

    async fn delete_by_user_id(&self, ctx: &Context, user_id: &UserId) -> Result<()>;
}

/// Issues short-lived presigned URLs for the object store.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn generate_get_presigned_url(&self, ctx: &Context, key: &str) -> Result<String>;

    async fn generate_put_presigned_url(&self, ctx: &Context, key: &str) -> Result<String>;
}

/// Creates and cancels payment intents.
#[async_trait]
pub trait PaymentClient: Send + Sync {
    /// Creates an intent for the order total and records the intent ID,
    /// client secret and provisional status on `order`.
    async fn create_payment_intent_for_order(&self, ctx: &Context, order: &mut Order)
    -> Result<()>;

    /// Cancels an intent that will never be paid.
    async fn cancel_payment_intent(&self, ctx: &Context, payment_intent_id: &str) -> Result<()>;
}

/// Identity carried inside a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub is_admin: bool,
}

impl TokenClaims {
    /// Builds the claims for `user`.
    pub fn for_user(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            full_name: user.full_name(),
            is_admin: user.is_admin(),
        }
    }
}

/// Produces and parses opaque bearer tokens.
pub trait TokenHandler: Send + Sync {
    fn generate(&self, claims: &TokenClaims) -> Result<String>;

    /// Fails with `Unauthenticated` for tokens it did not issue.
    fn parse(&self, token: &str) -> Result<TokenClaims>;
}

/// One-way password hashing.
#[async_trait]
pub trait HashHandler: Send + Sync {
    async fn hash(&self, ctx: &Context, password: &str) -> Result<String>;

    /// Fails with `WrongPassword` when `password` does not match `hash`.
    async fn compare(&self, ctx: &Context, hash: &str, password: &str) -> Result<()>;
}

/// A plain-text email message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound email delivery.
#[async_trait]
pub trait EmailClient: Send + Sync {
    async fn send(&self, ctx: &Context, email: Email) -> Result<()>;
}

/// Allocates fresh opaque identifiers.
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> String;
}

/// Generates throwaway passwords for resets.
pub trait PasswordGenerator: Send + Sync {
    fn generate(&self) -> String;
}
