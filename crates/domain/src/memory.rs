//! In-memory implementations of every port.
//!
//! These back the unit tests and the HTTP integration suite. They honour
//! the same contracts as the production adapters (not-found entities,
//! unique emails, query filtering and pagination) and expose a few knobs
//! for injecting failures.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use common::{
    BookId, ComparisonOperator, Condition, Context, LogicalOperator, OrderId, Page, Paginated,
    Query, UserId, Value,
};
use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::auth::User;
use crate::catalog::Book;
use crate::error::{DomainError, Result};
use crate::ports::{
    BookRepository, CartRepository, Email, EmailClient, HashHandler, IdGenerator, OrderRepository,
    PasswordGenerator, PaymentClient, StorageClient, TokenClaims, TokenHandler, UserRepository,
};
use crate::shop::{Cart, Order, PaymentIntentStatus};

/// Exposes entity fields by column name for query evaluation.
trait Fields {
    fn field(&self, name: &str) -> Value;
}

impl Fields for User {
    fn field(&self, name: &str) -> Value {
        match name {
            "id" => self.id.as_str().into(),
            "first_name" => self.first_name.as_str().into(),
            "last_name" => self.last_name.as_str().into(),
            "email" => self.email.as_str().into(),
            "role" => self.role.as_str().into(),
            _ => Value::Null,
        }
    }
}

impl Fields for Book {
    fn field(&self, name: &str) -> Value {
        match name {
            "id" => self.id.as_str().into(),
            "title" => self.title.as_str().into(),
            "description" => self.description.as_str().into(),
            "author_name" => self.author_name.as_str().into(),
            "price" => self.price.into(),
            "content_id" => self.content_id.as_str().into(),
            _ => Value::Null,
        }
    }
}

impl Fields for Order {
    fn field(&self, name: &str) -> Value {
        match name {
            "id" => self.id.as_str().into(),
            "user_id" => self.user_id.as_str().into(),
            "status" => self.status.as_str().into(),
            "payment_intent_id" => self.payment_intent_id.clone().into(),
            _ => Value::Null,
        }
    }
}

fn holds(entity: &impl Fields, condition: &Condition) -> bool {
    let actual = entity.field(&condition.field);
    match condition.operator {
        ComparisonOperator::Equal => actual == condition.value,
        ComparisonOperator::NotEqual => actual != condition.value,
        ComparisonOperator::Match => match (&actual, &condition.value) {
            (Value::Text(haystack), Value::Text(needle)) => haystack
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => false,
        },
    }
}

/// Evaluates `query` with SQL precedence: AND binds tighter than OR.
fn matches(entity: &impl Fields, query: &Query) -> bool {
    if query.is_empty() {
        return true;
    }
    let mut any = false;
    let mut group = true;
    for node in query {
        let value = holds(entity, &node.condition);
        match node.operator {
            Some(LogicalOperator::Or) => {
                any |= group;
                group = value;
            }
            Some(LogicalOperator::And) | None => group &= value,
        }
    }
    any || group
}

fn paginate<T: Fields + Clone>(rows: &[T], query: &Query, page: Page) -> Paginated<T> {
    let hits: Vec<&T> = rows.iter().filter(|row| matches(*row, query)).collect();
    let total = hits.len() as u64;
    let items = hits
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.size() as usize)
        .cloned()
        .collect();
    Paginated::new(items, page, total)
}

fn unavailable(store: &str) -> DomainError {
    DomainError::internal(format!("{store} unavailable"))
}

/// In-memory user store with a unique email index.
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<Vec<User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_query(&self, _ctx: &Context, query: &Query, page: Page) -> Result<Paginated<User>> {
        Ok(paginate(&self.users.read().await, query, page))
    }

    async fn find_by_id(&self, _ctx: &Context, id: &UserId) -> Result<User> {
        self.users
            .read()
            .await
            .iter()
            .find(|user| &user.id == id)
            .cloned()
            .ok_or(DomainError::not_found("User"))
    }

    async fn find_by_email(&self, _ctx: &Context, email: &str) -> Result<User> {
        let email = crate::auth::normalize_email(email);
        self.users
            .read()
            .await
            .iter()
            .find(|user| user.email == email)
            .cloned()
            .ok_or(DomainError::not_found("User"))
    }

    async fn create(&self, _ctx: &Context, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(DomainError::DuplicateKey {
                field: "email".to_string(),
            });
        }
        users.push(user.clone());
        Ok(())
    }

    async fn update(&self, _ctx: &Context, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        let stored = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(DomainError::not_found("User"))?;
        *stored = user.clone();
        Ok(())
    }
}

/// In-memory book store. Counts calls so tests can assert that a request
/// never reached it.
#[derive(Clone, Default)]
pub struct InMemoryBookRepository {
    books: Arc<RwLock<Vec<Book>>>,
    calls: Arc<AtomicUsize>,
}

impl InMemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a book without going through the port.
    pub async fn insert(&self, book: Book) {
        self.books.write().await.push(book);
    }

    /// Number of port calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn find_by_query(&self, _ctx: &Context, query: &Query, page: Page) -> Result<Paginated<Book>> {
        self.record_call();
        Ok(paginate(&self.books.read().await, query, page))
    }

    async fn find_by_id(&self, _ctx: &Context, id: &BookId) -> Result<Book> {
        self.record_call();
        self.books
            .read()
            .await
            .iter()
            .find(|book| &book.id == id)
            .cloned()
            .ok_or(DomainError::not_found("book"))
    }

    async fn create(&self, _ctx: &Context, book: &Book) -> Result<()> {
        self.record_call();
        self.books.write().await.push(book.clone());
        Ok(())
    }

    async fn update(&self, _ctx: &Context, book: &Book) -> Result<()> {
        self.record_call();
        let mut books = self.books.write().await;
        let stored = books
            .iter_mut()
            .find(|b| b.id == book.id)
            .ok_or(DomainError::not_found("book"))?;
        *stored = book.clone();
        Ok(())
    }

    async fn delete(&self, _ctx: &Context, id: &BookId) -> Result<()> {
        self.record_call();
        let mut books = self.books.write().await;
        let before = books.len();
        books.retain(|book| &book.id != id);
        if books.len() == before {
            return Err(DomainError::not_found("book"));
        }
        Ok(())
    }
}

/// In-memory order store with a failure switch for writes.
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<Vec<Order>>>,
    fail: Arc<AtomicBool>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `create` and `update` fail while set.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }

    fn check_available(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(unavailable("order store"));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_query(&self, _ctx: &Context, query: &Query, page: Page) -> Result<Paginated<Order>> {
        Ok(paginate(&self.orders.read().await, query, page))
    }

    async fn find_by_id(&self, _ctx: &Context, id: &OrderId) -> Result<Order> {
        self.orders
            .read()
            .await
            .iter()
            .find(|order| &order.id == id)
            .cloned()
            .ok_or(DomainError::not_found("order"))
    }

    async fn create(&self, _ctx: &Context, order: &Order) -> Result<()> {
        self.check_available()?;
        self.orders.write().await.push(order.clone());
        Ok(())
    }

    async fn update(&self, _ctx: &Context, order: &Order) -> Result<()> {
        self.check_available()?;
        let mut orders = self.orders.write().await;
        let stored = orders
            .iter_mut()
            .find(|o| o.id == order.id)
            .ok_or(DomainError::not_found("order"))?;
        stored.status = order.status;
        stored.payment_intent_id = order.payment_intent_id.clone();
        stored.client_secret = order.client_secret.clone();
        stored.updated_at = order.updated_at;
        Ok(())
    }
}

/// In-memory cart cache. Entries never expire.
#[derive(Clone, Default)]
pub struct InMemoryCartRepository {
    carts: Arc<RwLock<HashMap<UserId, Cart>>>,
}

impl InMemoryCartRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartRepository for InMemoryCartRepository {
    async fn find_by_user_id(&self, _ctx: &Context, user_id: &UserId) -> Result<Cart> {
        self.carts
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or(DomainError::not_found("cart"))
    }

    async fn save(&self, _ctx: &Context, cart: &Cart) -> Result<()> {
        self.carts
            .write()
            .await
            .insert(cart.user_id.clone(), cart.clone());
        Ok(())
    }

    async fn delete_by_user_id(&self, _ctx: &Context, user_id: &UserId) -> Result<()> {
        self.carts.write().await.remove(user_id);
        Ok(())
    }
}

/// Fake object store that returns predictable URLs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorageClient;

impl InMemoryStorageClient {
    pub const BASE_URL: &'static str = "https://storage.test";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StorageClient for InMemoryStorageClient {
    async fn generate_get_presigned_url(&self, _ctx: &Context, key: &str) -> Result<String> {
        Ok(format!("{}/get/{key}", Self::BASE_URL))
    }

    async fn generate_put_presigned_url(&self, _ctx: &Context, key: &str) -> Result<String> {
        Ok(format!("{}/put/{key}", Self::BASE_URL))
    }
}

#[derive(Debug, Default)]
struct PaymentState {
    /// Intent ID to order ID.
    intents: HashMap<String, OrderId>,
    cancelled: Vec<String>,
    next_id: u64,
}

/// Fake payment provider. Every intent starts in `requires_payment_method`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentClient {
    state: Arc<RwLock<PaymentState>>,
    fail: Arc<AtomicBool>,
}

impl InMemoryPaymentClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes intent creation fail while set.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of intents created.
    pub async fn created(&self) -> usize {
        self.state.read().await.intents.len()
    }

    /// IDs of cancelled intents, oldest first.
    pub async fn cancelled(&self) -> Vec<String> {
        self.state.read().await.cancelled.clone()
    }

    /// The order an intent was created for.
    pub async fn order_for_intent(&self, intent_id: &str) -> Option<OrderId> {
        self.state.read().await.intents.get(intent_id).cloned()
    }
}

#[async_trait]
impl PaymentClient for InMemoryPaymentClient {
    async fn create_payment_intent_for_order(&self, _ctx: &Context, order: &mut Order) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::internal("payment declined"));
        }
        let mut state = self.state.write().await;
        state.next_id += 1;
        let intent_id = format!("pi_{:04}", state.next_id);
        state.intents.insert(intent_id.clone(), order.id.clone());

        let secret = format!("{intent_id}_secret");
        order.attach_payment_intent(intent_id, secret, PaymentIntentStatus::RequiresPaymentMethod);
        Ok(())
    }

    async fn cancel_payment_intent(&self, _ctx: &Context, payment_intent_id: &str) -> Result<()> {
        self.state
            .write()
            .await
            .cancelled
            .push(payment_intent_id.to_string());
        Ok(())
    }
}

/// Records sent emails instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmailClient {
    sent: Arc<RwLock<Vec<Email>>>,
    fail: Arc<AtomicBool>,
}

impl InMemoryEmailClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes delivery fail while set.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<Email> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl EmailClient for InMemoryEmailClient {
    async fn send(&self, _ctx: &Context, email: Email) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(unavailable("mail server"));
        }
        self.sent.write().await.push(email);
        Ok(())
    }
}

/// Issues opaque tokens backed by a lookup table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenHandler {
    tokens: Arc<DashMap<String, TokenClaims>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryTokenHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenHandler for InMemoryTokenHandler {
    fn generate(&self, claims: &TokenClaims) -> Result<String> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("token-{n}-{}", claims.id);
        self.tokens.insert(token.clone(), claims.clone());
        Ok(token)
    }

    fn parse(&self, token: &str) -> Result<TokenClaims> {
        self.tokens
            .get(token)
            .map(|claims| claims.clone())
            .ok_or(DomainError::Unauthenticated)
    }
}

/// Reversible stand-in for a password hash. Never use outside tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHashHandler;

impl InMemoryHashHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HashHandler for InMemoryHashHandler {
    async fn hash(&self, _ctx: &Context, password: &str) -> Result<String> {
        Ok(format!("hashed:{password}"))
    }

    async fn compare(&self, _ctx: &Context, hash: &str, password: &str) -> Result<()> {
        if hash.strip_prefix("hashed:") == Some(password) {
            Ok(())
        } else {
            Err(DomainError::WrongPassword)
        }
    }
}

/// Yields `prefix-1`, `prefix-2`, ...
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn new_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{n}", self.prefix)
    }
}

/// Always yields the same password.
#[derive(Debug, Clone)]
pub struct StaticPasswordGenerator(String);

impl StaticPasswordGenerator {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }
}

impl PasswordGenerator for StaticPasswordGenerator {
    fn generate(&self) -> String {
        self.0.clone()
    }
}
