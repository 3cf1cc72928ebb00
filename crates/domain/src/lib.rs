//! Domain layer of the e-book store.
//!
//! This crate provides:
//! - the entities (users, books, carts, orders) and their invariants
//! - the [`Authenticator`], [`Catalog`] and [`Shop`] services
//! - the ports the services consume, as `Send + Sync` traits
//! - in-memory implementations of every port for tests

pub mod auth;
pub mod catalog;
pub mod deadline;
pub mod error;
pub mod memory;
pub mod ports;
pub mod shop;
pub mod validation;

pub use auth::{Authenticator, Credentials, Role, User};
pub use catalog::{Book, Catalog, Image};
pub use error::{BoxError, DomainError, ErrorKind, Result, ResultExt};
pub use ports::{
    BookRepository, CartRepository, Email, EmailClient, HashHandler, IdGenerator, OrderRepository,
    PasswordGenerator, PaymentClient, StorageClient, TokenClaims, TokenHandler, UserRepository,
};
pub use shop::{Cart, Item, Order, OrderStatus, PaymentIntentStatus, Shop};
