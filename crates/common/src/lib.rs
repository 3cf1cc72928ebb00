//! Shared building blocks for the e-book store.
//!
//! - typed identifiers
//! - the [`Query`] filter algebra and [`Page`] pagination values
//! - the request-scoped [`Context`]

pub mod context;
pub mod page;
pub mod query;
pub mod types;

pub use context::Context;
pub use page::{DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE, Page, Paginated};
pub use query::{ComparisonOperator, Condition, LogicalOperator, Node, Query, Value};
pub use types::{BookId, CartId, ImageId, OrderId, UserId};
