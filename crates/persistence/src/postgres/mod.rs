//! PostgreSQL repositories.

mod books;
mod orders;
mod users;

pub use books::PostgresBookRepository;
pub use orders::PostgresOrderRepository;
pub use users::PostgresUserRepository;
