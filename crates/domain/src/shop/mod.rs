//! Shop bounded context.

mod cart;
pub(crate) mod order;
mod payment;
mod requests;
mod responses;
mod service;

pub use cart::{Cart, Item};
pub use order::{Order, OrderStatus, UnknownOrderStatus};
pub use payment::PaymentIntentStatus;
pub use requests::{DownloadItem, SearchOrders};
pub use responses::{CartResponse, OrderResponse, PaginatedOrdersResponse};
pub use service::Shop;
