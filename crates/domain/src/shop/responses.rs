//! Shop responses.

use chrono::{DateTime, Utc};
use common::{CartId, OrderId, Paginated, UserId};
use serde::Serialize;

use super::cart::{Cart, Item};
use super::order::{Order, OrderStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub id: CartId,
    pub user_id: UserId,
    pub items: Vec<Item>,
    pub total_price: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        Self {
            total_price: cart.total_price(),
            id: cart.id,
            user_id: cart.user_id,
            items: cart.items,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: OrderId,
    pub status: OrderStatus,
    pub payment_intent_id: Option<String>,
    pub client_secret: Option<String>,
    pub items: Vec<Item>,
    pub user_id: UserId,
    pub total_price: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            total_price: order.total_price(),
            id: order.id,
            status: order.status,
            payment_intent_id: order.payment_intent_id,
            client_secret: order.client_secret,
            items: order.items,
            user_id: order.user_id,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedOrdersResponse {
    pub orders: Vec<OrderResponse>,
    pub current_page: u64,
    pub total_pages: u64,
    pub total_orders: u64,
    pub per_page: u32,
}

impl From<Paginated<Order>> for PaginatedOrdersResponse {
    fn from(page: Paginated<Order>) -> Self {
        let page = page.map(OrderResponse::from);
        Self {
            current_page: page.current_page(),
            total_pages: page.total_pages(),
            total_orders: page.total_count,
            per_page: page.limit,
            orders: page.items,
        }
    }
}
