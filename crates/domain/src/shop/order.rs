//! Orders and their status machine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::{BookId, OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

use super::cart::{Cart, Item};
use super::payment::PaymentIntentStatus;

/// The state of an order.
///
/// ```text
/// Pending ──┬──► Paid
///           └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Payment intent created, awaiting the provider.
    #[default]
    Pending,
    /// Payment succeeded (terminal).
    Paid,
    /// Payment abandoned (terminal).
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Cancelled)
    }

    /// Returns true if the order may move from `self` to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Paid) | (OrderStatus::Pending, OrderStatus::Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for status strings that name no status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownOrderStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownOrderStatus;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "PAID" => Ok(OrderStatus::Paid),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownOrderStatus(other.to_string())),
        }
    }
}

/// A purchase. Items and total are fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub payment_intent_id: Option<String>,
    pub client_secret: Option<String>,
    pub items: Vec<Item>,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds a pending order by copying the cart's items.
    pub fn from_cart(id: OrderId, cart: &Cart) -> Self {
        let now = Utc::now();
        let items = cart
            .items
            .iter()
            .cloned()
            .map(|item| Item {
                order_id: id.clone(),
                ..item
            })
            .collect();

        Self {
            id,
            status: OrderStatus::Pending,
            payment_intent_id: None,
            client_secret: None,
            items,
            user_id: cart.user_id.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn total_price(&self) -> i64 {
        self.items.iter().map(|item| item.price).sum()
    }

    pub fn completed(&self) -> bool {
        self.status == OrderStatus::Paid
    }

    pub fn has_item(&self, id: &BookId) -> bool {
        self.items.iter().any(|item| &item.id == id)
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Records a freshly created payment intent and the status it implies.
    pub fn attach_payment_intent(
        &mut self,
        payment_intent_id: impl Into<String>,
        client_secret: impl Into<String>,
        status: PaymentIntentStatus,
    ) {
        self.payment_intent_id = Some(payment_intent_id.into());
        self.client_secret = Some(client_secret.into());
        self.status = status.order_status();
        self.updated_at = Utc::now();
    }

    /// Moves the order to `next`.
    ///
    /// Returns `Ok(false)` when the order already has that status, and
    /// `InvalidStatusTransition` when the move is not allowed.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<bool> {
        if self.status == next {
            return Ok(false);
        }
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::catalog::book::fixtures::book;
    use common::CartId;

    /// A pending order for `user` holding one item per book ID.
    pub fn order(id: &str, user: &str, books: &[&str]) -> Order {
        let mut cart = Cart::new(CartId::new("cart"), UserId::new(user));
        for b in books {
            cart.items.push(Item::from_book(&book(b, &[])));
        }
        Order::from_cart(OrderId::new(id), &cart)
    }
}
