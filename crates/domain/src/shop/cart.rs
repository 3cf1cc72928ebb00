//! Shopping cart and line items.

use chrono::{DateTime, Utc};
use common::{BookId, CartId, ImageId, OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::catalog::Book;
use crate::error::{DomainError, Result};

/// A purchasable line. The ID is the book ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: BookId,
    pub name: String,
    pub price: i64,
    pub preview_image_id: ImageId,
    /// Empty while the item sits in a cart.
    #[serde(default)]
    pub order_id: OrderId,
}

impl Item {
    /// Snapshots a book into a cart line.
    pub fn from_book(book: &Book) -> Self {
        Self {
            id: book.id.clone(),
            name: book.title.clone(),
            price: book.price,
            preview_image_id: book.main_image_id(),
            order_id: OrderId::default(),
        }
    }
}

/// The single pending selection of a user. Item IDs are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub items: Vec<Item>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart for `user_id`.
    pub fn new(id: CartId, user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_item(&self, id: &BookId) -> bool {
        self.items.iter().any(|item| &item.id == id)
    }

    /// Appends `item`, rejecting duplicates.
    pub fn add_item(&mut self, item: Item) -> Result<()> {
        if self.has_item(&item.id) {
            return Err(DomainError::ItemAlreadyInCart);
        }
        self.items.push(item);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn remove_item(&mut self, id: &BookId) -> Result<()> {
        let index = self
            .items
            .iter()
            .position(|item| &item.id == id)
            .ok_or(DomainError::ItemNotFoundInCart)?;
        self.items.remove(index);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn total_price(&self) -> i64 {
        self.items.iter().map(|item| item.price).sum()
    }
}
