//! Shop service: carts, orders and paid downloads.

use std::sync::Arc;

use common::{BookId, CartId, Context, OrderId, UserId};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::catalog::{Catalog, UrlResponse};
use crate::error::{DomainError, Result, ResultExt};
use crate::ports::{CartRepository, IdGenerator, OrderRepository, PaymentClient};

use super::cart::{Cart, Item};
use super::order::{Order, OrderStatus};
use super::requests::{DownloadItem, SearchOrders};
use super::responses::{CartResponse, OrderResponse, PaginatedOrdersResponse};

/// Runs the purchase flow from cart to download.
pub struct Shop {
    catalog: Arc<Catalog>,
    carts: Arc<dyn CartRepository>,
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentClient>,
    ids: Arc<dyn IdGenerator>,
    /// Serializes cart read-modify-write cycles per user.
    cart_locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl Shop {
    pub fn new(
        catalog: Arc<Catalog>,
        carts: Arc<dyn CartRepository>,
        orders: Arc<dyn OrderRepository>,
        payments: Arc<dyn PaymentClient>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            catalog,
            carts,
            orders,
            payments,
            ids,
            cart_locks: DashMap::new(),
        }
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn get_cart(&self, ctx: &Context) -> Result<CartResponse> {
        let user_id = caller(ctx)?;
        let cart = self.find_cart(ctx, user_id).await?;
        Ok(cart.into())
    }

    /// Adds the book to the caller's cart, creating the cart if needed.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn add_item_to_cart(&self, ctx: &Context, item_id: &BookId) -> Result<CartResponse> {
        let user_id = caller(ctx)?;
        let book = self.catalog.book(ctx, item_id).await?;

        let _lease = self.lock_cart(user_id).await;

        let mut cart = match self.find_cart(ctx, user_id).await {
            Ok(cart) => cart,
            Err(err) if err.is_not_found("cart") => {
                Cart::new(CartId::new(self.ids.new_id()), user_id.clone())
            }
            Err(err) => return Err(err),
        };
        cart.add_item(Item::from_book(&book))?;
        self.save_cart(ctx, &cart).await?;

        metrics::counter!("cart_items_added_total").increment(1);
        Ok(cart.into())
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn remove_item_from_cart(
        &self,
        ctx: &Context,
        item_id: &BookId,
    ) -> Result<CartResponse> {
        let user_id = caller(ctx)?;

        let _lease = self.lock_cart(user_id).await;

        let mut cart = self.find_cart(ctx, user_id).await?;
        cart.remove_item(item_id)?;
        self.save_cart(ctx, &cart).await?;
        Ok(cart.into())
    }

    /// Turns the caller's cart into a pending order backed by a payment
    /// intent, then clears the cart.
    ///
    /// If the order cannot be stored the intent is cancelled on a
    /// best-effort basis and the cart is left intact.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn create_order(&self, ctx: &Context) -> Result<OrderResponse> {
        let user_id = caller(ctx)?;

        let _lease = self.lock_cart(user_id).await;

        let cart = self.find_cart(ctx, user_id).await?;
        if cart.items.is_empty() {
            return Err(DomainError::ItemNotFoundInCart).context("create order from empty cart");
        }

        let mut order = Order::from_cart(OrderId::new(self.ids.new_id()), &cart);
        self.payments
            .create_payment_intent_for_order(ctx, &mut order)
            .await
            .with_context(|| format!("create payment intent for order {}", order.id))?;

        if let Err(err) = self.orders.create(ctx, &order).await {
            self.cancel_intent(ctx, &order).await;
            return Err(err.context(format!("create order {}", order.id)));
        }

        self.carts
            .delete_by_user_id(ctx, user_id)
            .await
            .with_context(|| format!("delete cart of user {user_id}"))?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, total = order.total_price(), "order created");
        Ok(order.into())
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn find_orders(
        &self,
        ctx: &Context,
        search: SearchOrders,
    ) -> Result<PaginatedOrdersResponse> {
        caller(ctx)?;
        let page = self
            .orders
            .find_by_query(ctx, &search.query(ctx), search.page())
            .await
            .context("find orders")?;
        Ok(page.into())
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn find_order_by_id(&self, ctx: &Context, id: &OrderId) -> Result<OrderResponse> {
        let order = self.find_order(ctx, id).await?;
        authorize(ctx, &order)?;
        Ok(order.into())
    }

    /// Marks the order paid. Already-paid orders are left untouched.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn complete_order(&self, ctx: &Context, id: &OrderId) -> Result<()> {
        if self.transition(ctx, id, OrderStatus::Paid).await? {
            metrics::counter!("orders_completed_total").increment(1);
            tracing::info!(order_id = %id, "order completed");
        }
        Ok(())
    }

    /// Abandons a pending order.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn cancel_order(&self, ctx: &Context, id: &OrderId) -> Result<()> {
        if self.transition(ctx, id, OrderStatus::Cancelled).await? {
            tracing::info!(order_id = %id, "order cancelled");
        }
        Ok(())
    }

    /// Presigns the content of a purchased book.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn download_order_item_content(
        &self,
        ctx: &Context,
        req: DownloadItem,
    ) -> Result<UrlResponse> {
        let order = self.find_order(ctx, &req.order_id).await?;
        if !order.completed() {
            return Err(DomainError::OrderNotCompleted);
        }
        if !order.has_item(&req.item_id) {
            return Err(DomainError::ItemNotFoundInOrder);
        }
        authorize(ctx, &order)?;

        let url = self.catalog.get_book_content_url(ctx, &req.item_id).await?;
        Ok(UrlResponse { url })
    }

    async fn transition(&self, ctx: &Context, id: &OrderId, next: OrderStatus) -> Result<bool> {
        let mut order = self.find_order(ctx, id).await?;
        if !order.transition_to(next)? {
            return Ok(false);
        }
        self.orders
            .update(ctx, &order)
            .await
            .with_context(|| format!("update order {id}"))?;
        Ok(true)
    }

    async fn cancel_intent(&self, ctx: &Context, order: &Order) {
        let Some(intent_id) = order.payment_intent_id.as_deref() else {
            return;
        };
        if let Err(err) = self.payments.cancel_payment_intent(ctx, intent_id).await {
            tracing::warn!(
                order_id = %order.id,
                payment_intent_id = intent_id,
                error = %err,
                "failed to cancel payment intent of unsaved order"
            );
        }
    }

    async fn find_order(&self, ctx: &Context, id: &OrderId) -> Result<Order> {
        self.orders
            .find_by_id(ctx, id)
            .await
            .with_context(|| format!("find order {id}"))
    }

    async fn find_cart(&self, ctx: &Context, user_id: &UserId) -> Result<Cart> {
        self.carts
            .find_by_user_id(ctx, user_id)
            .await
            .with_context(|| format!("find cart of user {user_id}"))
    }

    async fn save_cart(&self, ctx: &Context, cart: &Cart) -> Result<()> {
        self.carts
            .save(ctx, cart)
            .await
            .with_context(|| format!("save cart {}", cart.id))
    }

    async fn lock_cart(&self, user_id: &UserId) -> CartLease<'_> {
        let lock = self.cart_locks.entry(user_id.clone()).or_default().clone();
        let guard = lock.clone().lock_owned().await;
        CartLease {
            locks: &self.cart_locks,
            user_id: user_id.clone(),
            lock,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn cart_lock_count(&self) -> usize {
        self.cart_locks.len()
    }
}

/// Holds a user's cart lock and drops the table entry once nobody else
/// is waiting on it.
struct CartLease<'a> {
    locks: &'a DashMap<UserId, Arc<Mutex<()>>>,
    user_id: UserId,
    lock: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for CartLease<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // The table and this lease are the only owners left.
        self.locks
            .remove_if(&self.user_id, |_, lock| {
                Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2
            });
    }
}

fn caller(ctx: &Context) -> Result<&UserId> {
    ctx.user_id().ok_or(DomainError::Unauthenticated)
}

fn authorize(ctx: &Context, order: &Order) -> Result<()> {
    let owner = ctx.user_id().is_some_and(|id| order.is_owned_by(id));
    if ctx.is_admin() || owner {
        Ok(())
    } else {
        Err(DomainError::ForbiddenOrderAccess)
    }
}
