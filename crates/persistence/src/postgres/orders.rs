use std::collections::HashMap;

use async_trait::async_trait;
use common::{BookId, Context, ImageId, OrderId, Page, Paginated, Query, UserId};
use domain::{Item, Order, OrderRepository};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::call;
use crate::error::{PersistenceError, Result};
use crate::sql::{bind_page, bind_params, translate};

const COLUMNS: &str = "id, status, payment_intent_id, client_secret, user_id, created_at, updated_at";

/// PostgreSQL-backed order repository. Items are written once, with the
/// order, and never rewritten.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        Ok(Order {
            id: OrderId::new(row.try_get::<String, _>("id")?),
            status: status.parse().map_err(|e: domain::shop::UnknownOrderStatus| {
                PersistenceError::Corrupt {
                    entity: "order",
                    reason: e.to_string(),
                }
            })?,
            payment_intent_id: row.try_get("payment_intent_id")?,
            client_secret: row.try_get("client_secret")?,
            items: Vec::new(),
            user_id: UserId::new(row.try_get::<String, _>("user_id")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn attach_items(&self, orders: &mut [Order]) -> Result<()> {
        if orders.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = orders.iter().map(|o| o.id.as_str().to_string()).collect();
        let rows = sqlx::query(
            r#"
            SELECT item_id, order_id, name, price, preview_image_id
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<String, Vec<Item>> = HashMap::new();
        for row in rows {
            let order_id: String = row.try_get("order_id")?;
            by_order.entry(order_id.clone()).or_default().push(Item {
                id: BookId::new(row.try_get::<String, _>("item_id")?),
                name: row.try_get("name")?,
                price: row.try_get("price")?,
                preview_image_id: ImageId::new(row.try_get::<String, _>("preview_image_id")?),
                order_id: OrderId::new(order_id),
            });
        }
        for order in orders.iter_mut() {
            order.items = by_order.remove(order.id.as_str()).unwrap_or_default();
        }
        Ok(())
    }

    async fn fetch_page(&self, query: &Query, page: Page) -> Result<Paginated<Order>> {
        let predicate = translate(query)?;
        let where_clause = predicate.where_clause();

        let count_sql = format!("SELECT COUNT(*) FROM orders{where_clause}");
        let total: i64 = bind_params(sqlx::query(&count_sql), &predicate.params)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;

        let sql = format!(
            "SELECT {COLUMNS} FROM orders{where_clause} ORDER BY created_at DESC, id{}",
            predicate.limit_clause()
        );
        let rows = bind_page(sqlx::query(&sql), &predicate.params, page)
            .fetch_all(&self.pool)
            .await?;
        let mut orders: Vec<Order> = rows.into_iter().map(Self::row_to_order).collect::<Result<_>>()?;
        self.attach_items(&mut orders).await?;

        Ok(Paginated::new(orders, page, total.max(0) as u64))
    }

    async fn fetch_one(&self, id: &OrderId) -> Result<Order> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PersistenceError::NotFound { entity: "order" })?;
        let mut orders = vec![Self::row_to_order(row)?];
        self.attach_items(&mut orders).await?;
        orders.pop().ok_or(PersistenceError::NotFound { entity: "order" })
    }

    async fn insert(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO orders (id, status, payment_intent_id, client_secret, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(order.id.as_str())
        .bind(order.status.as_str())
        .bind(order.payment_intent_id.as_deref())
        .bind(order.client_secret.as_deref())
        .bind(order.user_id.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (item_id, order_id, name, price, preview_image_id, position)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(item.id.as_str())
            .bind(order.id.as_str())
            .bind(&item.name)
            .bind(item.price)
            .bind(item.preview_image_id.as_str())
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn save_status(&self, order: &Order) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, payment_intent_id = $3, client_secret = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_str())
        .bind(order.status.as_str())
        .bind(order.payment_intent_id.as_deref())
        .bind(order.client_secret.as_deref())
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound { entity: "order" });
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn find_by_query(&self, ctx: &Context, query: &Query, page: Page) -> domain::Result<Paginated<Order>> {
        call(ctx, "orders.find_by_query", self.fetch_page(query, page)).await
    }

    async fn find_by_id(&self, ctx: &Context, id: &OrderId) -> domain::Result<Order> {
        call(ctx, "orders.find_by_id", self.fetch_one(id)).await
    }

    async fn create(&self, ctx: &Context, order: &Order) -> domain::Result<()> {
        call(ctx, "orders.create", self.insert(order)).await
    }

    async fn update(&self, ctx: &Context, order: &Order) -> domain::Result<()> {
        call(ctx, "orders.update", self.save_status(order)).await
    }
}

#[cfg(test)]
mod tests {
    use domain::OrderStatus;

    #[test]
    fn test_status_names_match_check_constraint() {
        let schema = include_str!("../../../../migrations/0001_create_store_tables.sql");
        for status in [OrderStatus::Pending, OrderStatus::Paid, OrderStatus::Cancelled] {
            assert!(schema.contains(&format!("'{}'", status.as_str())), "{status}");
        }
    }
}
