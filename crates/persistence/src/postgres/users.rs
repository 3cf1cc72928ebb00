use async_trait::async_trait;
use common::{Context, Page, Paginated, Query, UserId};
use domain::{User, UserRepository};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::error::{PersistenceError, Result};
use crate::sql::{bind_page, bind_params, translate};
use crate::call;

const COLUMNS: &str = "id, first_name, last_name, email, password_hash, role, created_at";

/// PostgreSQL-backed user repository.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: PgRow) -> Result<User> {
        let role: String = row.try_get("role")?;
        Ok(User {
            id: UserId::new(row.try_get::<String, _>("id")?),
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: role.parse().map_err(|reason| PersistenceError::Corrupt {
                entity: "User",
                reason,
            })?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn fetch_page(&self, query: &Query, page: Page) -> Result<Paginated<User>> {
        let predicate = translate(query)?;
        let where_clause = predicate.where_clause();

        let count_sql = format!("SELECT COUNT(*) FROM users{where_clause}");
        let total: i64 = bind_params(sqlx::query(&count_sql), &predicate.params)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;

        let sql = format!(
            "SELECT {COLUMNS} FROM users{where_clause} ORDER BY created_at, id{}",
            predicate.limit_clause()
        );
        let rows = bind_page(sqlx::query(&sql), &predicate.params, page)
            .fetch_all(&self.pool)
            .await?;
        let users = rows.into_iter().map(Self::row_to_user).collect::<Result<_>>()?;

        Ok(Paginated::new(users, page, total.max(0) as u64))
    }

    async fn fetch_one(&self, column: &str, value: &str) -> Result<User> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE {column} = $1");
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PersistenceError::NotFound { entity: "User" })?;
        Self::row_to_user(row)
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_query(&self, ctx: &Context, query: &Query, page: Page) -> domain::Result<Paginated<User>> {
        call(ctx, "users.find_by_query", self.fetch_page(query, page)).await
    }

    async fn find_by_id(&self, ctx: &Context, id: &UserId) -> domain::Result<User> {
        call(ctx, "users.find_by_id", self.fetch_one("id", id.as_str())).await
    }

    async fn find_by_email(&self, ctx: &Context, email: &str) -> domain::Result<User> {
        let email = domain::auth::normalize_email(email);
        call(ctx, "users.find_by_email", self.fetch_one("email", &email)).await
    }

    async fn create(&self, ctx: &Context, user: &User) -> domain::Result<()> {
        call(ctx, "users.create", async {
            sqlx::query(
                r#"
                INSERT INTO users (id, first_name, last_name, email, password_hash, role, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(user.id.as_str())
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.created_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    async fn update(&self, ctx: &Context, user: &User) -> domain::Result<()> {
        call(ctx, "users.update", async {
            let result = sqlx::query(
                r#"
                UPDATE users
                SET first_name = $2, last_name = $3, email = $4, password_hash = $5, role = $6
                WHERE id = $1
                "#,
            )
            .bind(user.id.as_str())
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(PersistenceError::NotFound { entity: "User" });
            }
            Ok(())
        })
        .await
    }
}
