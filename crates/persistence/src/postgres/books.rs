use std::collections::HashMap;

use async_trait::async_trait;
use common::{BookId, Context, ImageId, Page, Paginated, Query};
use domain::{Book, BookRepository, Image};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use crate::call;
use crate::error::{PersistenceError, Result};
use crate::sql::{bind_page, bind_params, translate};

const COLUMNS: &str =
    "id, title, description, author_name, price, release_date, content_id, created_at, updated_at";

/// PostgreSQL-backed book repository. Images live in their own table and
/// are loaded in one extra round trip per page.
#[derive(Clone)]
pub struct PostgresBookRepository {
    pool: PgPool,
}

impl PostgresBookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_book(row: PgRow) -> Result<Book> {
        Ok(Book {
            id: BookId::new(row.try_get::<String, _>("id")?),
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            author_name: row.try_get("author_name")?,
            price: row.try_get("price")?,
            release_date: row.try_get("release_date")?,
            content_id: row.try_get("content_id")?,
            images: Vec::new(),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Fills in the images of `books`, preserving their stored order.
    async fn attach_images(&self, books: &mut [Book]) -> Result<()> {
        if books.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = books.iter().map(|b| b.id.as_str().to_string()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, book_id, description
            FROM images
            WHERE book_id = ANY($1)
            ORDER BY book_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_book: HashMap<String, Vec<Image>> = HashMap::new();
        for row in rows {
            let book_id: String = row.try_get("book_id")?;
            by_book.entry(book_id.clone()).or_default().push(Image {
                id: ImageId::new(row.try_get::<String, _>("id")?),
                description: row.try_get("description")?,
                book_id: BookId::new(book_id),
            });
        }
        for book in books.iter_mut() {
            book.images = by_book.remove(book.id.as_str()).unwrap_or_default();
        }
        Ok(())
    }

    async fn insert_images(tx: &mut Transaction<'_, Postgres>, book: &Book) -> Result<()> {
        for (position, image) in book.images.iter().enumerate() {
            sqlx::query(
                "INSERT INTO images (id, book_id, description, position) VALUES ($1, $2, $3, $4)",
            )
            .bind(image.id.as_str())
            .bind(book.id.as_str())
            .bind(&image.description)
            .bind(position as i32)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn fetch_page(&self, query: &Query, page: Page) -> Result<Paginated<Book>> {
        let predicate = translate(query)?;
        let where_clause = predicate.where_clause();

        let count_sql = format!("SELECT COUNT(*) FROM books{where_clause}");
        let total: i64 = bind_params(sqlx::query(&count_sql), &predicate.params)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;

        let sql = format!(
            "SELECT {COLUMNS} FROM books{where_clause} ORDER BY created_at, id{}",
            predicate.limit_clause()
        );
        let rows = bind_page(sqlx::query(&sql), &predicate.params, page)
            .fetch_all(&self.pool)
            .await?;
        let mut books: Vec<Book> = rows.into_iter().map(Self::row_to_book).collect::<Result<_>>()?;
        self.attach_images(&mut books).await?;

        Ok(Paginated::new(books, page, total.max(0) as u64))
    }

    async fn fetch_one(&self, id: &BookId) -> Result<Book> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM books WHERE id = $1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PersistenceError::NotFound { entity: "book" })?;
        let mut books = vec![Self::row_to_book(row)?];
        self.attach_images(&mut books).await?;
        books.pop().ok_or(PersistenceError::NotFound { entity: "book" })
    }

    async fn insert(&self, book: &Book) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO books (id, title, description, author_name, price, release_date, content_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(book.id.as_str())
        .bind(&book.title)
        .bind(&book.description)
        .bind(&book.author_name)
        .bind(book.price)
        .bind(book.release_date)
        .bind(&book.content_id)
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&mut *tx)
        .await?;
        Self::insert_images(&mut tx, book).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace(&self, book: &Book) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $2, description = $3, author_name = $4, price = $5,
                release_date = $6, content_id = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(book.id.as_str())
        .bind(&book.title)
        .bind(&book.description)
        .bind(&book.author_name)
        .bind(book.price)
        .bind(book.release_date)
        .bind(&book.content_id)
        .bind(book.updated_at)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound { entity: "book" });
        }

        sqlx::query("DELETE FROM images WHERE book_id = $1")
            .bind(book.id.as_str())
            .execute(&mut *tx)
            .await?;
        Self::insert_images(&mut tx, book).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, id: &BookId) -> Result<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound { entity: "book" });
        }
        Ok(())
    }
}

#[async_trait]
impl BookRepository for PostgresBookRepository {
    async fn find_by_query(&self, ctx: &Context, query: &Query, page: Page) -> domain::Result<Paginated<Book>> {
        call(ctx, "books.find_by_query", self.fetch_page(query, page)).await
    }

    async fn find_by_id(&self, ctx: &Context, id: &BookId) -> domain::Result<Book> {
        call(ctx, "books.find_by_id", self.fetch_one(id)).await
    }

    async fn create(&self, ctx: &Context, book: &Book) -> domain::Result<()> {
        call(ctx, "books.create", self.insert(book)).await
    }

    async fn update(&self, ctx: &Context, book: &Book) -> domain::Result<()> {
        call(ctx, "books.update", self.replace(book)).await
    }

    async fn delete(&self, ctx: &Context, id: &BookId) -> domain::Result<()> {
        call(ctx, "books.delete", self.remove(id)).await
    }
}
