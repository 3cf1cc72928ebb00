//! Catalog service: book management and presigned links.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use common::{BookId, Context, ImageId};
use futures_util::future::try_join_all;

use crate::error::{DomainError, Result, ResultExt};
use crate::ports::{BookRepository, IdGenerator, StorageClient};
use crate::validation::validate;

use super::book::Book;
use super::requests::{CreateBook, ImageRequest, SearchBooks, UpdateBook};
use super::responses::{BookResponse, PaginatedBooksResponse, PresignedUrlResponse};

/// Manages the book catalog.
pub struct Catalog {
    books: Arc<dyn BookRepository>,
    storage: Arc<dyn StorageClient>,
    ids: Arc<dyn IdGenerator>,
}

impl Catalog {
    pub fn new(
        books: Arc<dyn BookRepository>,
        storage: Arc<dyn StorageClient>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            books,
            storage,
            ids,
        }
    }

    /// Lists books matching `search`, with presigned image links.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn find_books(
        &self,
        ctx: &Context,
        search: SearchBooks,
    ) -> Result<PaginatedBooksResponse> {
        let page = self
            .books
            .find_by_query(ctx, &search.query(), search.page())
            .await
            .context("find books")?;

        let mut links = try_join_all(page.items.iter().map(|book| self.image_links(ctx, book)))
            .await?
            .into_iter();

        Ok(PaginatedBooksResponse::new(page.map(|book| {
            BookResponse::new(book, links.next().unwrap_or_default())
        })))
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn find_book_by_id(&self, ctx: &Context, id: &BookId) -> Result<BookResponse> {
        let book = self.book(ctx, id).await?;
        self.respond(ctx, book).await
    }

    /// Loads a book entity. Other services use this to read the catalog.
    pub async fn book(&self, ctx: &Context, id: &BookId) -> Result<Book> {
        self.books
            .find_by_id(ctx, id)
            .await
            .with_context(|| format!("find book {id}"))
    }

    /// Presigns a GET URL for the book content.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn get_book_content_url(&self, ctx: &Context, id: &BookId) -> Result<String> {
        let book = self.book(ctx, id).await?;
        self.storage
            .generate_get_presigned_url(ctx, &book.content_id)
            .await
            .with_context(|| format!("presign content of book {id}"))
    }

    #[tracing::instrument(skip(self, ctx, req), fields(title = %req.title))]
    pub async fn create_book(&self, ctx: &Context, req: CreateBook) -> Result<BookResponse> {
        require_admin(ctx)?;
        validate(&req)?;
        ensure_unique_images(&req.images)?;

        let now = Utc::now();
        let mut book = Book {
            id: BookId::new(self.ids.new_id()),
            title: req.title,
            description: req.description,
            author_name: req.author_name,
            price: req.price,
            release_date: req.release_date.unwrap_or(now),
            content_id: req.content_id,
            images: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        book.set_images(image_pairs(req.images));

        self.books
            .create(ctx, &book)
            .await
            .with_context(|| format!("create book {}", book.id))?;
        tracing::info!(book_id = %book.id, "book created");

        let stored = self.book(ctx, &book.id).await?;
        self.respond(ctx, stored).await
    }

    #[tracing::instrument(skip(self, ctx, req), fields(book_id = %req.id))]
    pub async fn update_book(&self, ctx: &Context, req: UpdateBook) -> Result<()> {
        require_admin(ctx)?;
        validate(&req)?;
        if let Some(images) = &req.images {
            ensure_unique_images(images)?;
        }

        let mut book = self.book(ctx, &req.id).await?;

        overwrite_text(&mut book.title, req.title);
        overwrite_text(&mut book.description, req.description);
        overwrite_text(&mut book.author_name, req.author_name);
        overwrite_text(&mut book.content_id, req.content_id);
        if let Some(price) = req.price {
            book.price = price;
        }
        if let Some(release_date) = req.release_date {
            book.release_date = release_date;
        }
        if let Some(images) = req.images {
            book.set_images(image_pairs(images));
        }
        book.updated_at = Utc::now();

        self.books
            .update(ctx, &book)
            .await
            .with_context(|| format!("update book {}", book.id))
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn delete_book(&self, ctx: &Context, id: &BookId) -> Result<()> {
        require_admin(ctx)?;

        self.books
            .delete(ctx, id)
            .await
            .with_context(|| format!("delete book {id}"))?;
        tracing::info!(book_id = %id, "book deleted");
        Ok(())
    }

    /// Allocates an object key and presigns an upload to it.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn generate_put_presigned_url(&self, ctx: &Context) -> Result<PresignedUrlResponse> {
        let id = self.ids.new_id();
        let url = self
            .storage
            .generate_put_presigned_url(ctx, &id)
            .await
            .with_context(|| format!("presign upload {id}"))?;
        Ok(PresignedUrlResponse { id, url })
    }

    async fn respond(&self, ctx: &Context, book: Book) -> Result<BookResponse> {
        let links = self.image_links(ctx, &book).await?;
        Ok(BookResponse::new(book, links))
    }

    async fn image_links(&self, ctx: &Context, book: &Book) -> Result<Vec<String>> {
        try_join_all(book.images.iter().map(|image| async move {
            self.storage
                .generate_get_presigned_url(ctx, image.id.as_str())
                .await
                .with_context(|| format!("presign image {}", image.id))
        }))
        .await
    }
}

fn require_admin(ctx: &Context) -> Result<()> {
    if ctx.is_admin() {
        Ok(())
    } else {
        Err(DomainError::Forbidden {
            resource: "catalog",
        })
    }
}

fn overwrite_text(target: &mut String, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        *target = value;
    }
}

/// Image IDs are keys within a book, so a request may name each only once.
fn ensure_unique_images(images: &[ImageRequest]) -> Result<()> {
    let mut seen = HashSet::new();
    let details: Vec<String> = images
        .iter()
        .enumerate()
        .filter(|(_, image)| !seen.insert(image.id.as_str()))
        .map(|(index, _)| format!("images[{index}].id: unique"))
        .collect();
    if details.is_empty() {
        Ok(())
    } else {
        Err(DomainError::validation("the request is not valid", details))
    }
}

fn image_pairs(images: Vec<ImageRequest>) -> impl Iterator<Item = (ImageId, String)> {
    images
        .into_iter()
        .map(|image| (ImageId::new(image.id), image.description))
}
