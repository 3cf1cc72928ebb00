//! Catalog responses.

use chrono::{DateTime, Utc};
use common::{BookId, ImageId, Paginated};
use serde::Serialize;

use super::book::Book;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub id: ImageId,
    /// Presigned GET URL.
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub id: BookId,
    pub title: String,
    pub description: String,
    pub author_name: String,
    pub price: i64,
    pub release_date: DateTime<Utc>,
    pub main_image_id: ImageId,
    pub images: Vec<ImageResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookResponse {
    /// Pairs each image of `book` with the link at the same position.
    /// Images without a link get an empty URL.
    pub fn new(book: Book, links: Vec<String>) -> Self {
        let main_image_id = book.main_image_id();
        let mut links = links.into_iter();
        let images = book
            .images
            .into_iter()
            .map(|image| ImageResponse {
                id: image.id,
                url: links.next().unwrap_or_default(),
                description: image.description,
            })
            .collect();

        Self {
            id: book.id,
            title: book.title,
            description: book.description,
            author_name: book.author_name,
            price: book.price,
            release_date: book.release_date,
            main_image_id,
            images,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedBooksResponse {
    pub books: Vec<BookResponse>,
    pub current_page: u64,
    pub total_pages: u64,
    pub total_books: u64,
    pub per_page: u32,
}

impl PaginatedBooksResponse {
    pub fn new(page: Paginated<BookResponse>) -> Self {
        Self {
            current_page: page.current_page(),
            total_pages: page.total_pages(),
            total_books: page.total_count,
            per_page: page.limit,
            books: page.items,
        }
    }
}

/// A presigned upload target for a freshly allocated object key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUrlResponse {
    pub id: String,
    pub url: String,
}

/// A presigned download link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlResponse {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::book::fixtures::book;
    use common::Page;

    #[test]
    fn test_book_response_pairs_images_with_links() {
        let b = book("b-1", &["img-1", "img-2"]);
        let links = vec!["https://s3/img-1".to_string(), "https://s3/img-2".to_string()];

        let resp = BookResponse::new(b.clone(), links.clone());

        assert_eq!(resp.main_image_id.as_str(), "img-1");
        for (i, image) in b.images.iter().enumerate() {
            assert_eq!(
                resp.images[i],
                ImageResponse {
                    id: image.id.clone(),
                    url: links[i].clone(),
                    description: image.description.clone(),
                }
            );
        }
    }

    #[test]
    fn test_paginated_books_response_counts_pages() {
        let items = vec![BookResponse::new(book("b-1", &[]), Vec::new())];
        let page = Paginated::new(items, Page::new(2, 10), 25);

        let resp = PaginatedBooksResponse::new(page);
        assert_eq!(resp.current_page, 2);
        assert_eq!(resp.total_pages, 3);
        assert_eq!(resp.total_books, 25);
        assert_eq!(resp.per_page, 10);
    }

    #[test]
    fn test_book_response_serializes_camel_case() {
        let resp = BookResponse::new(book("b-1", &["img"]), vec!["u".to_string()]);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["authorName"], "Author");
        assert_eq!(json["mainImageId"], "img");
        assert_eq!(json["images"][0]["url"], "u");
    }
}
