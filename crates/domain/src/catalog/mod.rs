//! Catalog bounded context.

pub(crate) mod book;
mod requests;
mod responses;
mod service;

pub use book::{Book, Image};
pub use requests::{CreateBook, ImageRequest, SearchBooks, UpdateBook};
pub use responses::{
    BookResponse, ImageResponse, PaginatedBooksResponse, PresignedUrlResponse, UrlResponse,
};
pub use service::Catalog;
