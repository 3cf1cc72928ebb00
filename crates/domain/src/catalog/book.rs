//! Book and image entities.

use chrono::{DateTime, Utc};
use common::{BookId, ImageId};
use serde::{Deserialize, Serialize};

/// A poster or illustration owned by a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Object-store key of the uploaded file.
    pub id: ImageId,
    pub description: String,
    pub book_id: BookId,
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub description: String,
    pub author_name: String,
    /// Price in minor currency units.
    pub price: i64,
    pub release_date: DateTime<Utc>,
    /// Object-store key of the book content.
    pub content_id: String,
    /// Ordered; the first one is the main image.
    pub images: Vec<Image>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Returns the ID of the first image, or an empty ID without images.
    pub fn main_image_id(&self) -> ImageId {
        self.images
            .first()
            .map(|image| image.id.clone())
            .unwrap_or_default()
    }

    /// Replaces the image set, pointing each image back at this book.
    pub fn set_images(&mut self, images: impl IntoIterator<Item = (ImageId, String)>) {
        self.images = images
            .into_iter()
            .map(|(id, description)| Image {
                id,
                description,
                book_id: self.id.clone(),
            })
            .collect();
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::book;

    #[test]
    fn test_main_image_is_first_image() {
        let b = book("b-1", &["img-1", "img-2"]);
        assert_eq!(b.main_image_id().as_str(), "img-1");
    }

    #[test]
    fn test_main_image_empty_without_images() {
        let b = book("b-1", &[]);
        assert!(b.main_image_id().is_empty());
    }

    #[test]
    fn test_set_images_back_references_book() {
        let b = book("b-9", &["a", "b"]);
        assert!(b.images.iter().all(|img| img.book_id == b.id));
        assert_eq!(b.images.len(), 2);
    }
}
