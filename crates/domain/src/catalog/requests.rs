//! Catalog requests.

use chrono::{DateTime, Utc};
use common::{BookId, Condition, Page, Query};
use serde::Deserialize;
use validator::Validate;

/// Filters for listing books. Every text field is a case-insensitive
/// substring match; present fields are joined with AND.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchBooks {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author_name: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl SearchBooks {
    /// Builds the filter from the non-empty fields.
    pub fn query(&self) -> Query {
        let fields = [
            ("title", &self.title),
            ("description", &self.description),
            ("author_name", &self.author_name),
        ];

        fields
            .into_iter()
            .filter_map(|(field, value)| {
                value
                    .as_deref()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| Condition::matches(field, v))
            })
            .fold(Query::new(), Query::and)
    }

    pub fn page(&self) -> Page {
        Page::from_params(self.page, self.per_page)
    }
}

/// An image the client already uploaded through a presigned PUT URL.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    #[validate(length(min = 1, max = 100))]
    pub id: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(length(min = 1, max = 100))]
    pub author_name: String,
    #[validate(length(min = 1, max = 100))]
    pub content_id: String,
    #[validate(range(min = 1))]
    pub price: i64,
    #[validate(required)]
    pub release_date: Option<DateTime<Utc>>,
    #[serde(default)]
    #[validate(nested)]
    pub images: Vec<ImageRequest>,
}

/// Partial update. Absent or empty text fields leave the stored value in
/// place; `images`, when present, replaces the whole set.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBook {
    /// Taken from the path, never from the body.
    #[serde(skip)]
    pub id: BookId,
    #[validate(length(max = 100))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub author_name: Option<String>,
    #[validate(length(max = 100))]
    pub content_id: Option<String>,
    #[validate(range(min = 1))]
    pub price: Option<i64>,
    pub release_date: Option<DateTime<Utc>>,
    #[validate(nested)]
    pub images: Option<Vec<ImageRequest>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use common::{ComparisonOperator, LogicalOperator, Value};

    #[test]
    fn test_empty_search_builds_empty_query() {
        assert!(SearchBooks::default().query().is_empty());
    }

    #[test]
    fn test_search_ignores_blank_fields() {
        let search = SearchBooks {
            title: Some("  ".to_string()),
            author_name: Some("Tolkien".to_string()),
            ..Default::default()
        };
        let query = search.query();
        assert_eq!(query.len(), 1);
        let node = query.iter().next().unwrap();
        assert_eq!(node.operator, None);
        assert_eq!(node.condition.field, "author_name");
        assert_eq!(node.condition.operator, ComparisonOperator::Match);
        assert_eq!(node.condition.value, Value::Text("Tolkien".to_string()));
    }

    #[test]
    fn test_search_joins_fields_with_and() {
        let search = SearchBooks {
            title: Some("Ring".to_string()),
            description: Some("hobbit".to_string()),
            ..Default::default()
        };
        let ops: Vec<_> = search.query().iter().map(|n| n.operator).collect();
        assert_eq!(ops, vec![None, Some(LogicalOperator::And)]);
    }

    #[test]
    fn test_search_page_defaults() {
        let page = SearchBooks::default().page();
        assert_eq!(page.number(), 1);
        assert_eq!(page.size(), 15);
    }

    #[test]
    fn test_search_deserializes_camel_case() {
        let search: SearchBooks =
            serde_json::from_value(serde_json::json!({"authorName": "X", "perPage": 5})).unwrap();
        assert_eq!(search.author_name.as_deref(), Some("X"));
        assert_eq!(search.page().size(), 5);
    }

    fn create_book() -> CreateBook {
        CreateBook {
            title: "The Hobbit".to_string(),
            description: "There and back again".to_string(),
            author_name: "J. R. R. Tolkien".to_string(),
            content_id: "content.pdf".to_string(),
            price: 4000,
            release_date: Some(Utc::now()),
            images: vec![ImageRequest {
                id: "poster.png".to_string(),
                description: "poster".to_string(),
            }],
        }
    }

    #[test]
    fn test_create_book_accepts_valid_request() {
        assert!(validate(&create_book()).is_ok());
    }

    #[test]
    fn test_create_book_rejects_bad_fields() {
        let mut req = create_book();
        req.price = 0;
        req.release_date = None;
        req.title = "x".repeat(101);
        req.images[0].id = String::new();

        let err = validate(&req).unwrap_err();
        let crate::error::DomainError::Validation { details, .. } = err else {
            panic!("expected validation error");
        };
        assert!(details.iter().any(|d| d.starts_with("price:")));
        assert!(details.iter().any(|d| d.starts_with("release_date:")));
        assert!(details.iter().any(|d| d.starts_with("title:")));
        assert!(details.iter().any(|d| d.starts_with("images[0].id:")));
    }

    #[test]
    fn test_update_book_allows_empty_request() {
        assert!(validate(&UpdateBook::default()).is_ok());
    }
}
