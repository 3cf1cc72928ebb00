use domain::DomainError;
use thiserror::Error;

/// Errors raised by the storage adapters.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The row or key does not exist.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// A query field is not a plain column name.
    #[error("invalid field name: {0:?}")]
    InvalidField(String),

    /// The condition cannot be expressed in SQL, e.g. matching against NULL.
    #[error("unsupported condition on {field}")]
    UnsupportedCondition { field: String },

    /// A stored value could not be decoded into a domain type.
    #[error("corrupt {entity} row: {reason}")]
    Corrupt {
        entity: &'static str,
        reason: String,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A cache command failed.
    #[error("Cache error: {0}")]
    Cache(#[from] bb8_redis::redis::RedisError),

    /// No cache connection could be checked out.
    #[error("Cache pool error: {0}")]
    CachePool(#[from] bb8_redis::bb8::RunError<bb8_redis::redis::RedisError>),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Maps a unique constraint name to the field it protects.
fn constrained_field(constraint: Option<&str>) -> String {
    match constraint {
        Some("users_email_key") => "email".to_string(),
        Some(name) => name.to_string(),
        None => "key".to_string(),
    }
}

impl From<PersistenceError> for DomainError {
    fn from(err: PersistenceError) -> Self {
        if let PersistenceError::Database(sqlx::Error::Database(db)) = &err
            && db.is_unique_violation()
        {
            return DomainError::DuplicateKey {
                field: constrained_field(db.constraint()),
            };
        }
        match err {
            PersistenceError::NotFound { entity } => DomainError::not_found(entity),
            other => DomainError::internal(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::ErrorKind;

    #[test]
    fn test_not_found_maps_to_entity() {
        let err: DomainError = PersistenceError::NotFound { entity: "book" }.into();
        assert!(err.is_not_found("book"));
    }

    #[test]
    fn test_other_errors_are_internal() {
        let err: DomainError = PersistenceError::InvalidField("x;".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        let err: DomainError = PersistenceError::Database(sqlx::Error::RowNotFound).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_constraint_names() {
        assert_eq!(constrained_field(Some("users_email_key")), "email");
        assert_eq!(constrained_field(Some("books_pkey")), "books_pkey");
        assert_eq!(constrained_field(None), "key");
    }
}
