//! API error types with HTTP response mapping.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use domain::{DomainError, ErrorKind};
use serde::Serialize;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An error from a domain service.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The request could not be bound.
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Vec<String>,
    },

    #[error("too many requests")]
    TooManyRequests { retry_after_secs: u64 },

    /// A handler panicked.
    #[error("internal server error")]
    Panic,
}

/// Wire shape of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub details: Vec<String>,
}

/// Copy of the error attached to the response so the access log can
/// report the full chain.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub chain: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            details: Vec::new(),
        }
    }

    fn rejection(message: &str, detail: String) -> Self {
        ApiError::BadRequest {
            message: message.to_string(),
            details: vec![detail],
        }
    }

    /// The HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(err) => status_for(err.kind()),
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Panic => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Builds the response body: the leaf message, plus either the
    /// validation details or the context chain with the outermost last.
    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::Domain(err) => {
                let leaf = err.leaf();
                let details = match leaf {
                    DomainError::Validation { details, .. } => details.clone(),
                    _ => err.contexts().into_iter().rev().map(str::to_string).collect(),
                };
                ErrorBody {
                    message: leaf.to_string(),
                    details,
                }
            }
            ApiError::BadRequest { message, details } => ErrorBody {
                message: message.clone(),
                details: details.clone(),
            },
            other => ErrorBody {
                message: other.to_string(),
                details: Vec::new(),
            },
        }
    }
}

/// Maps an error kind onto its HTTP status.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::WrongPassword | ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::EntityNotFound => StatusCode::NOT_FOUND,
        ErrorKind::OrderNotCompleted => StatusCode::PAYMENT_REQUIRED,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Formats an error and all of its sources as `outer: inner: leaf`.
fn chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let report = ErrorReport {
            status,
            chain: chain(&self),
        };

        let mut response = (status, Json(self.body())).into_response();
        if let ApiError::TooManyRequests { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response.extensions_mut().insert(report);
        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::rejection("the request body is not valid", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::rejection("the query string is not valid", rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::rejection("the path is not valid", rejection.body_text())
    }
}
