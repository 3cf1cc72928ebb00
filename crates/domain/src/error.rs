//! Domain error types.

use thiserror::Error;

use crate::shop::OrderStatus;

/// Boxed source for errors the domain does not classify.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during domain operations.
///
/// Services wrap the errors of their collaborators with
/// [`DomainError::Context`] so that logs read like a call trace, while
/// [`DomainError::kind`] still reaches the leaf that decides the response.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The request failed binding or validation.
    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<String>,
    },

    /// Supplied password does not match the stored hash.
    #[error("the provided password is not valid")]
    WrongPassword,

    /// Missing or unparseable bearer token.
    #[error("authentication is required to access this resource")]
    Unauthenticated,

    /// Privileged action attempted without the admin role.
    #[error("the access to this action is restricted to allowed users")]
    Forbidden { resource: &'static str },

    /// Order belongs to another user.
    #[error("you are not allowed to access this order")]
    ForbiddenOrderAccess,

    /// Lookup found nothing.
    #[error("{entity} not found")]
    EntityNotFound { entity: &'static str },

    /// Download attempted on an order that is not paid.
    #[error("only books from completed orders can be downloaded")]
    OrderNotCompleted,

    /// Unique constraint violation.
    #[error("{field} is already in use")]
    DuplicateKey { field: String },

    #[error("the item is already in the cart")]
    ItemAlreadyInCart,

    #[error("the item was not found in the cart")]
    ItemNotFoundInCart,

    #[error("the item was not found in the order")]
    ItemNotFoundInOrder,

    /// Order status may only advance from Pending.
    #[error("order cannot move from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// An outbound call ran past its deadline.
    #[error("{operation} exceeded its deadline")]
    Timeout { operation: &'static str },

    /// Wraps an inner error with the operation that was running.
    #[error("{context}")]
    Context {
        context: String,
        #[source]
        source: Box<DomainError>,
    },

    /// Anything the domain does not classify.
    #[error("{0}")]
    Internal(#[source] BoxError),
}

/// Coarse classification used by the transport to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    WrongPassword,
    Unauthenticated,
    Forbidden,
    EntityNotFound,
    OrderNotCompleted,
    Conflict,
    Timeout,
    Internal,
}

impl DomainError {
    /// Creates a validation error with field details.
    pub fn validation(message: impl Into<String>, details: Vec<String>) -> Self {
        DomainError::Validation {
            message: message.into(),
            details,
        }
    }

    /// Creates a not-found error for the named entity.
    pub fn not_found(entity: &'static str) -> Self {
        DomainError::EntityNotFound { entity }
    }

    /// Wraps an unclassified error.
    pub fn internal(err: impl Into<BoxError>) -> Self {
        DomainError::Internal(err.into())
    }

    /// Wraps `self` with a context message.
    pub fn context(self, context: impl Into<String>) -> Self {
        DomainError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost non-context error.
    pub fn leaf(&self) -> &DomainError {
        let mut current = self;
        while let DomainError::Context { source, .. } = current {
            current = source;
        }
        current
    }

    /// Returns the context messages from outermost to innermost.
    pub fn contexts(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut current = self;
        while let DomainError::Context { context, source } = current {
            out.push(context.as_str());
            current = source;
        }
        out
    }

    /// Classifies the leaf error.
    pub fn kind(&self) -> ErrorKind {
        match self.leaf() {
            DomainError::Validation { .. } => ErrorKind::Validation,
            DomainError::WrongPassword => ErrorKind::WrongPassword,
            DomainError::Unauthenticated => ErrorKind::Unauthenticated,
            DomainError::Forbidden { .. } | DomainError::ForbiddenOrderAccess => {
                ErrorKind::Forbidden
            }
            DomainError::EntityNotFound { .. }
            | DomainError::ItemNotFoundInCart
            | DomainError::ItemNotFoundInOrder => ErrorKind::EntityNotFound,
            DomainError::OrderNotCompleted => ErrorKind::OrderNotCompleted,
            DomainError::DuplicateKey { .. }
            | DomainError::ItemAlreadyInCart
            | DomainError::InvalidStatusTransition { .. } => ErrorKind::Conflict,
            DomainError::Timeout { .. } => ErrorKind::Timeout,
            DomainError::Internal(_) => ErrorKind::Internal,
            DomainError::Context { .. } => ErrorKind::Internal,
        }
    }

    /// Returns true if the leaf is `EntityNotFound` for `entity`.
    pub fn is_not_found(&self, entity: &str) -> bool {
        matches!(self.leaf(), DomainError::EntityNotFound { entity: e } if *e == entity)
    }
}

/// Adds context to the error side of a result.
pub trait ResultExt<T> {
    /// Wraps the error with a fixed context message.
    fn context(self, context: impl Into<String>) -> Result<T, DomainError>;

    /// Wraps the error with a lazily built context message.
    fn with_context<F, C>(self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T> ResultExt<T> for Result<T, DomainError> {
    fn context(self, context: impl Into<String>) -> Result<T, DomainError> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<F, C>(self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| e.context(f()))
    }
}

/// Convenience type alias for domain results.
pub type Result<T, E = DomainError> = std::result::Result<T, E>;
