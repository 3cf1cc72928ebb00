//! Request-scoped ambient context.

use std::time::{Duration, Instant};

use crate::types::UserId;

/// Per-request values the transport hands to the domain.
///
/// Carries the correlation ID, the authenticated identity (if any) and the
/// deadline that outbound calls must honour.
#[derive(Debug, Clone, Default)]
pub struct Context {
    request_id: Option<String>,
    user_id: Option<UserId>,
    admin: bool,
    deadline: Option<Instant>,
}

impl Context {
    /// Creates an anonymous context with no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the correlation ID.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Attaches an authenticated identity.
    pub fn with_user(mut self, user_id: UserId, admin: bool) -> Self {
        self.user_id = Some(user_id);
        self.admin = admin;
        self
    }

    /// Sets an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the deadline to `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns the correlation ID, if one was assigned.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Returns the authenticated user ID.
    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    /// Returns true only for authenticated administrators.
    pub fn is_admin(&self) -> bool {
        self.user_id.is_some() && self.admin
    }

    /// Returns the absolute deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns how long an outbound call may take: the smaller of `limit`
    /// and the time left before the deadline.
    pub fn budget(&self, limit: Duration) -> Duration {
        match self.deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()).min(limit),
            None => limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_context_is_not_admin() {
        let ctx = Context::new();
        assert!(ctx.user_id().is_none());
        assert!(!ctx.is_admin());
    }

    #[test]
    fn test_with_user_sets_identity() {
        let ctx = Context::new()
            .with_request_id("req-1")
            .with_user(UserId::new("u-1"), true);
        assert_eq!(ctx.request_id(), Some("req-1"));
        assert_eq!(ctx.user_id().map(UserId::as_str), Some("u-1"));
        assert!(ctx.is_admin());
    }

    #[test]
    fn test_budget_without_deadline_is_limit() {
        let ctx = Context::new();
        assert_eq!(ctx.budget(Duration::from_secs(10)), Duration::from_secs(10));
    }

    #[test]
    fn test_budget_is_capped_by_deadline() {
        let ctx = Context::new().with_timeout(Duration::from_secs(2));
        assert!(ctx.budget(Duration::from_secs(10)) <= Duration::from_secs(2));

        let expired = Context::new().with_deadline(Instant::now());
        assert_eq!(expired.budget(Duration::from_secs(10)), Duration::ZERO);
    }
}
