//! Shop requests.

use common::{BookId, Condition, Context, OrderId, Page, Query};
use serde::Deserialize;

use super::order::OrderStatus;

/// Filters for listing orders.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOrders {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl SearchOrders {
    /// Builds the filter. Callers that are not administrators only ever
    /// see their own orders.
    pub fn query(&self, ctx: &Context) -> Query {
        let mut query = Query::new();
        if let Some(status) = self.status {
            query = query.and(Condition::equal("status", status.as_str()));
        }
        if !ctx.is_admin() {
            let user_id = ctx.user_id().map(|id| id.as_str().to_string());
            query = query.restrict(Condition::equal("user_id", user_id));
        }
        query
    }

    pub fn page(&self) -> Page {
        Page::from_params(self.page, self.per_page)
    }
}

/// Identifies one item of one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadItem {
    pub order_id: OrderId,
    pub item_id: BookId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{LogicalOperator, UserId, Value};

    #[test]
    fn test_customer_query_is_restricted_to_owner() {
        let ctx = Context::new().with_user(UserId::new("u-1"), false);
        let query = SearchOrders::default().query(&ctx);

        assert_eq!(query.len(), 1);
        let node = query.iter().next().unwrap();
        assert_eq!(node.condition.field, "user_id");
        assert_eq!(node.condition.value, Value::Text("u-1".to_string()));
    }

    #[test]
    fn test_admin_query_is_unrestricted() {
        let ctx = Context::new().with_user(UserId::new("admin"), true);
        assert!(SearchOrders::default().query(&ctx).is_empty());
    }

    #[test]
    fn test_status_filter_is_joined_with_owner() {
        let ctx = Context::new().with_user(UserId::new("u-1"), false);
        let search = SearchOrders {
            status: Some(OrderStatus::Paid),
            ..Default::default()
        };
        let query = search.query(&ctx);
        let nodes: Vec<_> = query.iter().collect();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].condition.value, Value::Text("PAID".to_string()));
        assert_eq!(nodes[1].operator, Some(LogicalOperator::And));
    }

    #[test]
    fn test_anonymous_query_matches_null_owner() {
        let query = SearchOrders::default().query(&Context::new());
        assert_eq!(query.iter().next().unwrap().condition.value, Value::Null);
    }
}
