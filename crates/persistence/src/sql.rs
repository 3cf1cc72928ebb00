//! Translation of [`Query`] values into PostgreSQL predicates.
//!
//! Conditions become `field <op> $n` fragments joined with the query's
//! logical operators. NULL comparisons are written inline because
//! PostgreSQL has no bindable `IS $n`.

use common::{ComparisonOperator, Page, Query, Value};
use sqlx::Postgres;
use sqlx::postgres::PgArguments;
use sqlx::query::Query as SqlxQuery;

use crate::error::{PersistenceError, Result};

/// A bindable, non-null parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    Integer(i64),
    Bool(bool),
}

/// A translated predicate and its parameters in placeholder order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl Predicate {
    /// Returns ` WHERE <sql>`, or nothing for an empty predicate.
    pub fn where_clause(&self) -> String {
        if self.sql.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.sql)
        }
    }

    /// Returns ` LIMIT $n OFFSET $m` numbered after this predicate's params.
    pub fn limit_clause(&self) -> String {
        let next = self.params.len() + 1;
        format!(" LIMIT ${} OFFSET ${}", next, next + 1)
    }
}

fn check_field(field: &str) -> Result<()> {
    let valid = !field.is_empty() && field.bytes().all(|b| b.is_ascii_lowercase() || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(PersistenceError::InvalidField(field.to_string()))
    }
}

fn param(value: &Value) -> Option<SqlParam> {
    match value {
        Value::Null => None,
        Value::Text(s) => Some(SqlParam::Text(s.clone())),
        Value::Integer(n) => Some(SqlParam::Integer(*n)),
        Value::Bool(b) => Some(SqlParam::Bool(*b)),
    }
}

/// Translates `query` into a predicate.
///
/// An empty query yields an empty predicate with no parameters.
pub fn translate(query: &Query) -> Result<Predicate> {
    let mut out = Predicate::default();

    for node in query {
        let condition = &node.condition;
        check_field(&condition.field)?;

        if let Some(op) = node.operator {
            out.sql.push(' ');
            out.sql.push_str(op.as_str());
            out.sql.push(' ');
        }

        let field = &condition.field;
        let fragment = match (condition.operator, param(&condition.value)) {
            (ComparisonOperator::Equal, None) => format!("{field} IS NULL"),
            (ComparisonOperator::NotEqual, None) => format!("{field} IS NOT NULL"),
            (ComparisonOperator::Match, None) => {
                return Err(PersistenceError::UnsupportedCondition {
                    field: field.clone(),
                });
            }
            (ComparisonOperator::Match, Some(p)) => {
                let pattern = match p {
                    SqlParam::Text(s) => s,
                    SqlParam::Integer(n) => n.to_string(),
                    SqlParam::Bool(b) => b.to_string(),
                };
                out.params.push(SqlParam::Text(format!("%{pattern}%")));
                format!("{field} ILIKE ${}", out.params.len())
            }
            (ComparisonOperator::Equal, Some(p)) => {
                out.params.push(p);
                format!("{field} = ${}", out.params.len())
            }
            (ComparisonOperator::NotEqual, Some(p)) => {
                out.params.push(p);
                format!("{field} != ${}", out.params.len())
            }
        };
        out.sql.push_str(&fragment);
    }

    Ok(out)
}

/// Binds predicate parameters in order.
pub(crate) fn bind_params<'q>(
    mut query: SqlxQuery<'q, Postgres, PgArguments>,
    params: &'q [SqlParam],
) -> SqlxQuery<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlParam::Text(s) => query.bind(s.as_str()),
            SqlParam::Integer(n) => query.bind(*n),
            SqlParam::Bool(b) => query.bind(*b),
        };
    }
    query
}

/// Binds predicate parameters followed by the page's limit and offset.
pub(crate) fn bind_page<'q>(
    query: SqlxQuery<'q, Postgres, PgArguments>,
    params: &'q [SqlParam],
    page: Page,
) -> SqlxQuery<'q, Postgres, PgArguments> {
    bind_params(query, params)
        .bind(i64::from(page.size()))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Condition, Value};

    #[test]
    fn test_empty_query_translates_to_nothing() {
        let p = translate(&Query::new()).unwrap();
        assert_eq!(p.sql, "");
        assert!(p.params.is_empty());
        assert_eq!(p.where_clause(), "");
        assert_eq!(p.limit_clause(), " LIMIT $1 OFFSET $2");
    }

    #[test]
    fn test_match_wraps_value() {
        let p = translate(&Query::with(Condition::matches("title", "hob"))).unwrap();
        assert_eq!(p.sql, "title ILIKE $1");
        assert_eq!(p.params, vec![SqlParam::Text("%hob%".to_string())]);
    }

    #[test]
    fn test_operators_and_placeholders() {
        let q = Query::with(Condition::equal("status", "PAID"))
            .and(Condition::not_equal("price", 0i64))
            .or(Condition::equal("user_id", "u-1"));
        let p = translate(&q).unwrap();
        assert_eq!(p.sql, "status = $1 AND price != $2 OR user_id = $3");
        assert_eq!(
            p.params,
            vec![
                SqlParam::Text("PAID".to_string()),
                SqlParam::Integer(0),
                SqlParam::Text("u-1".to_string()),
            ]
        );
        assert_eq!(p.where_clause(), " WHERE status = $1 AND price != $2 OR user_id = $3");
        assert_eq!(p.limit_clause(), " LIMIT $4 OFFSET $5");
    }

    #[test]
    fn test_restriction_is_repeated_per_or_group() {
        let q = Query::with(Condition::matches("title", "rust"))
            .or(Condition::matches("author_name", "rust"))
            .restrict(Condition::equal("user_id", "u-1"));
        let p = translate(&q).unwrap();
        assert_eq!(
            p.sql,
            "title ILIKE $1 AND user_id = $2 OR author_name ILIKE $3 AND user_id = $4"
        );
        assert_eq!(p.params[1], SqlParam::Text("u-1".to_string()));
        assert_eq!(p.params[3], SqlParam::Text("u-1".to_string()));
    }

    #[test]
    fn test_null_values_are_inlined() {
        let q = Query::with(Condition::equal("payment_intent_id", Value::Null))
            .and(Condition::not_equal("client_secret", Value::Null))
            .and(Condition::equal("user_id", "u-1"));
        let p = translate(&q).unwrap();
        assert_eq!(
            p.sql,
            "payment_intent_id IS NULL AND client_secret IS NOT NULL AND user_id = $1"
        );
        assert_eq!(p.params.len(), 1);
    }

    #[test]
    fn test_match_against_null_is_rejected() {
        let err = translate(&Query::with(Condition::matches("title", Value::Null))).unwrap_err();
        assert!(matches!(err, PersistenceError::UnsupportedCondition { .. }));
    }

    #[test]
    fn test_field_names_are_restricted() {
        for bad in ["", "title; DROP TABLE books", "Title", "a.b", "x1"] {
            let err = translate(&Query::with(Condition::equal(bad, "v"))).unwrap_err();
            assert!(matches!(err, PersistenceError::InvalidField(_)), "{bad}");
        }
    }
}
