//! Repository-agnostic filter algebra.
//!
//! A [`Query`] is an ordered sequence of nodes, each pairing a
//! [`Condition`] with the [`LogicalOperator`] that joins it to the node
//! before it. The first node never carries an operator. Adapters translate
//! a query into their native dialect in a single pass over [`Query::iter`].

/// How a field is compared against a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    /// Exact equality.
    Equal,
    /// Inequality.
    NotEqual,
    /// Case-insensitive substring match.
    Match,
}

/// How a node is joined to the node before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    /// Returns the operator keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

/// A typed value on the right-hand side of a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Bool(bool),
}

impl Value {
    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A single `field <operator> value` predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: String,
    pub operator: ComparisonOperator,
    pub value: Value,
}

impl Condition {
    /// Creates a condition.
    pub fn new(field: impl Into<String>, operator: ComparisonOperator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Shorthand for an [`ComparisonOperator::Equal`] condition.
    pub fn equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, ComparisonOperator::Equal, value)
    }

    /// Shorthand for a [`ComparisonOperator::NotEqual`] condition.
    pub fn not_equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, ComparisonOperator::NotEqual, value)
    }

    /// Shorthand for a [`ComparisonOperator::Match`] condition.
    pub fn matches(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, ComparisonOperator::Match, value)
    }
}

/// One link of a query: the condition and its joining operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// `None` only for the first node.
    pub operator: Option<LogicalOperator>,
    pub condition: Condition,
}

/// Ordered, composable filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    nodes: Vec<Node>,
}

impl Query {
    /// Creates an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query holding a single condition.
    pub fn with(condition: Condition) -> Self {
        Self {
            nodes: vec![Node {
                operator: None,
                condition,
            }],
        }
    }

    /// Appends a condition joined with `AND`.
    pub fn and(self, condition: Condition) -> Self {
        self.push(LogicalOperator::And, condition)
    }

    /// Appends a condition joined with `OR`.
    pub fn or(self, condition: Condition) -> Self {
        self.push(LogicalOperator::Or, condition)
    }

    /// Appends a condition with the given operator.
    ///
    /// The operator is dropped when the query is empty, so the first node
    /// never carries one.
    pub fn push(mut self, operator: LogicalOperator, condition: Condition) -> Self {
        let operator = (!self.nodes.is_empty()).then_some(operator);
        self.nodes.push(Node {
            operator,
            condition,
        });
        self
    }

    /// Returns `(self) AND condition`.
    ///
    /// Nodes are flat and `AND` binds tighter than `OR`, so appending with
    /// [`Query::and`] would only restrict the last `OR` group. The condition
    /// is instead added to every group: `a OR b` becomes
    /// `a AND c OR b AND c`.
    pub fn restrict(self, condition: Condition) -> Self {
        if self.nodes.is_empty() {
            return Self::with(condition);
        }
        let mut nodes = Vec::with_capacity(self.nodes.len() * 2);
        for node in self.nodes {
            if node.operator == Some(LogicalOperator::Or) {
                nodes.push(Node {
                    operator: Some(LogicalOperator::And),
                    condition: condition.clone(),
                });
            }
            nodes.push(node);
        }
        nodes.push(Node {
            operator: Some(LogicalOperator::And),
            condition,
        });
        Self { nodes }
    }

    /// Returns true if the query has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Iterates nodes in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }
}

impl<'a> IntoIterator for &'a Query {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
