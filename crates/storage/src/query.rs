//! Search query strings for `files.list`.
//!
//! Only the subset of the query language the client needs: `field op value`
//! clauses joined with a boolean operator.

use crate::types::ListQuery;

/// Value of a query clause.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Bool(bool),
    Text(String),
}

impl QueryValue {
    /// Serialize the value: booleans bare, strings single-quoted with `\` and `'` escaped.
    pub fn serialize(&self) -> String {
        match self {
            QueryValue::Bool(true) => "true".into(),
            QueryValue::Bool(false) => "false".into(),
            QueryValue::Text(text) => {
                format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
            }
        }
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

/// One `field op value` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryClause {
    pub field: String,
    pub op: String,
    pub value: QueryValue,
    pub negated: bool,
}

impl QueryClause {
    /// Create a clause.
    pub fn new(field: &str, op: &str, value: impl Into<QueryValue>) -> Self {
        Self {
            field: field.to_string(),
            op: op.to_string(),
            value: value.into(),
            negated: false,
        }
    }

    /// Negate the clause.
    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Render the clause. The `in` operator takes the value first.
    pub fn render(&self) -> String {
        let value: String = self.value.serialize();
        let clause: String = if self.op == "in" {
            format!("{} {} {}", value, self.op, self.field)
        } else {
            format!("{} {} {}", self.field, self.op, value)
        };
        if self.negated {
            format!("not {}", clause)
        } else {
            clause
        }
    }
}

/// Join rendered clauses with `join` (usually `and`).
pub fn make_query(clauses: &[QueryClause], join: &str) -> String {
    clauses
        .iter()
        .map(QueryClause::render)
        .collect::<Vec<_>>()
        .join(&format!(" {} ", join))
}

impl ListQuery {
    /// Clauses for this listing; trashed files are always excluded.
    pub fn clauses(&self) -> Vec<QueryClause> {
        let mut clauses: Vec<QueryClause> = vec![QueryClause::new("trashed", "=", false)];

        if let Some(ref name) = self.name_equals {
            clauses.push(QueryClause::new("name", "=", name.as_str()));
        }
        if let Some(ref fragment) = self.name_contains {
            clauses.push(QueryClause::new("name", "contains", fragment.as_str()));
        }
        if let Some(ref mime_type) = self.mime_type {
            clauses.push(QueryClause::new("mimeType", "=", mime_type.as_str()));
        }
        if let Some(ref parent) = self.parents_in {
            clauses.push(QueryClause::new("parents", "in", parent.as_str()));
        }

        clauses
    }

    /// Render the listing as a query string.
    pub fn to_query_string(&self) -> String {
        make_query(&self.clauses(), "and")
    }
}
