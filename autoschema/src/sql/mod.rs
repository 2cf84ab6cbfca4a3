//! SQL building blocks
//!
//! Filters, sorting and mutations all end up as parameterized statements
//! executed through sqlx. Nothing here knows about GraphQL types except
//! for [`Record`], which keeps decoded values as `async_graphql::Value`
//! so resolvers can hand them out directly.

mod query;
mod record;

pub use query::{Select, delete_by_pk, insert, update_by_pk};
pub use record::{Record, parse_key, to_sql_value};

use sqlx::Sqlite;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;

/// Represents a SQL value that can be bound to a query.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl SqlValue {
    /// Bind this value to a sqlx query
    pub fn bind_to<'q>(
        &self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Null => query.bind(None::<String>),
        }
    }
}

/// A WHERE clause fragment with its bind values, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub sql: String,
    pub binds: Vec<SqlValue>,
}

impl Condition {
    pub fn new(sql: impl Into<String>, binds: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            binds,
        }
    }

    /// A condition without parameters
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    /// Join conditions with AND; `None` when there is nothing to join
    pub fn and(conditions: Vec<Condition>) -> Option<Condition> {
        Self::join(conditions, " AND ")
    }

    /// Join conditions with OR; `None` when there is nothing to join
    pub fn or(conditions: Vec<Condition>) -> Option<Condition> {
        Self::join(conditions, " OR ")
    }

    pub fn not(condition: Condition) -> Condition {
        Condition {
            sql: format!("NOT ({})", condition.sql),
            binds: condition.binds,
        }
    }

    fn join(conditions: Vec<Condition>, separator: &str) -> Option<Condition> {
        match conditions.len() {
            0 => None,
            1 => conditions.into_iter().next(),
            _ => {
                let mut parts = Vec::with_capacity(conditions.len());
                let mut binds = Vec::new();
                for condition in conditions {
                    parts.push(format!("({})", condition.sql));
                    binds.extend(condition.binds);
                }
                Some(Condition {
                    sql: parts.join(separator),
                    binds,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_join() {
        let a = Condition::new("\"a\" = ?", vec![SqlValue::Int(1)]);
        let b = Condition::new("\"b\" = ?", vec![SqlValue::Text("x".into())]);

        let joined = Condition::or(vec![a.clone(), b]).unwrap();
        assert_eq!(joined.sql, "(\"a\" = ?) OR (\"b\" = ?)");
        assert_eq!(
            joined.binds,
            vec![SqlValue::Int(1), SqlValue::Text("x".into())]
        );

        assert_eq!(Condition::and(vec![a.clone()]), Some(a.clone()));
        assert_eq!(Condition::and(Vec::new()), None);
        assert_eq!(Condition::not(a).sql, "NOT (\"a\" = ?)");
    }
}
