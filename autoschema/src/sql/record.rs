use std::collections::HashMap;

use async_graphql::{Number, Value};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::error::{Error, Result};
use crate::model::{ColumnKind, ModelMeta};

use super::SqlValue;

/// One decoded row of a model's table, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: HashMap<String, Value>,
}

impl Record {
    pub fn new(values: HashMap<String, Value>) -> Self {
        Self { values }
    }

    /// Decode a SQLite row using the declared column kinds.
    ///
    /// SQLite does not enforce column types, so values are read with
    /// SQLite's own conversions rather than sqlx's strict type checks.
    pub fn from_row(row: &SqliteRow, meta: &ModelMeta) -> Result<Self> {
        let mut values = HashMap::with_capacity(meta.columns.len());

        for column in &meta.columns {
            let name = column.name.as_str();
            let decode_err = |e: sqlx::Error| Error::Decode {
                column: column.name.clone(),
                message: e.to_string(),
            };

            let value = match column.kind {
                ColumnKind::Integer => row
                    .try_get_unchecked::<Option<i64>, _>(name)
                    .map_err(decode_err)?
                    .map(|i| Value::Number(i.into())),
                ColumnKind::Float => row
                    .try_get_unchecked::<Option<f64>, _>(name)
                    .map_err(decode_err)?
                    .map(|f| Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)),
                ColumnKind::Boolean => row
                    .try_get_unchecked::<Option<i64>, _>(name)
                    .map_err(decode_err)?
                    .map(|i| Value::Boolean(i != 0)),
                ColumnKind::Text
                | ColumnKind::Date
                | ColumnKind::DateTime
                | ColumnKind::Uuid
                | ColumnKind::Json => row
                    .try_get_unchecked::<Option<String>, _>(name)
                    .map_err(decode_err)?
                    .map(Value::String),
            };

            values.insert(column.name.clone(), value.unwrap_or(Value::Null));
        }

        Ok(Self { values })
    }

    /// Value of a column, `Null` when absent
    pub fn get(&self, column: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.values.get(column).unwrap_or(&NULL)
    }

    /// Primary key value as a string, for building global ids
    pub fn key_string(&self, meta: &ModelMeta) -> Option<String> {
        let pk = meta.primary_key()?;
        match self.get(&pk.name) {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Value of a column ready to be bound into a query
    pub fn sql_value(&self, column: &str) -> SqlValue {
        match self.get(column) {
            Value::Null => SqlValue::Null,
            Value::Boolean(b) => SqlValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Int(i),
                None => SqlValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => SqlValue::Text(s.clone()),
            other => SqlValue::Text(other.to_string()),
        }
    }
}

/// Convert a GraphQL input value into a bind value for a column kind.
pub fn to_sql_value(kind: ColumnKind, value: &Value) -> Result<SqlValue, String> {
    match (kind, value) {
        (_, Value::Null) => Ok(SqlValue::Null),
        (ColumnKind::Integer, Value::Number(n)) => n
            .as_i64()
            .map(SqlValue::Int)
            .ok_or_else(|| format!("expected an integer, found {}", n)),
        (ColumnKind::Float, Value::Number(n)) => n
            .as_f64()
            .map(SqlValue::Float)
            .ok_or_else(|| format!("expected a number, found {}", n)),
        (ColumnKind::Boolean, Value::Boolean(b)) => Ok(SqlValue::Bool(*b)),
        (
            ColumnKind::Text | ColumnKind::Date | ColumnKind::DateTime | ColumnKind::Uuid,
            Value::String(s),
        ) => Ok(SqlValue::Text(s.clone())),
        (ColumnKind::Json, Value::String(s)) => {
            serde_json::from_str::<serde_json::Value>(s)
                .map_err(|e| format!("invalid JSON string: {}", e))?;
            Ok(SqlValue::Text(s.clone()))
        }
        (kind, other) => Err(format!(
            "expected a {} value, found {}",
            kind.scalar_name(),
            other
        )),
    }
}

/// Parse the key part of a global id into a bind value
pub fn parse_key(kind: ColumnKind, key: &str) -> Option<SqlValue> {
    match kind {
        ColumnKind::Integer => key.parse().ok().map(SqlValue::Int),
        ColumnKind::Float => key.parse().ok().map(SqlValue::Float),
        ColumnKind::Boolean => key.parse().ok().map(SqlValue::Bool),
        _ => Some(SqlValue::Text(key.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_sql_value() {
        assert_eq!(
            to_sql_value(ColumnKind::Integer, &Value::Number(5.into())),
            Ok(SqlValue::Int(5))
        );
        assert_eq!(
            to_sql_value(ColumnKind::Text, &Value::String("a".into())),
            Ok(SqlValue::Text("a".into()))
        );
        assert_eq!(to_sql_value(ColumnKind::Boolean, &Value::Null), Ok(SqlValue::Null));
        assert!(to_sql_value(ColumnKind::Integer, &Value::String("5".into())).is_err());
        assert!(to_sql_value(ColumnKind::Json, &Value::String("{nope".into())).is_err());
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key(ColumnKind::Integer, "42"), Some(SqlValue::Int(42)));
        assert_eq!(parse_key(ColumnKind::Integer, "x"), None);
        assert_eq!(
            parse_key(ColumnKind::Uuid, "abc"),
            Some(SqlValue::Text("abc".into()))
        );
    }

    #[test]
    fn test_record_accessors() {
        let meta = crate::model::ModelMeta::new("User", "users").column(
            crate::model::ColumnMeta::new("id", ColumnKind::Integer).primary_key(true),
        );
        let record = Record::new(HashMap::from([
            ("id".to_string(), Value::Number(7.into())),
            ("name".to_string(), Value::String("Ann".into())),
        ]));

        assert_eq!(record.key_string(&meta), Some("7".to_string()));
        assert_eq!(record.sql_value("id"), SqlValue::Int(7));
        assert_eq!(record.sql_value("name"), SqlValue::Text("Ann".into()));
        assert_eq!(record.get("missing"), &Value::Null);
    }
}
