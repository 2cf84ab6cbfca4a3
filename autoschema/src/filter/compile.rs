//! Translate filter input values into SQL conditions

use async_graphql::Value;

use crate::error::{Error, Result};
use crate::model::{ColumnKind, quote_ident};
use crate::sql::{Condition, SqlValue, to_sql_value};

use super::{CompiledFilter, FilterOp, FilterTarget};

impl CompiledFilter {
    /// Compile a filter input object into a WHERE condition.
    ///
    /// Fields set to null are ignored; `None` means the input put no
    /// restriction on the result.
    pub fn compile(&self, value: &Value) -> Result<Option<Condition>> {
        let fields = match value {
            Value::Null => return Ok(None),
            Value::Object(fields) => fields,
            other => {
                return Err(Error::InvalidFilter(format!(
                    "`{}` expects an object, found {}",
                    self.name, other
                )));
            }
        };

        let mut conditions = Vec::new();

        for (name, value) in fields {
            if matches!(value, Value::Null) {
                continue;
            }

            let condition = match name.as_str() {
                "and" => Condition::and(self.compile_list(value)?),
                "or" => Condition::or(self.compile_list(value)?),
                "not" => self.compile(value)?.map(Condition::not),
                field => match self.target(field) {
                    Some(FilterTarget::Column { column, kind, op }) => {
                        Some(column_condition(column, *kind, *op, value)?)
                    }
                    Some(FilterTarget::Custom(custom)) => (custom.apply)(value)
                        .map_err(|e| Error::InvalidFilter(format!("{}: {}", field, e)))?,
                    None => {
                        return Err(Error::InvalidFilter(format!(
                            "`{}` has no field `{}`",
                            self.name, field
                        )));
                    }
                },
            };

            conditions.extend(condition);
        }

        Ok(Condition::and(conditions))
    }

    fn compile_list(&self, value: &Value) -> Result<Vec<Condition>> {
        let items = match value {
            Value::List(items) => items.as_slice(),
            single => std::slice::from_ref(single),
        };

        let mut conditions = Vec::with_capacity(items.len());
        for item in items {
            conditions.extend(self.compile(item)?);
        }
        Ok(conditions)
    }
}

fn bind(column: &str, kind: ColumnKind, value: &Value) -> Result<SqlValue> {
    to_sql_value(kind, value).map_err(|e| Error::InvalidFilter(format!("{}: {}", column, e)))
}

fn column_condition(column: &str, kind: ColumnKind, op: FilterOp, value: &Value) -> Result<Condition> {
    let col = quote_ident(column);

    let comparison = |operator: &str| -> Result<Condition> {
        Ok(Condition::new(
            format!("{} {} ?", col, operator),
            vec![bind(column, kind, value)?],
        ))
    };

    match op {
        FilterOp::Eq => comparison("="),
        FilterOp::Ne => comparison("<>"),
        FilterOp::Lt => comparison("<"),
        FilterOp::Lte => comparison("<="),
        FilterOp::Gt => comparison(">"),
        FilterOp::Gte => comparison(">="),
        FilterOp::Like => comparison("LIKE"),
        FilterOp::Ilike => Ok(Condition::new(
            format!("lower({}) LIKE lower(?)", col),
            vec![bind(column, kind, value)?],
        )),
        FilterOp::IsNull => match value {
            Value::Boolean(true) => Ok(Condition::raw(format!("{} IS NULL", col))),
            Value::Boolean(false) => Ok(Condition::raw(format!("{} IS NOT NULL", col))),
            other => Err(Error::InvalidFilter(format!(
                "{}IsNull expects a boolean, found {}",
                column, other
            ))),
        },
        FilterOp::In | FilterOp::NotIn => {
            let items = match value {
                Value::List(items) => items.as_slice(),
                single => std::slice::from_ref(single),
            };
            let negated = op == FilterOp::NotIn;

            // An empty IN list matches nothing, an empty NOT IN everything
            if items.is_empty() {
                return Ok(Condition::raw(if negated { "1 = 1" } else { "1 = 0" }));
            }

            let binds = items
                .iter()
                .map(|item| bind(column, kind, item))
                .collect::<Result<Vec<_>>>()?;
            let placeholders = vec!["?"; binds.len()].join(", ");
            Ok(Condition::new(
                format!(
                    "{} {} ({})",
                    col,
                    if negated { "NOT IN" } else { "IN" },
                    placeholders
                ),
                binds,
            ))
        }
        FilterOp::Range => {
            let (begin, end) = match value {
                Value::Object(range) => (range.get("begin"), range.get("end")),
                _ => (None, None),
            };
            match (begin, end) {
                (Some(begin), Some(end)) => Ok(Condition::new(
                    format!("{} BETWEEN ? AND ?", col),
                    vec![bind(column, kind, begin)?, bind(column, kind, end)?],
                )),
                _ => Err(Error::InvalidFilter(format!(
                    "{}Range expects `begin` and `end`",
                    column
                ))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use async_graphql::dynamic::TypeRef;
    use async_graphql::value;

    use super::*;
    use crate::filter::tests::user_meta;
    use crate::filter::{CustomFilter, FilterSet};

    fn compiled() -> CompiledFilter {
        FilterSet::for_model(&user_meta())
            .custom(CustomFilter::new(
                "nameLength",
                TypeRef::named(TypeRef::INT),
                |value| match value {
                    Value::Number(n) => Ok(Some(Condition::new(
                        "length(\"user_name\") = ?",
                        vec![SqlValue::Int(n.as_i64().unwrap_or_default())],
                    ))),
                    _ => Err("expected an integer".to_string()),
                },
            ))
            .compile_for(&user_meta())
            .unwrap()
    }

    #[test]
    fn test_simple_fields_are_anded() {
        let condition = compiled()
            .compile(&value!({ "userName": "ann", "idGt": 3 }))
            .unwrap()
            .unwrap();

        assert_eq!(condition.sql, "(\"user_name\" = ?) AND (\"id\" > ?)");
        assert_eq!(
            condition.binds,
            vec![SqlValue::Text("ann".into()), SqlValue::Int(3)]
        );
    }

    #[test]
    fn test_null_fields_are_ignored() {
        assert_eq!(compiled().compile(&value!({ "userName": null })).unwrap(), None);
        assert_eq!(compiled().compile(&Value::Null).unwrap(), None);
    }

    #[test]
    fn test_or_and_not() {
        let condition = compiled()
            .compile(&value!({
                "or": [{ "userNameIlike": "%an%" }, { "id": 1 }],
                "not": { "active": true }
            }))
            .unwrap()
            .unwrap();

        assert_eq!(
            condition.sql,
            "((lower(\"user_name\") LIKE lower(?)) OR (\"id\" = ?)) AND (NOT (\"active\" = ?))"
        );
        assert_eq!(
            condition.binds,
            vec![
                SqlValue::Text("%an%".into()),
                SqlValue::Int(1),
                SqlValue::Bool(true)
            ]
        );
    }

    #[test]
    fn test_in_and_range() {
        let condition = compiled()
            .compile(&value!({ "idIn": [1, 2, 3] }))
            .unwrap()
            .unwrap();
        assert_eq!(condition.sql, "\"id\" IN (?, ?, ?)");

        let condition = compiled()
            .compile(&value!({ "idRange": { "begin": 2, "end": 4 } }))
            .unwrap()
            .unwrap();
        assert_eq!(condition.sql, "\"id\" BETWEEN ? AND ?");
        assert_eq!(condition.binds, vec![SqlValue::Int(2), SqlValue::Int(4)]);
    }

    #[test]
    fn test_empty_in_lists() {
        let condition = compiled().compile(&value!({ "idIn": [] })).unwrap().unwrap();
        assert_eq!(condition.sql, "1 = 0");

        let condition = compiled()
            .compile(&value!({ "idNotIn": [] }))
            .unwrap()
            .unwrap();
        assert_eq!(condition.sql, "1 = 1");
    }

    #[test]
    fn test_is_null() {
        let condition = compiled()
            .compile(&value!({ "settingsIsNull": false }))
            .unwrap()
            .unwrap();
        assert_eq!(condition.sql, "\"settings\" IS NOT NULL");
        assert!(condition.binds.is_empty());
    }

    #[test]
    fn test_custom_filter_field() {
        let condition = compiled()
            .compile(&value!({ "nameLength": 3 }))
            .unwrap()
            .unwrap();
        assert_eq!(condition.sql, "length(\"user_name\") = ?");

        assert_matches!(
            compiled().compile(&value!({ "nameLength": "three" })),
            Err(Error::InvalidFilter(_))
        );
    }

    #[test]
    fn test_type_mismatch() {
        assert_matches!(
            compiled().compile(&value!({ "id": "one" })),
            Err(Error::InvalidFilter(_))
        );
        assert_matches!(
            compiled().compile(&value!({ "bogus": true })),
            Err(Error::InvalidFilter(_))
        );
    }
}
