//! SQL query builder for model tables
//!
//! Builds parameterized SELECT/COUNT/INSERT/UPDATE/DELETE statements from
//! [`ModelMeta`] and binds values via sqlx to prevent SQL injection.

use sqlx::{Row, SqlitePool};

use crate::error::Result;
use crate::model::{ModelMeta, quote_ident};

use super::{Condition, Record, SqlValue};

/// A SELECT over one model's table.
pub struct Select<'m> {
    meta: &'m ModelMeta,
    where_clauses: Vec<String>,
    values: Vec<SqlValue>,
    order_by: Vec<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl<'m> Select<'m> {
    pub fn new(meta: &'m ModelMeta) -> Self {
        Self {
            meta,
            where_clauses: Vec::new(),
            values: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Add a condition; multiple conditions are joined with AND.
    pub fn filter(mut self, condition: Option<Condition>) -> Self {
        if let Some(condition) = condition {
            self.where_clauses.push(format!("({})", condition.sql));
            self.values.extend(condition.binds);
        }
        self
    }

    /// Add `column = value`
    pub fn where_eq(self, column: &str, value: SqlValue) -> Self {
        let condition = Condition::new(format!("{} = ?", quote_ident(column)), vec![value]);
        self.filter(Some(condition))
    }

    /// Add sorting on a column
    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.order_by.push(format!(
            "{} {}",
            quote_ident(column),
            if descending { "DESC" } else { "ASC" }
        ));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    fn where_sql(&self) -> String {
        if self.where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.where_clauses.join(" AND "))
        }
    }

    /// Build the SQL query string.
    pub fn build_sql(&self) -> String {
        let columns: Vec<String> = self.meta.columns.iter().map(|c| quote_ident(&c.name)).collect();
        let mut sql = format!(
            "SELECT {} FROM {}{}",
            columns.join(", "),
            self.meta.qualified_table(),
            self.where_sql()
        );

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) if offset > 0 => {
                sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset))
            }
            (Some(limit), _) => sql.push_str(&format!(" LIMIT {}", limit)),
            // SQLite only accepts OFFSET after a LIMIT
            (None, Some(offset)) if offset > 0 => {
                sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset))
            }
            _ => {}
        }

        sql
    }

    /// Build a COUNT query string.
    pub fn build_count_sql(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM {}{}",
            self.meta.qualified_table(),
            self.where_sql()
        )
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Execute the query and return all matching records.
    pub async fn fetch_all(&self, pool: &SqlitePool) -> Result<Vec<Record>> {
        let sql = self.build_sql();
        tracing::debug!(sql = %sql, binds = self.values.len(), "Executing select");

        let mut query = sqlx::query(&sql);
        for value in &self.values {
            query = value.bind_to(query);
        }

        let rows = query.fetch_all(pool).await?;
        rows.iter().map(|row| Record::from_row(row, self.meta)).collect()
    }

    /// Execute the query and return the first record.
    pub async fn fetch_optional(self, pool: &SqlitePool) -> Result<Option<Record>> {
        let records = self.limit(1).fetch_all(pool).await?;
        Ok(records.into_iter().next())
    }

    /// Execute a COUNT query, ignoring limit and offset.
    pub async fn count(&self, pool: &SqlitePool) -> Result<i64> {
        let sql = self.build_count_sql();
        tracing::debug!(sql = %sql, "Executing count");

        let mut query = sqlx::query(&sql);
        for value in &self.values {
            query = value.bind_to(query);
        }

        let row = query.fetch_one(pool).await?;
        Ok(row.try_get::<i64, _>(0)?)
    }
}

async fn execute(pool: &SqlitePool, sql: &str, values: &[SqlValue]) -> Result<sqlx::sqlite::SqliteQueryResult> {
    tracing::debug!(sql = %sql, binds = values.len(), "Executing statement");

    let mut query = sqlx::query(sql);
    for value in values {
        query = value.bind_to(query);
    }
    Ok(query.execute(pool).await?)
}

/// Insert a row and return its rowid.
pub async fn insert(pool: &SqlitePool, meta: &ModelMeta, values: &[(String, SqlValue)]) -> Result<i64> {
    let sql = if values.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", meta.qualified_table())
    } else {
        let columns: Vec<String> = values.iter().map(|(c, _)| quote_ident(c)).collect();
        let placeholders = vec!["?"; values.len()];
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            meta.qualified_table(),
            columns.join(", "),
            placeholders.join(", ")
        )
    };

    let binds: Vec<SqlValue> = values.iter().map(|(_, v)| v.clone()).collect();
    let result = execute(pool, &sql, &binds).await?;
    Ok(result.last_insert_rowid())
}

/// Update columns of the row with the given primary key, returning the number of rows changed.
pub async fn update_by_pk(
    pool: &SqlitePool,
    meta: &ModelMeta,
    pk: &str,
    key: SqlValue,
    values: &[(String, SqlValue)],
) -> Result<u64> {
    let assignments: Vec<String> = values
        .iter()
        .map(|(c, _)| format!("{} = ?", quote_ident(c)))
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        meta.qualified_table(),
        assignments.join(", "),
        quote_ident(pk)
    );

    let mut binds: Vec<SqlValue> = values.iter().map(|(_, v)| v.clone()).collect();
    binds.push(key);
    Ok(execute(pool, &sql, &binds).await?.rows_affected())
}

/// Delete the row with the given primary key, returning the number of rows removed.
pub async fn delete_by_pk(pool: &SqlitePool, meta: &ModelMeta, pk: &str, key: SqlValue) -> Result<u64> {
    let sql = format!(
        "DELETE FROM {} WHERE {} = ?",
        meta.qualified_table(),
        quote_ident(pk)
    );
    Ok(execute(pool, &sql, &[key]).await?.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnKind, ColumnMeta};

    fn meta() -> ModelMeta {
        ModelMeta::new("Book", "books")
            .column(ColumnMeta::new("id", ColumnKind::Integer).primary_key(true))
            .column(ColumnMeta::new("title", ColumnKind::Text))
    }

    #[test]
    fn test_build_sql() {
        let meta = meta();
        let select = Select::new(&meta)
            .where_eq("title", SqlValue::Text("Dune".into()))
            .order_by("id", true)
            .limit(10)
            .offset(20);

        assert_eq!(
            select.build_sql(),
            "SELECT \"id\", \"title\" FROM \"books\" WHERE (\"title\" = ?) ORDER BY \"id\" DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(
            select.build_count_sql(),
            "SELECT COUNT(*) FROM \"books\" WHERE (\"title\" = ?)"
        );
        assert_eq!(select.values(), &[SqlValue::Text("Dune".into())]);
    }

    #[test]
    fn test_offset_without_limit() {
        let meta = meta();
        let select = Select::new(&meta).offset(5);
        assert_eq!(
            select.build_sql(),
            "SELECT \"id\", \"title\" FROM \"books\" LIMIT -1 OFFSET 5"
        );
    }
}
