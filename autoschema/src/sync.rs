//! Create tables for registered models
//!
//! - Creates missing tables from the model definition
//! - Adds missing columns to existing tables
//! - Does NOT handle column renames or type changes

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model::{ColumnKind, ColumnMeta, ModelMeta, ModelRegistry, quote_ident};

/// Result of a schema sync operation
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SchemaSyncResult {
    pub tables_created: Vec<String>,
    pub columns_added: Vec<(String, String)>, // (table, column)
    pub errors: Vec<String>,
}

impl SchemaSyncResult {
    fn merge(&mut self, other: SchemaSyncResult) {
        self.tables_created.extend(other.tables_created);
        self.columns_added.extend(other.columns_added);
        self.errors.extend(other.errors);
    }
}

fn master_table(meta: &ModelMeta) -> String {
    match meta.schema {
        Some(ref schema) => format!("{}.sqlite_master", quote_ident(schema)),
        None => "sqlite_master".to_string(),
    }
}

async fn table_exists(pool: &SqlitePool, meta: &ModelMeta) -> Result<bool> {
    let sql = format!(
        "SELECT name FROM {} WHERE type = 'table' AND name = ?",
        master_table(meta)
    );
    let result: Option<(String,)> = sqlx::query_as(&sql)
        .bind(meta.table.as_str())
        .fetch_optional(pool)
        .await?;

    Ok(result.is_some())
}

async fn table_columns(pool: &SqlitePool, meta: &ModelMeta) -> Result<Vec<String>> {
    let pragma = match meta.schema {
        Some(ref schema) => format!("PRAGMA {}.table_info({})", quote_ident(schema), quote_ident(&meta.table)),
        None => format!("PRAGMA table_info({})", quote_ident(&meta.table)),
    };
    let rows: Vec<(i64, String, String, i64, Option<String>, i64)> =
        sqlx::query_as(&pragma).fetch_all(pool).await?;

    Ok(rows.into_iter().map(|(_, name, _, _, _, _)| name).collect())
}

/// ALTER TABLE ADD COLUMN for a missing column.
///
/// SQLite cannot add PRIMARY KEY columns, and NOT NULL columns need a
/// default, so a zero value of the column's type is supplied.
fn add_column_sql(meta: &ModelMeta, column: &ColumnMeta) -> String {
    let mut sql = format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        meta.qualified_table(),
        quote_ident(&column.name),
        column.kind.sql_type()
    );

    if let Some(ref default) = column.default {
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        sql.push_str(&format!(" DEFAULT {}", default));
    } else if !column.nullable {
        let zero = match column.kind {
            ColumnKind::Integer | ColumnKind::Boolean => "0",
            ColumnKind::Float => "0.0",
            ColumnKind::Json => "'{}'",
            _ => "''",
        };
        sql.push_str(&format!(" NOT NULL DEFAULT {}", zero));
    }

    sql
}

/// Sync one model's table
pub async fn sync_model(pool: &SqlitePool, meta: &ModelMeta) -> Result<SchemaSyncResult> {
    let mut result = SchemaSyncResult::default();

    if !table_exists(pool, meta).await? {
        let create_sql = meta.create_table_sql();
        debug!(table = %meta.table, sql = %create_sql, "Creating table");

        match sqlx::query(&create_sql).execute(pool).await {
            Ok(_) => {
                info!(table = %meta.table, "Created table");
                result.tables_created.push(meta.table.clone());
            }
            Err(e) => {
                let msg = format!("Failed to create table {}: {}", meta.table, e);
                warn!("{}", msg);
                result.errors.push(msg);
            }
        }
        return Ok(result);
    }

    let existing = table_columns(pool, meta).await?;
    for column in meta.columns.iter().filter(|c| !existing.contains(&c.name)) {
        let alter_sql = add_column_sql(meta, column);
        debug!(table = %meta.table, sql = %alter_sql, "Adding column");

        match sqlx::query(&alter_sql).execute(pool).await {
            Ok(_) => {
                info!(table = %meta.table, column = %column.name, "Added column");
                result
                    .columns_added
                    .push((meta.table.clone(), column.name.clone()));
            }
            Err(e) => {
                let msg = format!("Failed to add column {}.{}: {}", meta.table, column.name, e);
                warn!("{}", msg);
                result.errors.push(msg);
            }
        }
    }

    Ok(result)
}

/// Sync every registered model's table
pub async fn sync_models(pool: &SqlitePool, registry: &ModelRegistry) -> Result<SchemaSyncResult> {
    let mut result = SchemaSyncResult::default();
    for meta in registry.models() {
        result.merge(sync_model(pool, meta).await?);
    }

    info!(
        tables_created = result.tables_created.len(),
        columns_added = result.columns_added.len(),
        errors = result.errors.len(),
        "Schema sync complete"
    );
    Ok(result)
}
