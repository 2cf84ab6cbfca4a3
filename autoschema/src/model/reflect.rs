//! Build a registry by introspecting an existing SQLite database

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::naming::camelize;

use super::{ColumnKind, ColumnMeta, ModelMeta, ModelRegistry, RelationMeta, quote_ident};

/// Row of `PRAGMA table_info`
type TableInfoRow = (i64, String, String, i64, Option<String>, i64);

/// Row of `PRAGMA foreign_key_list`
type ForeignKeyRow = (i64, i64, String, String, Option<String>, String, String, String);

/// A user table and whether it has a rowid
struct TableInfo {
    name: String,
    has_rowid: bool,
}

/// Get the user tables of the database, skipping SQLite internals
async fn list_tables(pool: &SqlitePool) -> Result<Vec<TableInfo>> {
    let rows: Vec<(String, Option<String>)> = sqlx::query_as(
        "SELECT name, sql FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(name, sql)| TableInfo {
            name,
            has_rowid: !sql
                .map(|sql| sql.to_ascii_uppercase().contains("WITHOUT ROWID"))
                .unwrap_or(false),
        })
        .collect())
}

/// Only a column declared exactly `INTEGER PRIMARY KEY` in a rowid table
/// aliases the rowid; `BIGINT` or `INT` keys are ordinary columns.
fn is_rowid_alias(declared: &str, has_rowid: bool) -> bool {
    has_rowid && declared.trim().eq_ignore_ascii_case("INTEGER")
}

async fn table_columns(pool: &SqlitePool, table: &TableInfo) -> Result<Vec<ColumnMeta>> {
    let rows: Vec<TableInfoRow> =
        sqlx::query_as(&format!("PRAGMA table_info({})", quote_ident(&table.name)))
            .fetch_all(pool)
            .await?;
    let single_key = rows.iter().filter(|row| row.5 > 0).count() == 1;

    Ok(rows
        .into_iter()
        .map(|(_, name, declared, notnull, default, pk)| {
            let mut column = ColumnMeta::new(name, ColumnKind::from_sql_type(&declared))
                .nullable(notnull == 0 && pk == 0)
                .primary_key(pk > 0)
                .rowid_alias(pk > 0 && single_key && is_rowid_alias(&declared, table.has_rowid));
            if let Some(default) = default {
                column = column.default_value(default);
            }
            column
        })
        .collect())
}

async fn foreign_keys(pool: &SqlitePool, table: &str) -> Result<Vec<ForeignKeyRow>> {
    let rows: Vec<ForeignKeyRow> =
        sqlx::query_as(&format!("PRAGMA foreign_key_list({})", quote_ident(table)))
            .fetch_all(pool)
            .await?;
    Ok(rows)
}

/// Relation field name for a foreign key column: `author_id` -> `author`
fn belongs_to_name(from: &str, target_table: &str) -> String {
    from.strip_suffix("_id")
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| target_table.to_string())
}

fn unique_relation_name(meta: &ModelMeta, name: String, from: &str) -> String {
    let taken = |candidate: &str| {
        meta.relations.iter().any(|r| r.name == candidate)
            || meta.columns.iter().any(|c| c.name == candidate)
    };
    if taken(&name) {
        format!("{}_by_{}", name, from)
    } else {
        name
    }
}

impl ModelRegistry {
    /// Reflect every table of an SQLite database into model descriptions.
    ///
    /// Foreign keys become a `BelongsTo` relation on the referencing model
    /// and a `HasMany` relation on the referenced one. Tables without a
    /// single-column primary key cannot be Relay nodes and are skipped.
    pub async fn reflect(pool: &SqlitePool) -> Result<Self> {
        let mut models: Vec<ModelMeta> = Vec::new();
        let mut keys: Vec<(String, ForeignKeyRow)> = Vec::new();

        for info in list_tables(pool).await? {
            let columns = table_columns(pool, &info).await?;
            let table = info.name;
            let pk_count = columns.iter().filter(|c| c.primary_key).count();
            if pk_count != 1 {
                warn!(
                    table = %table,
                    primary_key_columns = pk_count,
                    "Skipping table without a single-column primary key"
                );
                continue;
            }

            let mut meta = ModelMeta::new(camelize(&table), table.as_str());
            meta.columns = columns;
            keys.extend(
                foreign_keys(pool, &table)
                    .await?
                    .into_iter()
                    .map(|fk| (table.clone(), fk)),
            );
            models.push(meta);
        }

        for (table, (_, seq, target_table, from, to, _, _, _)) in keys {
            if seq > 0 {
                debug!(table = %table, "Skipping composite foreign key column");
                continue;
            }
            let Some(target_idx) = models.iter().position(|m| m.table == target_table) else {
                continue;
            };
            let Some(owner_idx) = models.iter().position(|m| m.table == table) else {
                continue;
            };
            let to = match to {
                Some(to) => to,
                None => match models[target_idx].primary_key() {
                    Some(pk) => pk.name.clone(),
                    None => continue,
                },
            };

            let owner_name = models[owner_idx].name.clone();
            let target_name = models[target_idx].name.clone();

            let name = unique_relation_name(
                &models[owner_idx],
                belongs_to_name(&from, &target_table),
                &from,
            );
            models[owner_idx]
                .relations
                .push(RelationMeta::belongs_to(name, target_name, from.clone(), to.clone()));

            let name = unique_relation_name(&models[target_idx], table.clone(), &from);
            models[target_idx]
                .relations
                .push(RelationMeta::has_many(name, owner_name, to, from));
        }

        let mut registry = ModelRegistry::new();
        for meta in models {
            registry.register_meta(meta)?;
        }
        info!(models = registry.len(), "Reflected database schema");
        Ok(registry)
    }
}
