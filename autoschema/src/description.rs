//! Table descriptions read from the database
//!
//! SQLite has no `COMMENT ON TABLE`, but it stores the original
//! `CREATE TABLE` text verbatim, comments included. The first comment in
//! that statement is used as the table's description.

use sqlx::SqlitePool;
use tracing::warn;

use crate::model::{ModelMeta, quote_ident};

/// First SQL comment (`-- ...` or `/* ... */`) in a statement, ignoring
/// anything inside quoted strings or identifiers.
pub fn extract_comment(sql: &str) -> Option<String> {
    let chars: Vec<char> = sql.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            quote @ ('\'' | '"' | '`') => {
                i += 1;
                while i < chars.len() && chars[i] != quote {
                    i += 1;
                }
                i += 1;
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                let start = i + 2;
                let end = chars[start..]
                    .iter()
                    .position(|&c| c == '\n')
                    .map(|p| start + p)
                    .unwrap_or(chars.len());
                let text: String = chars[start..end].iter().collect();
                let text = text.trim();
                if !text.is_empty() {
                    return Some(text.to_string());
                }
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let start = i + 2;
                let end = chars[start..]
                    .windows(2)
                    .position(|w| w[0] == '*' && w[1] == '/')
                    .map(|p| start + p)
                    .unwrap_or(chars.len());
                let text: String = chars[start..end].iter().collect();
                let text = text.trim();
                if !text.is_empty() {
                    return Some(text.to_string());
                }
                i = end + 2;
            }
            _ => i += 1,
        }
    }

    None
}

/// Read a model's table description from the database.
///
/// This issues one query per model at schema build time. Any failure is
/// logged and treated as "no description".
pub async fn table_description(pool: &SqlitePool, meta: &ModelMeta) -> Option<String> {
    let master = match meta.schema {
        Some(ref schema) => format!("{}.sqlite_master", quote_ident(schema)),
        None => "sqlite_master".to_string(),
    };
    let sql = format!("SELECT sql FROM {} WHERE type = 'table' AND name = ?", master);

    let result: Result<Option<(Option<String>,)>, sqlx::Error> = sqlx::query_as(&sql)
        .bind(meta.table.as_str())
        .fetch_optional(pool)
        .await;

    match result {
        Ok(Some((Some(create_sql),))) => extract_comment(&create_sql),
        Ok(_) => {
            warn!(model = %meta.name, table = %meta.table, "Can't get table description: table not found");
            None
        }
        Err(e) => {
            warn!(model = %meta.name, error = %e, "Can't get table description");
            None
        }
    }
}
