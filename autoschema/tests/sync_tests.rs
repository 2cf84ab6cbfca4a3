//! Creating and extending tables from registered models

mod common;

use autoschema::{SchemaSyncResult, sync_models};
use pretty_assertions::assert_eq;
use sqlx::SqlitePool;

use common::{memory_pool, registry};

/// `(name, type, notnull, default)` of every column of a table
async fn columns(pool: &SqlitePool, table: &str) -> Vec<(String, String, i64, Option<String>)> {
    let rows: Vec<(i64, String, String, i64, Option<String>, i64)> =
        sqlx::query_as(&format!("PRAGMA table_info(\"{}\")", table))
            .fetch_all(pool)
            .await
            .unwrap();
    rows.into_iter()
        .map(|(_, name, ty, notnull, default, _)| (name, ty, notnull, default))
        .collect()
}

#[tokio::test]
async fn test_sync_adds_missing_columns_and_tables() {
    let pool = memory_pool().await;
    sqlx::query("CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO authors (id, name) VALUES (1, 'Ann')")
        .execute(&pool)
        .await
        .unwrap();

    let result = sync_models(&pool, &registry()).await.unwrap();
    assert_eq!(
        result,
        SchemaSyncResult {
            tables_created: vec!["books".to_string()],
            columns_added: vec![("authors".to_string(), "email".to_string())],
            errors: Vec::new(),
        }
    );

    assert_eq!(
        columns(&pool, "authors").await,
        vec![
            ("id".to_string(), "INTEGER".to_string(), 0, None),
            ("name".to_string(), "TEXT".to_string(), 1, None),
            ("email".to_string(), "TEXT".to_string(), 0, None),
        ]
    );
    let book_columns: Vec<String> = columns(&pool, "books")
        .await
        .into_iter()
        .map(|(name, ..)| name)
        .collect();
    assert_eq!(
        book_columns,
        vec!["id", "title", "pages", "rating", "published", "author_id"]
    );

    // Existing rows survive and get NULL for the new column
    let (name, email): (String, Option<String>) =
        sqlx::query_as("SELECT name, email FROM authors WHERE id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!((name.as_str(), email), ("Ann", None));

    // A second run has nothing to do
    assert_eq!(
        sync_models(&pool, &registry()).await.unwrap(),
        SchemaSyncResult::default()
    );
}

#[tokio::test]
async fn test_sync_adds_not_null_columns_with_a_default() {
    let pool = memory_pool().await;
    sqlx::query("CREATE TABLE books (id INTEGER PRIMARY KEY, title TEXT NOT NULL, author_id INTEGER NOT NULL)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO books (id, title, author_id) VALUES (1, 'Dune', 1)")
        .execute(&pool)
        .await
        .unwrap();

    let result = sync_models(&pool, &registry()).await.unwrap();
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(
        result.columns_added,
        vec![
            ("books".to_string(), "pages".to_string()),
            ("books".to_string(), "rating".to_string()),
            ("books".to_string(), "published".to_string()),
        ]
    );

    let (pages, rating, published): (i64, Option<f64>, bool) =
        sqlx::query_as("SELECT pages, rating, published FROM books WHERE id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!((pages, rating, published), (0, None, true));
}
