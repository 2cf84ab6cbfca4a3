//! Shared fixtures: a small library database of authors and books

#![allow(dead_code)]

use autoschema::async_graphql::dynamic::Schema;
use autoschema::{Model, ModelRegistry, SchemaBuilder, SchemaOptions, sync_models};
use serde_json::Value as JsonValue;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

/// People who write books
#[derive(Model)]
#[model(table = "authors")]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    #[relation(target = "Book")]
    pub books: Vec<Book>,
}

#[derive(Model)]
#[model(table = "books")]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub pages: i64,
    pub rating: Option<f64>,
    #[column(default = "1")]
    pub published: bool,
    pub author_id: i64,
    #[relation(target = "Author")]
    pub author: Option<Author>,
}

/// In-memory database; a single connection keeps every query on the same database
pub async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database")
}

pub fn registry() -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    registry
        .register::<Author>()
        .and_then(|r| r.register::<Book>())
        .expect("models register");
    registry
}

/// Pool with the library tables created and filled
pub async fn library_pool() -> SqlitePool {
    let pool = memory_pool().await;
    let result = sync_models(&pool, &registry()).await.expect("sync");
    assert!(result.errors.is_empty(), "{:?}", result.errors);

    sqlx::query(
        "INSERT INTO authors (id, name, email) VALUES
            (1, 'Ann', 'ann@example.com'),
            (2, 'Bob', NULL),
            (3, 'Cyd', 'cyd@example.com')",
    )
    .execute(&pool)
    .await
    .expect("insert authors");

    sqlx::query(
        "INSERT INTO books (id, title, pages, rating, published, author_id) VALUES
            (1, 'Dune', 412, 4.5, 1, 1),
            (2, 'Emma', 320, NULL, 1, 2),
            (3, 'Ubik', 202, 4.0, 0, 1),
            (4, 'Zoo', 150, 3.0, 1, 3),
            (5, 'Arrival', 280, 4.2, 1, 1)",
    )
    .execute(&pool)
    .await
    .expect("insert books");

    pool
}

pub async fn library_schema(options: SchemaOptions) -> (Schema, SqlitePool) {
    let pool = library_pool().await;
    let schema = SchemaBuilder::new(registry())
        .options(options)
        .build(&pool)
        .await
        .expect("schema builds");
    (schema, pool)
}

/// Execute a request that must succeed and return its data as JSON
pub async fn execute(schema: &Schema, query: &str) -> JsonValue {
    let response = schema.execute(query).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    response.data.into_json().expect("json data")
}

/// Titles of `data.allBook.edges[*].node.title`
pub fn book_titles(data: &JsonValue) -> Vec<String> {
    data["allBook"]["edges"]
        .as_array()
        .expect("edges")
        .iter()
        .map(|edge| edge["node"]["title"].as_str().expect("title").to_string())
        .collect()
}
