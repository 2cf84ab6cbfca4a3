//! Shape of the generated schema

mod common;

use assert_matches::assert_matches;
use autoschema::{
    ColumnKind, ColumnMeta, Customizations, Error, FilterOp, FilterSet, ModelMeta, ModelRegistry,
    RelationMeta, SchemaBuilder, SchemaOptions,
};
use pretty_assertions::assert_eq;

use common::{execute, library_pool, library_schema, memory_pool, registry};

#[tokio::test]
async fn test_sdl_contains_generated_types() {
    let (schema, _pool) = library_schema(SchemaOptions::default()).await;
    let sdl = schema.sdl();

    for expected in [
        "interface Node",
        "type PageInfo",
        "type BookNode implements Node",
        "type BookConnection",
        "type BookEdge",
        "enum BookNodeSortEnum",
        "input BookFilter",
        "input IntRange",
        "input BookCreateInput",
        "input BookUpdateInput",
        "type BookPayload",
        "type AuthorNode implements Node",
        "allBook(",
        "allAuthor(",
        "node(",
        "createBook(input: BookCreateInput!): BookPayload!",
        "deleteAuthor(id: ID!): AuthorPayload!",
        "People who write books",
    ] {
        assert!(sdl.contains(expected), "missing `{}` in:\n{}", expected, sdl);
    }
}

#[tokio::test]
async fn test_boolean_columns_only_get_equality_filters() {
    let (schema, _pool) = library_schema(SchemaOptions::default()).await;
    let sdl = schema.sdl();

    assert!(sdl.contains("publishedNe: Boolean"));
    assert!(!sdl.contains("publishedGt"));
    assert!(!sdl.contains("publishedRange"));
}

#[tokio::test]
async fn test_model_without_primary_key_is_rejected() {
    let pool = memory_pool().await;
    let mut registry = ModelRegistry::new();
    registry
        .register_meta(ModelMeta::new("Log", "logs").column(ColumnMeta::new("line", ColumnKind::Text)))
        .unwrap();

    let result = SchemaBuilder::new(registry).build(&pool).await;
    assert_matches!(result, Err(Error::MissingPrimaryKey(model)) if model == "Log");
}

#[tokio::test]
async fn test_relation_to_unknown_model_is_rejected() {
    let pool = memory_pool().await;
    let mut registry = ModelRegistry::new();
    registry
        .register_meta(
            ModelMeta::new("Book", "books")
                .column(ColumnMeta::new("id", ColumnKind::Integer).primary_key(true))
                .relation(RelationMeta::belongs_to("author", "Author", "author_id", "id")),
        )
        .unwrap();

    let result = SchemaBuilder::new(registry).build(&pool).await;
    assert_matches!(result, Err(Error::UnknownModel(model)) if model == "Author");
}

#[tokio::test]
async fn test_custom_filter_on_unknown_column_is_rejected() {
    let pool = library_pool().await;
    let result = SchemaBuilder::new(registry())
        .customizations(
            Customizations::new().filter(FilterSet::new("BookFilter").field("isbn", [FilterOp::Eq])),
        )
        .build(&pool)
        .await;
    assert_matches!(result, Err(Error::InvalidFilter(_)));
}

#[tokio::test]
async fn test_unknown_exclusions_are_ignored() {
    let options = SchemaOptions {
        exclude_models: vec!["Nope".to_string()],
        ..Default::default()
    };
    let (schema, _pool) = library_schema(options).await;
    assert!(schema.sdl().contains("type BookNode"));
}

#[tokio::test]
async fn test_sort_enum_values() {
    let (schema, _pool) = library_schema(SchemaOptions::default()).await;
    let data = execute(
        &schema,
        "{ __type(name: \"AuthorNodeSortEnum\") { enumValues { name } } }",
    )
    .await;

    let values: Vec<&str> = data["__type"]["enumValues"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v["name"].as_str())
        .collect();
    assert_eq!(
        values,
        vec!["ID_ASC", "ID_DESC", "NAME_ASC", "NAME_DESC", "EMAIL_ASC", "EMAIL_DESC"]
    );
}

#[tokio::test]
async fn test_clashing_generated_names_are_errors() {
    let pool = memory_pool().await;
    sqlx::query("CREATE TABLE things (id INTEGER PRIMARY KEY, db_id TEXT NOT NULL)")
        .execute(&pool)
        .await
        .unwrap();
    let result = SchemaBuilder::new(ModelRegistry::reflect(&pool).await.unwrap())
        .build(&pool)
        .await;
    assert_matches!(
        result,
        Err(Error::DuplicateField { type_name, field }) if type_name == "ThingsNode" && field == "dbId"
    );

    let mut registry = ModelRegistry::new();
    registry
        .register_meta(
            ModelMeta::new("Flag", "flags")
                .column(ColumnMeta::new("id", ColumnKind::Integer).primary_key(true))
                .column(ColumnMeta::new("not", ColumnKind::Boolean)),
        )
        .unwrap();
    let result = SchemaBuilder::new(registry).build(&pool).await;
    assert_matches!(
        result,
        Err(Error::DuplicateField { type_name, field }) if type_name == "FlagFilter" && field == "not"
    );
}

#[tokio::test]
async fn test_clash_can_be_resolved_by_hiding_a_field() {
    let pool = memory_pool().await;
    sqlx::query("CREATE TABLE things (id INTEGER PRIMARY KEY, db_id TEXT NOT NULL)")
        .execute(&pool)
        .await
        .unwrap();
    let schema = SchemaBuilder::new(ModelRegistry::reflect(&pool).await.unwrap())
        .customizations(Customizations::new().node(autoschema::NodeOverride::new("ThingsNode").exclude("db_id")))
        .build(&pool)
        .await
        .unwrap();

    let data = execute(&schema, "{ __type(name: \"ThingsNode\") { fields { name } } }").await;
    assert_eq!(
        data["__type"]["fields"],
        serde_json::json!([{ "name": "id" }, { "name": "dbId" }])
    );
}
