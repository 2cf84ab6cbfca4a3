//! Query root: `node(id)` and one `all{Model}` connection per model

use std::sync::Arc;

use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, Object, TypeRef};
use sqlx::SqlitePool;

use crate::error::{Error, Result};
use crate::sql::{Record, Select, parse_key};

use super::NODE_INTERFACE;
use super::catalog::{Catalog, ModelEntry};
use super::connection::{connection_arguments, resolve_connection};
use super::node::decode_global_id;

/// Fetch the object a global id points to, with the node type it belongs to.
pub(crate) async fn fetch_node<'c>(
    pool: &SqlitePool,
    catalog: &'c Catalog,
    id: &str,
) -> Result<Option<(&'c ModelEntry, Record)>> {
    let (type_name, key) = decode_global_id(id)?;
    let entry = catalog
        .by_node(&type_name)
        .ok_or_else(|| Error::InvalidGlobalId(format!("{} (unknown type {})", id, type_name)))?;

    let pk = entry.primary_key();
    let Some(key) = parse_key(pk.kind, &key) else {
        return Err(Error::InvalidGlobalId(id.to_string()));
    };

    let record = Select::new(&entry.meta)
        .where_eq(&pk.name, key)
        .fetch_optional(pool)
        .await?;
    Ok(record.map(|r| (entry, r)))
}

fn node_field(catalog: &Arc<Catalog>) -> Field {
    let catalog = catalog.clone();

    Field::new("node", TypeRef::named(NODE_INTERFACE), move |ctx| {
        let catalog = catalog.clone();
        FieldFuture::new(async move {
            let id = ctx.args.try_get("id")?.string()?.to_string();
            let pool = ctx.data::<SqlitePool>()?;

            Ok(fetch_node(pool, &catalog, &id)
                .await?
                .map(|(entry, record)| FieldValue::owned_any(record).with_type(entry.node.clone())))
        })
    })
    .argument(InputValue::new("id", TypeRef::named_nn(TypeRef::ID)).description("The ID of the object"))
    .description("Fetches an object given its ID")
}

fn list_field(catalog: &Arc<Catalog>, index: usize) -> Field {
    let entry = &catalog.entries[index];
    let resolver_catalog = catalog.clone();

    let mut field = Field::new(&entry.query_field, TypeRef::named_nn(&entry.connection), move |ctx| {
        let catalog = resolver_catalog.clone();
        FieldFuture::new(async move {
            let pool = ctx.data::<SqlitePool>()?;
            let connection =
                resolve_connection(pool, &catalog, &catalog.entries[index], &ctx.args, None).await?;
            Ok(Some(FieldValue::owned_any(connection)))
        })
    });
    if let Some(ref description) = entry.description {
        field = field.description(description);
    }

    connection_arguments(field, entry)
}

/// Build the `Query` root object.
///
/// `extra` fields, keyed by their names, are added after the generated
/// ones; a name that is already taken replaces the generated field.
pub(crate) fn query_object(catalog: &Arc<Catalog>, extra: Vec<(String, Field)>) -> Object {
    let mut fields = vec![("node".to_string(), node_field(catalog))];
    for (index, entry) in catalog.entries.iter().enumerate() {
        fields.push((entry.query_field.clone(), list_field(catalog, index)));
    }

    for (name, field) in extra {
        fields.retain(|(existing, _)| *existing != name);
        fields.push((name, field));
    }

    fields
        .into_iter()
        .fold(Object::new("Query"), |query, (_, field)| query.field(field))
}
