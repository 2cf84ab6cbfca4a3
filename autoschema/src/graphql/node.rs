//! Node object types and Relay global ids

use std::sync::Arc;

use async_graphql::dynamic::{Field, FieldFuture, FieldValue, Object, TypeRef};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{ColumnMeta, RelationKind, RelationMeta, quote_ident};
use crate::sql::{Condition, Record, Select, SqlValue};

use super::NODE_INTERFACE;
use super::catalog::Catalog;
use super::connection::{connection_arguments, resolve_connection};

/// Global id of an object: base64 of `{TypeName}:{key}`
pub fn encode_global_id(type_name: &str, key: &str) -> String {
    BASE64.encode(format!("{}:{}", type_name, key))
}

/// Split a global id into its type name and key
pub fn decode_global_id(id: &str) -> Result<(String, String)> {
    let invalid = || Error::InvalidGlobalId(id.to_string());

    let decoded = BASE64.decode(id).map_err(|_| invalid())?;
    let decoded = String::from_utf8(decoded).map_err(|_| invalid())?;
    let (type_name, key) = decoded.split_once(':').ok_or_else(invalid)?;

    if type_name.is_empty() || key.is_empty() {
        return Err(invalid());
    }
    Ok((type_name.to_string(), key.to_string()))
}

fn column_type(column: &ColumnMeta) -> TypeRef {
    if column.nullable {
        TypeRef::named(column.kind.scalar_name())
    } else {
        TypeRef::named_nn(column.kind.scalar_name())
    }
}

fn column_field(name: &str, column: &ColumnMeta) -> Field {
    let column_name = column.name.clone();

    let mut field = Field::new(name, column_type(column), move |ctx| {
        let column_name = column_name.clone();
        FieldFuture::new(async move {
            let record = ctx.parent_value.try_downcast_ref::<Record>()?;
            Ok(Some(FieldValue::value(record.get(&column_name).clone())))
        })
    });
    if let Some(ref comment) = column.comment {
        field = field.description(comment);
    }
    field
}

fn has_many_field(name: &str, catalog: &Arc<Catalog>, target: usize, relation: &RelationMeta) -> Field {
    let entry = &catalog.entries[target];
    let resolver_catalog = catalog.clone();
    let from = relation.from.clone();
    let to = relation.to.clone();

    let field = Field::new(name, TypeRef::named_nn(&entry.connection), move |ctx| {
        let catalog = resolver_catalog.clone();
        let from = from.clone();
        let to = to.clone();
        FieldFuture::new(async move {
            let record = ctx.parent_value.try_downcast_ref::<Record>()?;
            let pool = ctx.data::<SqlitePool>()?;
            let scope = Condition::new(
                format!("{} = ?", quote_ident(&to)),
                vec![record.sql_value(&from)],
            );

            let connection = resolve_connection(
                pool,
                &catalog,
                &catalog.entries[target],
                &ctx.args,
                Some(scope),
            )
            .await?;
            Ok(Some(FieldValue::owned_any(connection)))
        })
    });

    connection_arguments(field, entry)
}

fn belongs_to_field(name: &str, catalog: &Arc<Catalog>, target: usize, relation: &RelationMeta) -> Field {
    let entry = &catalog.entries[target];
    let resolver_catalog = catalog.clone();
    let from = relation.from.clone();
    let to = relation.to.clone();

    Field::new(name, TypeRef::named(&entry.node), move |ctx| {
        let catalog = resolver_catalog.clone();
        let from = from.clone();
        let to = to.clone();
        FieldFuture::new(async move {
            let record = ctx.parent_value.try_downcast_ref::<Record>()?;
            let key = record.sql_value(&from);
            if key == SqlValue::Null {
                return Ok(None);
            }

            let pool = ctx.data::<SqlitePool>()?;
            let target = Select::new(&catalog.entries[target].meta)
                .where_eq(&to, key)
                .fetch_optional(pool)
                .await?;
            Ok(target.map(FieldValue::owned_any))
        })
    })
}

/// Build the `{Model}Node` object of the entry at `index`.
pub(crate) fn node_object(catalog: &Arc<Catalog>, index: usize) -> Object {
    let entry = &catalog.entries[index];
    let mut object = Object::new(&entry.node).implement(NODE_INTERFACE);
    if let Some(ref description) = entry.description {
        object = object.description(description);
    }

    let id_catalog = catalog.clone();
    object = object.field(
        Field::new("id", TypeRef::named_nn(TypeRef::ID), move |ctx| {
            let catalog = id_catalog.clone();
            FieldFuture::new(async move {
                let entry = &catalog.entries[index];
                let record = ctx.parent_value.try_downcast_ref::<Record>()?;
                let key = record
                    .key_string(&entry.meta)
                    .ok_or_else(|| Error::MissingPrimaryKey(entry.meta.name.clone()))?;
                Ok(Some(FieldValue::value(encode_global_id(&entry.node, &key))))
            })
        })
        .description("The ID of the object"),
    );

    if entry.has_db_id() {
        if let Some(column) = entry.meta.get_column("id") {
            object = object.field(
                column_field("dbId", column).description("Primary key of the row in the database"),
            );
        }
    }

    for column in &entry.meta.columns {
        if let Some(name) = entry.column_field(column) {
            object = object.field(column_field(&name, column));
        }
    }

    for relation in &entry.meta.relations {
        let Some(name) = entry.relation_field(&relation.name) else {
            continue;
        };
        let Some(target) = catalog
            .entries
            .iter()
            .position(|e| e.meta.name == relation.target)
        else {
            debug!(model = %entry.meta.name, relation = %relation.name, target = %relation.target, "Skipping relation to excluded model");
            continue;
        };

        object = object.field(match relation.kind {
            RelationKind::HasMany => has_many_field(&name, catalog, target, relation),
            RelationKind::BelongsTo => belongs_to_field(&name, catalog, target, relation),
        });
    }

    if let Some(ref custom) = entry.custom_node {
        for computed in &custom.fields {
            let compute = computed.compute.clone();
            let mut field = Field::new(&computed.name, computed.ty.clone(), move |ctx| {
                let compute = compute.clone();
                FieldFuture::new(async move {
                    let record = ctx.parent_value.try_downcast_ref::<Record>()?;
                    let value = compute(record).map_err(async_graphql::Error::new)?;
                    Ok(Some(FieldValue::value(value)))
                })
            });
            if let Some(ref description) = computed.description {
                field = field.description(description);
            }
            object = object.field(field);
        }
    }

    object
}
