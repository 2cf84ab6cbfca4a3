//! Mutation root: create, update and delete per model
//!
//! Every mutation returns a `{Model}Payload { success, error, node }`.
//! Failures (bad input, unknown ids, constraint violations) are reported in
//! `error` so clients get a uniform result shape.

use std::sync::Arc;

use async_graphql::Value;
use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputObject, InputValue, Object, ObjectAccessor, TypeRef,
};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::model::ColumnMeta;
use crate::naming::{
    create_input_name, create_mutation_name, delete_mutation_name, lower_camel, payload_name,
    update_input_name, update_mutation_name,
};
use crate::sql::{
    Condition, Record, Select, SqlValue, delete_by_pk, insert, parse_key, to_sql_value,
    update_by_pk,
};

use super::catalog::{Catalog, ModelEntry};
use super::node::decode_global_id;

/// Result of a mutation
#[derive(Debug, Clone)]
pub(crate) struct PayloadValue {
    pub success: bool,
    pub error: Option<String>,
    pub node: Option<Record>,
}

impl PayloadValue {
    pub fn success(node: Record) -> Self {
        Self {
            success: true,
            error: None,
            node: Some(node),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
            node: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// Columns accepted by the create input: all but an auto-assigned key
fn create_columns(entry: &ModelEntry) -> impl Iterator<Item = &ColumnMeta> {
    entry.meta.columns.iter().filter(|c| !c.is_auto_increment())
}

/// Columns accepted by the update input: all but the primary key
fn update_columns(entry: &ModelEntry) -> impl Iterator<Item = &ColumnMeta> {
    entry.meta.columns.iter().filter(|c| !c.primary_key)
}

pub(crate) fn create_input(entry: &ModelEntry) -> InputObject {
    let mut input = InputObject::new(create_input_name(&entry.meta.name))
        .description(format!("Fields of a new `{}`", entry.node));
    for column in create_columns(entry) {
        let scalar = column.kind.scalar_name();
        let ty = if column.nullable || column.default.is_some() {
            TypeRef::named(scalar)
        } else {
            TypeRef::named_nn(scalar)
        };
        input = input.field(input_field(column, ty));
    }
    input
}

pub(crate) fn update_input(entry: &ModelEntry) -> InputObject {
    let mut input = InputObject::new(update_input_name(&entry.meta.name))
        .description(format!("Fields to change on a `{}`; omitted fields are kept", entry.node));
    for column in update_columns(entry) {
        input = input.field(input_field(column, TypeRef::named(column.kind.scalar_name())));
    }
    input
}

fn input_field(column: &ColumnMeta, ty: TypeRef) -> InputValue {
    let field = InputValue::new(lower_camel(&column.name), ty);
    match column.comment {
        Some(ref comment) => field.description(comment),
        None => field,
    }
}

pub(crate) fn payload_object(entry: &ModelEntry) -> Object {
    Object::new(payload_name(&entry.meta.name))
        .description(format!("Result of a `{}` mutation", entry.node))
        .field(Field::new("success", TypeRef::named_nn(TypeRef::BOOLEAN), |ctx| {
            FieldFuture::new(async move {
                let payload = ctx.parent_value.try_downcast_ref::<PayloadValue>()?;
                Ok(Some(FieldValue::value(payload.success)))
            })
        }))
        .field(Field::new("error", TypeRef::named(TypeRef::STRING), |ctx| {
            FieldFuture::new(async move {
                let payload = ctx.parent_value.try_downcast_ref::<PayloadValue>()?;
                Ok(payload.error.clone().map(FieldValue::value))
            })
        }))
        .field(Field::new("node", TypeRef::named(&entry.node), |ctx| {
            FieldFuture::new(async move {
                let payload = ctx.parent_value.try_downcast_ref::<PayloadValue>()?;
                Ok(payload.node.as_ref().map(|node| FieldValue::borrowed_any(node)))
            })
        }))
}

/// Map input object fields to column bind values
fn input_values<'e>(
    columns: impl Iterator<Item = &'e ColumnMeta>,
    input: &Value,
) -> Result<Vec<(String, SqlValue)>> {
    let fields = match input {
        Value::Object(fields) => fields,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(Error::InvalidArgument(format!(
                "`input` expects an object, found {}",
                other
            )));
        }
    };

    let columns: Vec<&ColumnMeta> = columns.collect();
    let mut values = Vec::with_capacity(fields.len());

    for (name, value) in fields {
        let column = columns
            .iter()
            .find(|c| lower_camel(&c.name) == name.as_str())
            .ok_or_else(|| Error::InvalidArgument(format!("unknown input field `{}`", name)))?;
        let value = to_sql_value(column.kind, value)
            .map_err(|e| Error::InvalidArgument(format!("{}: {}", name, e)))?;
        values.push((column.name.clone(), value));
    }

    Ok(values)
}

/// Resolve a global id argument to a primary key of this entry's model
fn key_for(entry: &ModelEntry, id: &str) -> Result<SqlValue> {
    let (type_name, key) = decode_global_id(id)?;
    if type_name != entry.node {
        return Err(Error::InvalidGlobalId(format!(
            "{} is a {}, expected {}",
            id, type_name, entry.node
        )));
    }
    parse_key(entry.primary_key().kind, &key).ok_or_else(|| Error::InvalidGlobalId(id.to_string()))
}

async fn fetch_by_key(pool: &SqlitePool, entry: &ModelEntry, key: SqlValue) -> Result<Option<Record>> {
    Select::new(&entry.meta)
        .where_eq(&entry.primary_key().name, key)
        .fetch_optional(pool)
        .await
}

async fn create(pool: &SqlitePool, entry: &ModelEntry, args: &ObjectAccessor<'_>) -> Result<Record> {
    let input = args
        .get("input")
        .map(|v| v.as_value().clone())
        .unwrap_or(Value::Null);
    let values = input_values(create_columns(entry), &input)?;
    let rowid = insert(pool, &entry.meta, &values).await?;

    let pk = &entry.primary_key().name;
    let created = match values.iter().find(|(column, _)| column == pk) {
        Some((_, key)) => fetch_by_key(pool, entry, key.clone()).await?,
        None => {
            Select::new(&entry.meta)
                .filter(Some(Condition::new("rowid = ?", vec![SqlValue::Int(rowid)])))
                .fetch_optional(pool)
                .await?
        }
    };

    created.ok_or_else(|| Error::NotFound(format!("{} with rowid {}", entry.node, rowid)))
}

async fn update(pool: &SqlitePool, entry: &ModelEntry, args: &ObjectAccessor<'_>) -> Result<Record> {
    let id = required_id(args)?;
    let key = key_for(entry, &id)?;

    let input = args
        .get("input")
        .map(|v| v.as_value().clone())
        .unwrap_or(Value::Null);
    let values = input_values(update_columns(entry), &input)?;
    if values.is_empty() {
        return Err(Error::InvalidArgument("no fields to update".to_string()));
    }

    let pk = &entry.primary_key().name;
    let changed = update_by_pk(pool, &entry.meta, pk, key.clone(), &values).await?;
    if changed == 0 {
        return Err(Error::NotFound(id));
    }

    fetch_by_key(pool, entry, key)
        .await?
        .ok_or_else(|| Error::NotFound(id))
}

async fn delete(pool: &SqlitePool, entry: &ModelEntry, args: &ObjectAccessor<'_>) -> Result<Record> {
    let id = required_id(args)?;
    let key = key_for(entry, &id)?;

    let record = fetch_by_key(pool, entry, key.clone())
        .await?
        .ok_or_else(|| Error::NotFound(id.clone()))?;
    delete_by_pk(pool, &entry.meta, &entry.primary_key().name, key).await?;
    Ok(record)
}

fn required_id(args: &ObjectAccessor<'_>) -> Result<String> {
    match args.get("id").map(|v| v.as_value().clone()) {
        Some(Value::String(id)) => Ok(id),
        _ => Err(Error::InvalidArgument("`id` is required".to_string())),
    }
}

fn mutation_field(catalog: &Arc<Catalog>, index: usize, action: Action) -> Field {
    let entry = &catalog.entries[index];
    let name = match action {
        Action::Create => create_mutation_name(&entry.meta.name),
        Action::Update => update_mutation_name(&entry.meta.name),
        Action::Delete => delete_mutation_name(&entry.meta.name),
    };
    let resolver_catalog = catalog.clone();

    let field = Field::new(name, TypeRef::named_nn(payload_name(&entry.meta.name)), move |ctx| {
        let catalog = resolver_catalog.clone();
        FieldFuture::new(async move {
            let pool = ctx.data::<SqlitePool>()?;
            let entry = &catalog.entries[index];

            let result = match action {
                Action::Create => create(pool, entry, &ctx.args).await,
                Action::Update => update(pool, entry, &ctx.args).await,
                Action::Delete => delete(pool, entry, &ctx.args).await,
            };

            let payload = match result {
                Ok(record) => {
                    info!(model = %entry.meta.name, action = action.as_str(), "Mutation succeeded");
                    PayloadValue::success(record)
                }
                Err(e) => {
                    warn!(model = %entry.meta.name, action = action.as_str(), error = %e, "Mutation failed");
                    PayloadValue::error(e.to_string())
                }
            };
            Ok(Some(FieldValue::owned_any(payload)))
        })
    });

    let id = InputValue::new("id", TypeRef::named_nn(TypeRef::ID));
    match action {
        Action::Create => field
            .argument(InputValue::new("input", TypeRef::named_nn(create_input_name(&entry.meta.name))))
            .description(format!("Create a `{}`", entry.node)),
        Action::Update => field
            .argument(id)
            .argument(InputValue::new("input", TypeRef::named_nn(update_input_name(&entry.meta.name))))
            .description(format!("Update a `{}`", entry.node)),
        Action::Delete => field
            .argument(id)
            .description(format!("Delete a `{}`, returning it", entry.node)),
    }
}

/// Build the `Mutation` root object
pub(crate) fn mutation_object(catalog: &Arc<Catalog>) -> Object {
    let mut mutation = Object::new("Mutation");
    for index in 0..catalog.entries.len() {
        for action in [Action::Create, Action::Update, Action::Delete] {
            mutation = mutation.field(mutation_field(catalog, index, action));
        }
    }
    mutation
}
