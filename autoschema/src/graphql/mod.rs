//! Dynamic GraphQL schema generated from model metadata
//!
//! Per model this registers:
//! - `{Model}Filter` input and `{Model}NodeSortEnum`
//! - `{Model}Node` object implementing `Node`
//! - `{Model}Connection` / `{Model}Edge`
//! - the `all{Model}` list query
//! - `create/update/delete{Model}` mutations with `{Model}Payload`
//!
//! Types are assembled at startup with async-graphql's dynamic schema, so
//! no Rust type exists per model; resolvers work on [`Record`](crate::sql::Record)s.

mod builder;
mod catalog;
mod connection;
mod mutation;
mod node;
mod query;
mod sort;

pub use builder::{SchemaBuilder, SchemaOptions};
pub use node::{decode_global_id, encode_global_id};

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, Interface, InterfaceField, Object, Scalar, TypeRef,
};

use crate::model::ColumnKind;
use crate::pagination::PageInfo;

pub(crate) const NODE_INTERFACE: &str = "Node";
pub(crate) const PAGE_INFO: &str = "PageInfo";

/// Relay `Node` interface
pub(crate) fn node_interface() -> Interface {
    Interface::new(NODE_INTERFACE)
        .description("An object with an ID")
        .field(
            InterfaceField::new("id", TypeRef::named_nn(TypeRef::ID))
                .description("The ID of the object"),
        )
}

/// Custom scalars used by column kinds that have no built-in GraphQL scalar
pub(crate) fn custom_scalars() -> Vec<Scalar> {
    [
        (ColumnKind::Date, "ISO-8601 date, stored as text"),
        (ColumnKind::DateTime, "ISO-8601 date and time, stored as text"),
        (ColumnKind::Uuid, "UUID in its canonical text form"),
        (ColumnKind::Json, "A JSON document serialized as a string"),
    ]
    .into_iter()
    .map(|(kind, description)| Scalar::new(kind.scalar_name()).description(description))
    .collect()
}

fn page_info_field<F>(name: &str, ty: TypeRef, description: &str, get: F) -> Field
where
    F: Fn(&PageInfo) -> async_graphql::Value + Send + Sync + Copy + 'static,
{
    Field::new(name, ty, move |ctx| {
        FieldFuture::new(async move {
            let page_info = ctx.parent_value.try_downcast_ref::<PageInfo>()?;
            Ok(Some(FieldValue::value(get(page_info))))
        })
    })
    .description(description)
}

/// Relay `PageInfo` object
pub(crate) fn page_info_object() -> Object {
    let cursor = |c: &Option<String>| match c {
        Some(c) => async_graphql::Value::String(c.clone()),
        None => async_graphql::Value::Null,
    };

    Object::new(PAGE_INFO)
        .description("Information about pagination in a connection")
        .field(page_info_field(
            "hasNextPage",
            TypeRef::named_nn(TypeRef::BOOLEAN),
            "When paginating forwards, are there more items?",
            |p| p.has_next_page.into(),
        ))
        .field(page_info_field(
            "hasPreviousPage",
            TypeRef::named_nn(TypeRef::BOOLEAN),
            "When paginating backwards, are there more items?",
            |p| p.has_previous_page.into(),
        ))
        .field(page_info_field(
            "startCursor",
            TypeRef::named(TypeRef::STRING),
            "When paginating backwards, the cursor to continue",
            move |p| cursor(&p.start_cursor),
        ))
        .field(page_info_field(
            "endCursor",
            TypeRef::named(TypeRef::STRING),
            "When paginating forwards, the cursor to continue",
            move |p| cursor(&p.end_cursor),
        ))
}
