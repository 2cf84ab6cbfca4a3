//! Relay connections over model tables

use async_graphql::Value;
use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, Object, ObjectAccessor, TypeRef};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{Error, Result};
use crate::pagination::{ConnectionArgs, PageInfo, encode_cursor};
use crate::sql::{Condition, Record, Select};

use super::PAGE_INFO;
use super::catalog::{Catalog, ModelEntry};
use super::sort::{parse_sort, sort_argument};

/// A resolved page of a connection
#[derive(Debug, Clone)]
pub(crate) struct ConnectionValue {
    pub edges: Vec<EdgeValue>,
    pub page_info: PageInfo,
    pub total_count: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct EdgeValue {
    pub cursor: String,
    pub node: Record,
}

/// Add the `filters`, `sort` and pagination arguments to a connection field
pub(crate) fn connection_arguments(field: Field, entry: &ModelEntry) -> Field {
    field
        .argument(InputValue::new("filters", TypeRef::named(entry.filter.name())))
        .argument(sort_argument(entry))
        .argument(
            InputValue::new("before", TypeRef::named(TypeRef::STRING))
                .description("Returns the items in the list that come before the specified cursor"),
        )
        .argument(
            InputValue::new("after", TypeRef::named(TypeRef::STRING))
                .description("Returns the items in the list that come after the specified cursor"),
        )
        .argument(
            InputValue::new("first", TypeRef::named(TypeRef::INT))
                .description("Returns the first n items from the list"),
        )
        .argument(
            InputValue::new("last", TypeRef::named(TypeRef::INT))
                .description("Returns the last n items from the list"),
        )
}

fn optional_i64(args: &ObjectAccessor<'_>, name: &str) -> Result<Option<i64>> {
    match args.get(name).map(|v| v.as_value().clone()) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| Error::InvalidArgument(format!("`{}` must be an integer", name))),
        Some(other) => Err(Error::InvalidArgument(format!(
            "`{}` must be an integer, found {}",
            name, other
        ))),
    }
}

fn optional_string(args: &ObjectAccessor<'_>, name: &str) -> Option<String> {
    match args.get(name).map(|v| v.as_value().clone()) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

impl ConnectionArgs {
    fn from_accessor(args: &ObjectAccessor<'_>) -> Result<Self> {
        Ok(Self {
            first: optional_i64(args, "first")?,
            last: optional_i64(args, "last")?,
            before: optional_string(args, "before"),
            after: optional_string(args, "after"),
        })
    }
}

/// Resolve one page of a model's rows.
///
/// `scope` restricts the rows before filtering, e.g. to the children of a
/// parent row for a has-many relation.
pub(crate) async fn resolve_connection(
    pool: &SqlitePool,
    catalog: &Catalog,
    entry: &ModelEntry,
    args: &ObjectAccessor<'_>,
    scope: Option<Condition>,
) -> Result<ConnectionValue> {
    let filter = match args.get("filters") {
        Some(filters) => entry.filter.compile(filters.as_value())?,
        None => None,
    };
    let sort = parse_sort(entry, args.get("sort").map(|v| v.as_value()))?;
    let connection_args = ConnectionArgs::from_accessor(args)?;

    let select = Select::new(&entry.meta).filter(scope).filter(filter);
    let total_count = select.count(pool).await?;
    let window = connection_args.window(total_count, catalog.max_page_size)?;

    debug!(
        model = %entry.meta.name,
        total = total_count,
        offset = window.offset,
        limit = window.limit,
        "Resolving connection"
    );

    let records = if window.limit > 0 {
        let mut select = select;
        for key in sort {
            select = select.order_by(&key.column, key.descending);
        }
        select
            .limit(window.limit)
            .offset(window.offset)
            .fetch_all(pool)
            .await?
    } else {
        Vec::new()
    };

    let edges: Vec<EdgeValue> = records
        .into_iter()
        .enumerate()
        .map(|(i, node)| EdgeValue {
            cursor: encode_cursor(window.offset + i as i64),
            node,
        })
        .collect();

    let page_info = PageInfo {
        has_next_page: window.has_next_page,
        has_previous_page: window.has_previous_page,
        start_cursor: edges.first().map(|e| e.cursor.clone()),
        end_cursor: edges.last().map(|e| e.cursor.clone()),
    };

    Ok(ConnectionValue {
        edges,
        page_info,
        total_count,
    })
}

/// `{Model}Edge` object
pub(crate) fn edge_object(entry: &ModelEntry) -> Object {
    Object::new(&entry.edge)
        .description(format!("A `{}` and its cursor", entry.node))
        .field(
            Field::new("node", TypeRef::named_nn(&entry.node), |ctx| {
                FieldFuture::new(async move {
                    let edge = ctx.parent_value.try_downcast_ref::<EdgeValue>()?;
                    Ok(Some(FieldValue::borrowed_any(&edge.node)))
                })
            })
            .description("The item at the end of the edge"),
        )
        .field(
            Field::new("cursor", TypeRef::named_nn(TypeRef::STRING), |ctx| {
                FieldFuture::new(async move {
                    let edge = ctx.parent_value.try_downcast_ref::<EdgeValue>()?;
                    Ok(Some(FieldValue::value(edge.cursor.clone())))
                })
            })
            .description("A cursor for use in pagination"),
        )
}

/// `{Model}Connection` object
pub(crate) fn connection_object(entry: &ModelEntry) -> Object {
    Object::new(&entry.connection)
        .description(format!("A page of `{}` items", entry.node))
        .field(
            Field::new("edges", TypeRef::named_nn_list_nn(&entry.edge), |ctx| {
                FieldFuture::new(async move {
                    let connection = ctx.parent_value.try_downcast_ref::<ConnectionValue>()?;
                    Ok(Some(FieldValue::list(
                        connection.edges.iter().map(|e| FieldValue::borrowed_any(e)),
                    )))
                })
            })
            .description("Contains the nodes in this connection"),
        )
        .field(
            Field::new("pageInfo", TypeRef::named_nn(PAGE_INFO), |ctx| {
                FieldFuture::new(async move {
                    let connection = ctx.parent_value.try_downcast_ref::<ConnectionValue>()?;
                    Ok(Some(FieldValue::borrowed_any(&connection.page_info)))
                })
            })
            .description("Pagination data for this connection"),
        )
        .field(
            Field::new("totalCount", TypeRef::named_nn(TypeRef::INT), |ctx| {
                FieldFuture::new(async move {
                    let connection = ctx.parent_value.try_downcast_ref::<ConnectionValue>()?;
                    Ok(Some(FieldValue::value(connection.total_count)))
                })
            })
            .description("Number of items matching the filters, ignoring pagination"),
        )
}
