//! Autoschema - a Relay-style GraphQL API generated from relational models
//!
//! Describe tables with `#[derive(Model)]`, by hand with [`ModelMeta`], or
//! reflect them from an existing SQLite database, then hand the registry to
//! [`SchemaBuilder`]:
//!
//! ```ignore
//! #[derive(Model)]
//! #[model(table = "authors")]
//! struct Author {
//!     id: i64,
//!     name: String,
//!     #[relation(target = "Book")]
//!     books: Vec<Book>,
//! }
//!
//! let mut registry = ModelRegistry::new();
//! registry.register::<Author>()?.register::<Book>()?;
//! let schema = SchemaBuilder::new(registry).build(&pool).await?;
//! ```
//!
//! Every model gets a filterable, sortable `all{Model}` connection, a
//! `{Model}Node` implementing `Node`, and create/update/delete mutations.

pub mod custom;
pub mod description;
pub mod error;
pub mod filter;
pub mod graphql;
pub mod model;
pub mod naming;
pub mod pagination;
pub mod sql;
pub mod sync;

pub use autoschema_macros::Model;
pub use custom::{ComputedField, Customizations, NodeOverride};
pub use error::{Error, Result};
pub use filter::{CustomFilter, FilterOp, FilterSet};
pub use graphql::{SchemaBuilder, SchemaOptions, decode_global_id, encode_global_id};
pub use model::{ColumnKind, ColumnMeta, Model, ModelMeta, ModelRegistry, RelationKind, RelationMeta};
pub use sql::{Condition, Record, SqlValue};
pub use sync::{SchemaSyncResult, sync_models};

/// Re-exported so custom fields and filters can name GraphQL types
pub use async_graphql;
