//! Assemble the dynamic schema from a model registry

use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::dynamic::{Field, Schema, Type};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::custom::Customizations;
use crate::description::table_description;
use crate::error::{Error, Result};
use crate::filter::{FilterSet, range_input};
use crate::model::{ModelMeta, ModelRegistry};

use super::catalog::{Catalog, ModelEntry};
use super::connection::{connection_object, edge_object};
use super::mutation::{create_input, mutation_object, payload_object, update_input};
use super::node::node_object;
use super::query::query_object;
use super::sort::sort_enum;
use super::{custom_scalars, node_interface, page_info_object};

fn default_max_page_size() -> Option<i64> {
    Some(100)
}

fn default_true() -> bool {
    true
}

/// Options controlling which models are exposed and how.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchemaOptions {
    /// Model names left out of the schema entirely
    pub exclude_models: Vec<String>,
    /// Read table comments from the database as node descriptions
    pub table_descriptions_from_db: bool,
    /// Node descriptions by model name
    pub table_descriptions: HashMap<String, String>,
    /// Default and maximum page size of connections; `None` is unbounded
    #[serde(default = "default_max_page_size")]
    pub max_page_size: Option<i64>,
    #[serde(default = "default_true")]
    pub enable_mutations: bool,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            exclude_models: Vec::new(),
            table_descriptions_from_db: false,
            table_descriptions: HashMap::new(),
            max_page_size: default_max_page_size(),
            enable_mutations: true,
        }
    }
}

/// Builds a GraphQL schema with queries (and mutations) for every
/// registered model.
///
/// ```ignore
/// let schema = SchemaBuilder::new(registry)
///     .options(SchemaOptions { exclude_models: vec!["AuditLog".into()], ..Default::default() })
///     .customizations(Customizations::new().node(NodeOverride::new("UserNode").exclude("password_hash")))
///     .build(&pool)
///     .await?;
/// ```
pub struct SchemaBuilder {
    registry: ModelRegistry,
    options: SchemaOptions,
    customizations: Customizations,
    query_fields: Vec<(String, Field)>,
    types: Vec<Type>,
}

impl SchemaBuilder {
    pub fn new(registry: ModelRegistry) -> Self {
        Self {
            registry,
            options: SchemaOptions::default(),
            customizations: Customizations::default(),
            query_fields: Vec::new(),
            types: Vec::new(),
        }
    }

    pub fn options(mut self, options: SchemaOptions) -> Self {
        self.options = options;
        self
    }

    pub fn customizations(mut self, customizations: Customizations) -> Self {
        self.customizations = customizations;
        self
    }

    /// Add a root query field. `name` must be the field's name; it replaces
    /// a generated field of the same name.
    pub fn query_field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.query_fields.push((name.into(), field));
        self
    }

    /// Register an extra type used by custom fields or filters
    pub fn register(mut self, ty: impl Into<Type>) -> Self {
        self.types.push(ty.into());
        self
    }

    /// Models that end up in the schema, in registration order
    fn exposed_models(&self) -> Vec<&ModelMeta> {
        for excluded in &self.options.exclude_models {
            if self.registry.get(excluded).is_none() {
                warn!(model = %excluded, "Excluded model is not registered");
            }
        }

        self.registry
            .models()
            .iter()
            .filter(|m| !self.options.exclude_models.contains(&m.name))
            .collect()
    }

    fn check_relations(&self, meta: &ModelMeta) -> Result<()> {
        for relation in &meta.relations {
            let target = self
                .registry
                .get(&relation.target)
                .ok_or_else(|| Error::UnknownModel(relation.target.clone()))?;

            // `from` is always on this model, `to` on the target
            if meta.get_column(&relation.from).is_none() {
                return Err(Error::InvalidArgument(format!(
                    "relation `{}.{}` uses unknown column `{}`",
                    meta.name, relation.name, relation.from
                )));
            }
            if target.get_column(&relation.to).is_none() {
                return Err(Error::InvalidArgument(format!(
                    "relation `{}.{}` targets unknown column `{}.{}`",
                    meta.name, relation.name, target.name, relation.to
                )));
            }
        }
        Ok(())
    }

    /// Description precedence: custom node, explicit option, database
    /// comment (when enabled), model comment.
    async fn description(&self, pool: &SqlitePool, meta: &ModelMeta) -> Option<String> {
        if let Some(description) = self
            .customizations
            .find_node(&meta.name)
            .and_then(|n| n.description.clone())
        {
            return Some(description);
        }
        if let Some(description) = self.options.table_descriptions.get(&meta.name) {
            return Some(description.clone());
        }
        if self.options.table_descriptions_from_db {
            if let Some(description) = table_description(pool, meta).await {
                return Some(description);
            }
        }
        meta.comment.clone()
    }

    async fn catalog(&self, pool: &SqlitePool) -> Result<Catalog> {
        let models = self.exposed_models();

        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        for unmatched in self.customizations.unmatched(&names) {
            warn!(name = %unmatched, "Customization matches no exposed model");
        }

        let mut entries = Vec::with_capacity(models.len());
        for meta in models {
            self.check_relations(meta)?;

            let filter = match self.customizations.find_filter(&meta.name) {
                Some(custom) => {
                    debug!(model = %meta.name, filter = %custom.name(), "Using custom filter");
                    custom.compile_for(meta)?
                }
                None => FilterSet::for_model(meta).compile_for(meta)?,
            };
            let custom_node = self.customizations.find_node(&meta.name).cloned();
            if let Some(ref node) = custom_node {
                debug!(model = %meta.name, node = %node.name(), "Using custom node");
            }
            let description = self.description(pool, meta).await;

            entries.push(ModelEntry::new(meta.clone(), filter, custom_node, description)?);
        }

        let catalog = Catalog {
            entries,
            max_page_size: self.options.max_page_size,
        };
        catalog.check_fields()?;
        Ok(catalog)
    }

    /// Build the schema; `pool` is attached as schema data for resolvers.
    pub async fn build(self, pool: &SqlitePool) -> Result<Schema> {
        let catalog = Arc::new(self.catalog(pool).await?);
        let enable_mutations = self.options.enable_mutations && !catalog.entries.is_empty();

        let mut builder = Schema::build(
            "Query",
            enable_mutations.then_some("Mutation"),
            None,
        )
        .register(node_interface())
        .register(page_info_object());

        for scalar in custom_scalars() {
            builder = builder.register(scalar);
        }

        let mut range_kinds = Vec::new();
        for kind in catalog.entries.iter().flat_map(|e| e.filter.range_kinds()) {
            if !range_kinds.contains(&kind) {
                range_kinds.push(kind);
                builder = builder.register(range_input(kind));
            }
        }

        for entry in &catalog.entries {
            builder = builder
                .register(entry.filter.input_object())
                .register(sort_enum(entry));
        }
        for index in 0..catalog.entries.len() {
            builder = builder.register(node_object(&catalog, index));
        }
        for entry in &catalog.entries {
            builder = builder
                .register(edge_object(entry))
                .register(connection_object(entry));
            if enable_mutations {
                builder = builder
                    .register(create_input(entry))
                    .register(update_input(entry))
                    .register(payload_object(entry));
            }
        }

        builder = builder.register(query_object(&catalog, self.query_fields));
        if enable_mutations {
            builder = builder.register(mutation_object(&catalog));
        }
        for ty in self.types {
            builder = builder.register(ty);
        }

        info!(
            models = catalog.entries.len(),
            mutations = enable_mutations,
            "Built GraphQL schema"
        );

        Ok(builder.data(pool.clone()).finish()?)
    }
}
