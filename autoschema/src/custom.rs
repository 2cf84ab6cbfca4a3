//! Hand-written overrides matched to models by name
//!
//! A filter set named `{Model}Filter` replaces the generated filter for
//! that model. A node override named `{Model}Node` (or `{Model}Schema`)
//! changes the generated object type: its description, hidden fields and
//! extra computed fields. Everything else (the `Node` interface, filterable
//! relation connections, the list query) is still generated.

use std::fmt;
use std::sync::Arc;

use async_graphql::Value;
use async_graphql::dynamic::TypeRef;

use crate::filter::FilterSet;
use crate::naming::{filter_name, node_name, schema_name};
use crate::sql::Record;

/// Computes the value of an extra node field from the fetched row.
pub type ComputeFn = dyn Fn(&Record) -> Result<Value, String> + Send + Sync;

/// An extra field on a node, computed from the row.
#[derive(Clone)]
pub struct ComputedField {
    pub(crate) name: String,
    pub(crate) ty: TypeRef,
    pub(crate) description: Option<String>,
    pub(crate) compute: Arc<ComputeFn>,
}

impl fmt::Debug for ComputedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedField")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

/// Changes applied to the generated node type of one model.
#[derive(Debug, Clone)]
pub struct NodeOverride {
    name: String,
    pub(crate) description: Option<String>,
    pub(crate) exclude: Vec<String>,
    pub(crate) fields: Vec<ComputedField>,
}

impl NodeOverride {
    /// `name` is the GraphQL type name, e.g. `UserNode` or `UserSchema`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            exclude: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Hide a column or relation (by database or GraphQL name)
    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        self.exclude.push(field.into());
        self
    }

    /// Add a field computed from the row
    pub fn field<F>(mut self, name: impl Into<String>, ty: TypeRef, compute: F) -> Self
    where
        F: Fn(&Record) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.fields.push(ComputedField {
            name: name.into(),
            ty,
            description: None,
            compute: Arc::new(compute),
        });
        self
    }

    /// Add a described field computed from the row
    pub fn described_field<F>(
        mut self,
        name: impl Into<String>,
        ty: TypeRef,
        description: impl Into<String>,
        compute: F,
    ) -> Self
    where
        F: Fn(&Record) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.fields.push(ComputedField {
            name: name.into(),
            ty,
            description: Some(description.into()),
            compute: Arc::new(compute),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn hides(&self, column: &str, field: &str) -> bool {
        self.exclude.iter().any(|e| e == column || e == field)
    }
}

/// Custom filters and nodes, looked up by naming convention.
#[derive(Debug, Clone, Default)]
pub struct Customizations {
    filters: Vec<FilterSet>,
    nodes: Vec<NodeOverride>,
}

impl Customizations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: FilterSet) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn node(mut self, node: NodeOverride) -> Self {
        self.nodes.push(node);
        self
    }

    /// The custom filter for a model, if one is named `{Model}Filter`
    pub fn find_filter(&self, model: &str) -> Option<&FilterSet> {
        let name = filter_name(model);
        self.filters.iter().find(|f| f.name() == name)
    }

    /// The custom node for a model, named `{Model}Node` or else `{Model}Schema`
    pub fn find_node(&self, model: &str) -> Option<&NodeOverride> {
        let node = node_name(model);
        let schema = schema_name(model);
        self.nodes
            .iter()
            .find(|n| n.name == node)
            .or_else(|| self.nodes.iter().find(|n| n.name == schema))
    }

    /// Names of customizations that match none of the given models
    pub fn unmatched<'a>(&'a self, models: &[&str]) -> Vec<&'a str> {
        let filters = self
            .filters
            .iter()
            .filter(|f| !models.iter().any(|m| filter_name(m) == f.name()))
            .map(|f| f.name());
        let nodes = self
            .nodes
            .iter()
            .filter(|n| {
                !models
                    .iter()
                    .any(|m| node_name(m) == n.name || schema_name(m) == n.name)
            })
            .map(|n| n.name());
        filters.chain(nodes).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_convention() {
        let custom = Customizations::new()
            .filter(FilterSet::new("UserFilter"))
            .node(NodeOverride::new("UserSchema"))
            .node(NodeOverride::new("PostNode"));

        assert_eq!(custom.find_filter("User").map(|f| f.name()), Some("UserFilter"));
        assert!(custom.find_filter("Post").is_none());
        assert_eq!(custom.find_node("User").map(|n| n.name()), Some("UserSchema"));
        assert_eq!(custom.find_node("Post").map(|n| n.name()), Some("PostNode"));
    }

    #[test]
    fn test_node_name_preferred_over_schema_name() {
        let custom = Customizations::new()
            .node(NodeOverride::new("UserSchema"))
            .node(NodeOverride::new("UserNode"));
        assert_eq!(custom.find_node("User").map(|n| n.name()), Some("UserNode"));
    }

    #[test]
    fn test_unmatched() {
        let custom = Customizations::new()
            .filter(FilterSet::new("UserFilter"))
            .filter(FilterSet::new("GhostFilter"))
            .node(NodeOverride::new("PhantomNode"));

        assert_eq!(custom.unmatched(&["User"]), vec!["GhostFilter", "PhantomNode"]);
    }

    #[test]
    fn test_hides() {
        let node = NodeOverride::new("UserNode").exclude("password_hash");
        assert!(node.hides("password_hash", "passwordHash"));
        assert!(!node.hides("name", "name"));
    }
}
