//! Per-model naming and configuration resolved once at schema build time

use crate::custom::NodeOverride;
use crate::error::{Error, Result};
use crate::filter::CompiledFilter;
use crate::model::{ColumnMeta, ModelMeta};
use crate::naming::{
    connection_name, edge_name, ensure_unique, lower_camel, node_name, query_field_name,
    sort_enum_name, sort_value,
};

/// How a sort enum value orders rows
#[derive(Debug, Clone)]
pub(crate) struct SortKey {
    pub value: String,
    pub column: String,
    pub descending: bool,
}

/// Everything the resolvers of one model need.
#[derive(Debug)]
pub(crate) struct ModelEntry {
    pub meta: ModelMeta,
    pub node: String,
    pub connection: String,
    pub edge: String,
    pub sort_enum: String,
    pub query_field: String,
    pub description: Option<String>,
    pub filter: CompiledFilter,
    pub custom_node: Option<NodeOverride>,
    pub sort_keys: Vec<SortKey>,
    pk: usize,
}

impl ModelEntry {
    pub fn new(
        meta: ModelMeta,
        filter: CompiledFilter,
        custom_node: Option<NodeOverride>,
        description: Option<String>,
    ) -> Result<Self> {
        let pk = meta
            .columns
            .iter()
            .position(|c| c.primary_key)
            .ok_or_else(|| Error::MissingPrimaryKey(meta.name.clone()))?;

        let node = match custom_node {
            Some(ref custom) => custom.name().to_string(),
            None => node_name(&meta.name),
        };
        let connection = connection_name(&node)?;
        let edge = edge_name(&node)?;

        let sort_keys: Vec<SortKey> = meta
            .columns
            .iter()
            .flat_map(|c| {
                [false, true].map(|descending| SortKey {
                    value: sort_value(&c.name, descending),
                    column: c.name.clone(),
                    descending,
                })
            })
            .collect();

        // Column field names are shared by the node and the mutation inputs
        let column_fields: Vec<String> = meta.columns.iter().map(|c| lower_camel(&c.name)).collect();
        ensure_unique(&node, column_fields.iter().map(String::as_str))?;
        let sort_enum = sort_enum_name(&node);
        ensure_unique(&sort_enum, sort_keys.iter().map(|k| k.value.as_str()))?;

        Ok(Self {
            sort_enum,
            query_field: query_field_name(&connection),
            node,
            connection,
            edge,
            description,
            filter,
            custom_node,
            sort_keys,
            pk,
            meta,
        })
    }

    pub fn primary_key(&self) -> &ColumnMeta {
        &self.meta.columns[self.pk]
    }

    /// GraphQL field name of a column. The primary key named `id` would
    /// clash with the global `id`, so it is only exposed as `dbId`.
    pub fn column_field(&self, column: &ColumnMeta) -> Option<String> {
        let field = lower_camel(&column.name);
        if field == "id" {
            return None;
        }
        match self.custom_node {
            Some(ref custom) if custom.hides(&column.name, &field) => None,
            _ => Some(field),
        }
    }

    /// GraphQL field name of a relation, `None` when hidden
    pub fn relation_field(&self, relation: &str) -> Option<String> {
        let field = lower_camel(relation);
        match self.custom_node {
            Some(ref custom) if custom.hides(relation, &field) => None,
            _ => Some(field),
        }
    }

    /// `dbId` is exposed whenever the model has a column named `id`
    pub fn has_db_id(&self) -> bool {
        self.meta.get_column("id").is_some()
            && !matches!(self.custom_node, Some(ref c) if c.hides("id", "dbId"))
    }

    pub fn default_sort(&self) -> String {
        sort_value(&self.primary_key().name, false)
    }

    pub fn sort_key(&self, value: &str) -> Option<&SortKey> {
        self.sort_keys.iter().find(|k| k.value == value)
    }

    /// Names of the fields of the node object, in the order they are added
    pub fn node_fields(&self, catalog: &Catalog) -> Vec<String> {
        let mut fields = vec!["id".to_string()];
        if self.has_db_id() {
            fields.push("dbId".to_string());
        }
        fields.extend(self.meta.columns.iter().filter_map(|c| self.column_field(c)));
        fields.extend(
            self.meta
                .relations
                .iter()
                .filter(|r| catalog.get(&r.target).is_some())
                .filter_map(|r| self.relation_field(&r.name)),
        );
        if let Some(ref custom) = self.custom_node {
            fields.extend(custom.fields.iter().map(|f| f.name.clone()));
        }
        fields
    }
}

/// All exposed models, addressable by model or node name.
#[derive(Debug, Default)]
pub(crate) struct Catalog {
    pub entries: Vec<ModelEntry>,
    pub max_page_size: Option<i64>,
}

impl Catalog {
    pub fn get(&self, model: &str) -> Option<&ModelEntry> {
        self.entries.iter().find(|e| e.meta.name == model)
    }

    pub fn by_node(&self, node: &str) -> Option<&ModelEntry> {
        self.entries.iter().find(|e| e.node == node)
    }

    /// Reject generated types that would end up with two fields of one
    /// name, which async-graphql does not allow.
    pub fn check_fields(&self) -> Result<()> {
        ensure_unique(
            "Query",
            self.entries
                .iter()
                .map(|e| e.query_field.as_str())
                .chain(["node"]),
        )?;
        for entry in &self.entries {
            let fields = entry.node_fields(self);
            ensure_unique(&entry.node, fields.iter().map(String::as_str))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterSet;
    use crate::model::ColumnKind;

    fn meta() -> ModelMeta {
        ModelMeta::new("UserRole", "user_roles")
            .column(ColumnMeta::new("id", ColumnKind::Integer).primary_key(true))
            .column(ColumnMeta::new("role_name", ColumnKind::Text))
            .column(ColumnMeta::new("secret", ColumnKind::Text))
    }

    fn entry(custom: Option<NodeOverride>) -> ModelEntry {
        let meta = meta();
        let filter = FilterSet::for_model(&meta).compile_for(&meta).unwrap();
        ModelEntry::new(meta, filter, custom, None).unwrap()
    }

    #[test]
    fn test_names() {
        let entry = entry(None);
        assert_eq!(entry.node, "UserRoleNode");
        assert_eq!(entry.connection, "UserRoleConnection");
        assert_eq!(entry.edge, "UserRoleEdge");
        assert_eq!(entry.sort_enum, "UserRoleNodeSortEnum");
        assert_eq!(entry.query_field, "allUserRole");
        assert_eq!(entry.default_sort(), "ID_ASC");
        assert!(entry.sort_key("ROLE_NAME_DESC").unwrap().descending);
    }

    #[test]
    fn test_custom_schema_name() {
        let entry = entry(Some(NodeOverride::new("UserRoleSchema").exclude("secret")));
        assert_eq!(entry.node, "UserRoleSchema");
        assert_eq!(entry.connection, "UserRoleConnection");

        let secret = entry.meta.get_column("secret").unwrap().clone();
        assert_eq!(entry.column_field(&secret), None);
        let id = entry.meta.get_column("id").unwrap().clone();
        assert_eq!(entry.column_field(&id), None);
        assert!(entry.has_db_id());
    }

    #[test]
    fn test_missing_primary_key() {
        let meta = ModelMeta::new("Log", "logs").column(ColumnMeta::new("line", ColumnKind::Text));
        let filter = FilterSet::for_model(&meta).compile_for(&meta).unwrap();
        assert!(matches!(
            ModelEntry::new(meta, filter, None, None),
            Err(Error::MissingPrimaryKey(_))
        ));
    }

    fn catalog(entry: ModelEntry) -> Catalog {
        Catalog {
            entries: vec![entry],
            max_page_size: None,
        }
    }

    #[test]
    fn test_node_fields() {
        let catalog = catalog(entry(None));
        assert_eq!(
            catalog.entries[0].node_fields(&catalog),
            vec!["id", "dbId", "roleName", "secret"]
        );
        assert!(catalog.check_fields().is_ok());
    }

    #[test]
    fn test_db_id_column_clashes_with_generated_db_id() {
        let meta = meta().column(ColumnMeta::new("db_id", ColumnKind::Text));
        let filter = FilterSet::for_model(&meta).compile_for(&meta).unwrap();
        let catalog = catalog(ModelEntry::new(meta, filter, None, None).unwrap());

        assert!(matches!(
            catalog.check_fields(),
            Err(Error::DuplicateField { ref type_name, ref field })
                if type_name == "UserRoleNode" && field == "dbId"
        ));
    }

    #[test]
    fn test_computed_field_clashes_with_column() {
        let custom = NodeOverride::new("UserRoleNode").field(
            "roleName",
            async_graphql::dynamic::TypeRef::named(async_graphql::dynamic::TypeRef::STRING),
            |_| Ok(async_graphql::Value::Null),
        );
        let catalog = catalog(entry(Some(custom)));

        assert!(matches!(
            catalog.check_fields(),
            Err(Error::DuplicateField { ref field, .. }) if field == "roleName"
        ));

        // Hiding the column frees the name
        let custom = NodeOverride::new("UserRoleNode").exclude("role_name").field(
            "roleName",
            async_graphql::dynamic::TypeRef::named(async_graphql::dynamic::TypeRef::STRING),
            |_| Ok(async_graphql::Value::Null),
        );
        assert!(self::catalog(entry(Some(custom))).check_fields().is_ok());
    }

    #[test]
    fn test_columns_with_the_same_field_name() {
        let meta = meta().column(ColumnMeta::new("roleName", ColumnKind::Text));
        let filter = FilterSet::new("UserRoleFilter").compile_for(&meta).unwrap();
        assert!(matches!(
            ModelEntry::new(meta, filter, None, None),
            Err(Error::DuplicateField { ref field, .. }) if field == "roleName"
        ));
    }
}
