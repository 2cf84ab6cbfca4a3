//! Model metadata
//!
//! A [`ModelMeta`] describes one table: its columns, primary key and the
//! relations to other models. Everything the schema builder generates is
//! derived from these descriptions, whether they come from
//! `#[derive(Model)]`, are written by hand, or are reflected from an
//! existing database (see [`ModelRegistry::reflect`]).

mod reflect;
mod registry;

pub use registry::ModelRegistry;

use async_graphql::dynamic::TypeRef;

/// Storage/GraphQL kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Text,
    Date,
    DateTime,
    Uuid,
    Json,
}

impl ColumnKind {
    /// Name of the GraphQL scalar this kind is exposed as
    pub fn scalar_name(&self) -> &'static str {
        match self {
            ColumnKind::Integer => TypeRef::INT,
            ColumnKind::Float => TypeRef::FLOAT,
            ColumnKind::Boolean => TypeRef::BOOLEAN,
            ColumnKind::Text => TypeRef::STRING,
            ColumnKind::Date => "Date",
            ColumnKind::DateTime => "DateTime",
            ColumnKind::Uuid => "UUID",
            ColumnKind::Json => "JSONString",
        }
    }

    /// SQLite column type used when creating tables
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Float => "REAL",
            ColumnKind::Boolean => "BOOLEAN",
            ColumnKind::Text => "TEXT",
            ColumnKind::Date => "DATE",
            ColumnKind::DateTime => "DATETIME",
            ColumnKind::Uuid => "UUID",
            ColumnKind::Json => "JSON",
        }
    }

    /// Map a declared SQLite column type onto a kind.
    ///
    /// SQLite accepts arbitrary type names, so this follows its affinity
    /// rules loosely and falls back to [`ColumnKind::Text`].
    pub fn from_sql_type(declared: &str) -> Self {
        let ty = declared.trim().to_ascii_uppercase();

        if ty.contains("BOOL") {
            ColumnKind::Boolean
        } else if ty.contains("INT") {
            ColumnKind::Integer
        } else if ty.contains("REAL")
            || ty.contains("FLOA")
            || ty.contains("DOUB")
            || ty.contains("NUMERIC")
            || ty.contains("DECIMAL")
        {
            ColumnKind::Float
        } else if ty.contains("DATETIME") || ty.contains("TIMESTAMP") {
            ColumnKind::DateTime
        } else if ty.contains("DATE") {
            ColumnKind::Date
        } else if ty.contains("UUID") {
            ColumnKind::Uuid
        } else if ty.contains("JSON") {
            ColumnKind::Json
        } else {
            ColumnKind::Text
        }
    }

    /// Whether values of this kind compare as strings in SQL
    pub fn is_textual(&self) -> bool {
        matches!(self, ColumnKind::Text | ColumnKind::Uuid)
    }
}

/// Column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    /// Column name in the database
    pub name: String,
    pub kind: ColumnKind,
    /// Whether the column can be NULL
    pub nullable: bool,
    /// Whether this is the primary key
    pub primary_key: bool,
    /// Whether this key aliases the SQLite rowid, so SQLite assigns it
    pub rowid_alias: bool,
    /// Default value expression (e.g., "CURRENT_TIMESTAMP")
    pub default: Option<String>,
    pub comment: Option<String>,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            primary_key: false,
            rowid_alias: false,
            default: None,
            comment: None,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Mark the primary key. An integer key is created as `INTEGER PRIMARY
    /// KEY` by [`ModelMeta::create_table_sql`] and so aliases the rowid.
    pub fn primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self.rowid_alias = primary_key && self.kind == ColumnKind::Integer;
        self
    }

    /// Override whether the key aliases the rowid, for tables created
    /// elsewhere (`BIGINT PRIMARY KEY` or `WITHOUT ROWID` tables do not).
    pub fn rowid_alias(mut self, rowid_alias: bool) -> Self {
        self.rowid_alias = rowid_alias;
        self
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Keys aliasing the rowid are assigned by SQLite when omitted
    pub fn is_auto_increment(&self) -> bool {
        self.primary_key && self.rowid_alias
    }

    /// Generate the column definition SQL
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", quote_ident(&self.name), self.kind.sql_type());

        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }

        if !self.nullable && !self.primary_key {
            sql.push_str(" NOT NULL");
        }

        if let Some(ref default) = self.default {
            sql.push_str(&format!(" DEFAULT {}", default));
        }

        sql
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Many rows of the target point at this row
    HasMany,
    /// This row points at one row of the target
    BelongsTo,
}

/// Relation to another model, joined on `from` (this table) = `to` (target).
#[derive(Debug, Clone, PartialEq)]
pub struct RelationMeta {
    /// Field name on the owning model (e.g. "books")
    pub name: String,
    /// Target model name (e.g. "Book")
    pub target: String,
    pub kind: RelationKind,
    pub from: String,
    pub to: String,
}

impl RelationMeta {
    pub fn has_many(
        name: impl Into<String>,
        target: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            kind: RelationKind::HasMany,
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn belongs_to(
        name: impl Into<String>,
        target: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            kind: RelationKind::BelongsTo,
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Metadata about one model (table).
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMeta {
    /// Model name, used for type names (e.g. "UserRole")
    pub name: String,
    /// The SQL table name (e.g. "user_roles")
    pub table: String,
    /// Attached database schema, if the table does not live in `main`
    pub schema: Option<String>,
    pub comment: Option<String>,
    pub columns: Vec<ColumnMeta>,
    pub relations: Vec<RelationMeta>,
}

impl ModelMeta {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            schema: None,
            comment: None,
            columns: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn column(mut self, column: ColumnMeta) -> Self {
        self.columns.push(column);
        self
    }

    pub fn relation(mut self, relation: RelationMeta) -> Self {
        self.relations.push(relation);
        self
    }

    /// The primary key column, if any
    pub fn primary_key(&self) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.primary_key)
    }

    /// Look up a column by its database name
    pub fn get_column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Quoted, schema-qualified table name for use in SQL
    pub fn qualified_table(&self) -> String {
        match self.schema {
            Some(ref schema) => format!("{}.{}", quote_ident(schema), quote_ident(&self.table)),
            None => quote_ident(&self.table),
        }
    }

    /// Generate CREATE TABLE IF NOT EXISTS SQL.
    ///
    /// The model comment is stored as a leading SQL comment so that it can
    /// be read back from `sqlite_master` as the table description.
    pub fn create_table_sql(&self) -> String {
        let column_defs: Vec<String> = self.columns.iter().map(|c| c.to_sql()).collect();
        let comment = match self.comment {
            Some(ref comment) => format!("\n  -- {}", comment.replace('\n', " ")),
            None => String::new(),
        };

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({}\n  {}\n)",
            self.qualified_table(),
            comment,
            column_defs.join(",\n  ")
        )
    }
}

/// Implemented by `#[derive(Model)]`.
///
/// ```
/// use autoschema::{ColumnKind, Model};
///
/// #[derive(Model)]
/// #[model(table = "events")]
/// struct Event {
///     id: i64,
///     title: String,
///     #[column(kind = "datetime")]
///     starts_at: String,
///     note: Option<String>,
/// }
///
/// let meta = Event::model_meta();
/// assert_eq!(meta.table, "events");
/// assert_eq!(meta.primary_key().map(|c| c.name.as_str()), Some("id"));
/// assert_eq!(meta.get_column("starts_at").map(|c| c.kind), Some(ColumnKind::DateTime));
/// assert!(meta.get_column("note").is_some_and(|c| c.nullable));
/// ```
///
/// Field types without a column kind are rejected at compile time:
///
/// ```compile_fail
/// use autoschema::Model;
///
/// #[derive(Model)]
/// struct Event {
///     id: i64,
///     timer: std::time::Instant,
/// }
/// ```
pub trait Model {
    fn model_meta() -> ModelMeta;
}

/// Quote an SQL identifier
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_sql_type() {
        assert_eq!(ColumnKind::from_sql_type("INTEGER"), ColumnKind::Integer);
        assert_eq!(ColumnKind::from_sql_type("bigint"), ColumnKind::Integer);
        assert_eq!(ColumnKind::from_sql_type("VARCHAR(255)"), ColumnKind::Text);
        assert_eq!(ColumnKind::from_sql_type("double precision"), ColumnKind::Float);
        assert_eq!(ColumnKind::from_sql_type("BOOLEAN"), ColumnKind::Boolean);
        assert_eq!(ColumnKind::from_sql_type("TIMESTAMP"), ColumnKind::DateTime);
        assert_eq!(ColumnKind::from_sql_type("datetime"), ColumnKind::DateTime);
        assert_eq!(ColumnKind::from_sql_type("DATE"), ColumnKind::Date);
        assert_eq!(ColumnKind::from_sql_type(""), ColumnKind::Text);
    }

    #[test]
    fn test_column_sql() {
        let id = ColumnMeta::new("id", ColumnKind::Integer).primary_key(true);
        assert_eq!(id.to_sql(), "\"id\" INTEGER PRIMARY KEY");

        let name = ColumnMeta::new("name", ColumnKind::Text);
        assert_eq!(name.to_sql(), "\"name\" TEXT NOT NULL");

        let created = ColumnMeta::new("created_at", ColumnKind::DateTime)
            .nullable(true)
            .default_value("CURRENT_TIMESTAMP");
        assert_eq!(
            created.to_sql(),
            "\"created_at\" DATETIME DEFAULT CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn test_only_rowid_aliases_are_auto_assigned() {
        assert!(ColumnMeta::new("id", ColumnKind::Integer).primary_key(true).is_auto_increment());
        assert!(!ColumnMeta::new("code", ColumnKind::Text).primary_key(true).is_auto_increment());
        assert!(
            !ColumnMeta::new("id", ColumnKind::Integer)
                .primary_key(true)
                .rowid_alias(false)
                .is_auto_increment()
        );
        assert!(!ColumnMeta::new("id", ColumnKind::Integer).is_auto_increment());
    }

    #[test]
    fn test_create_table_sql_keeps_comment() {
        let meta = ModelMeta::new("Author", "authors")
            .comment("People who write books")
            .column(ColumnMeta::new("id", ColumnKind::Integer).primary_key(true))
            .column(ColumnMeta::new("name", ColumnKind::Text));

        assert_eq!(
            meta.create_table_sql(),
            "CREATE TABLE IF NOT EXISTS \"authors\" (\n  -- People who write books\n  \"id\" INTEGER PRIMARY KEY,\n  \"name\" TEXT NOT NULL\n)"
        );
    }

    #[test]
    fn test_qualified_table() {
        let meta = ModelMeta::new("Log", "logs").schema("audit");
        assert_eq!(meta.qualified_table(), "\"audit\".\"logs\"");
    }
}
