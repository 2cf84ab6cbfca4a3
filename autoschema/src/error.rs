//! Error type shared by schema building and resolvers

/// Errors raised while assembling the schema or resolving a request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The database driver failed
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// async-graphql rejected the assembled schema
    #[error("schema error: {0}")]
    Schema(String),

    /// Two models were registered under the same name
    #[error("model `{0}` is already registered")]
    DuplicateModel(String),

    /// A model name was referenced that is not in the registry
    #[error("unknown model `{0}`")]
    UnknownModel(String),

    /// Relay nodes need a primary key to build global ids
    #[error("model `{0}` has no primary key")]
    MissingPrimaryKey(String),

    /// A custom node name must end up with a derivable connection name
    #[error("node type `{0}` must contain `Node` or `Schema`")]
    InvalidNodeName(String),

    /// Two generated fields of one GraphQL type would share a name
    #[error("`{type_name}` would have more than one field named `{field}`")]
    DuplicateField { type_name: String, field: String },

    #[error("invalid cursor `{0}`")]
    InvalidCursor(String),

    #[error("invalid global id `{0}`")]
    InvalidGlobalId(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No row matched the given key
    #[error("{0} not found")]
    NotFound(String),

    /// A stored value could not be decoded into the declared column kind
    #[error("cannot decode column `{column}`: {message}")]
    Decode { column: String, message: String },
}

impl From<async_graphql::dynamic::SchemaError> for Error {
    fn from(err: async_graphql::dynamic::SchemaError) -> Self {
        Error::Schema(err.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
