//! Naming conventions for generated types and fields
//!
//! Custom filters and nodes are matched to models purely by these names,
//! so they have to stay stable: `UserRole` always gets `UserRoleFilter`,
//! `UserRoleNode`, `UserRoleConnection` and the `allUserRole` query.

use std::collections::HashSet;

use convert_case::{Boundary, Case, Casing};

use crate::error::{Error, Result};

const WORD_BOUNDARIES: &[Boundary] = &[
    Boundary::Underscore,
    Boundary::Hyphen,
    Boundary::Space,
    Boundary::LowerUpper,
    Boundary::DigitUpper,
    Boundary::Acronym,
];

/// `user_role` -> `UserRole`
pub fn camelize(s: &str) -> String {
    s.with_boundaries(WORD_BOUNDARIES).to_case(Case::Pascal)
}

/// `UserRole` -> `user_role`
pub fn underscore(s: &str) -> String {
    s.with_boundaries(WORD_BOUNDARIES).to_case(Case::Snake)
}

/// GraphQL field name for a column or relation: `created_at` -> `createdAt`
pub fn lower_camel(s: &str) -> String {
    s.with_boundaries(WORD_BOUNDARIES).to_case(Case::Camel)
}

/// `created_at` -> `CREATED_AT`
pub fn upper_snake(s: &str) -> String {
    s.with_boundaries(WORD_BOUNDARIES).to_case(Case::UpperSnake)
}

pub fn filter_name(model: &str) -> String {
    format!("{}Filter", camelize(model))
}

pub fn node_name(model: &str) -> String {
    format!("{}Node", camelize(model))
}

/// Alternative custom node name, accepted when no `{Model}Node` is given
pub fn schema_name(model: &str) -> String {
    format!("{}Schema", camelize(model))
}

fn replace_node_suffix(node: &str, with: &str) -> Result<String> {
    if node.contains("Node") {
        Ok(node.replace("Node", with))
    } else if node.contains("Schema") {
        Ok(node.replace("Schema", with))
    } else {
        Err(Error::InvalidNodeName(node.to_string()))
    }
}

/// `UserNode` -> `UserConnection`, `UserSchema` -> `UserConnection`
pub fn connection_name(node: &str) -> Result<String> {
    replace_node_suffix(node, "Connection")
}

/// `UserNode` -> `UserEdge`
pub fn edge_name(node: &str) -> Result<String> {
    replace_node_suffix(node, "Edge")
}

/// `UserRoleConnection` -> `allUserRole`
pub fn query_field_name(connection: &str) -> String {
    let snake = format!("all_{}", underscore(connection).replace("_connection", ""));
    lower_camel(&snake)
}

pub fn sort_enum_name(node: &str) -> String {
    format!("{}SortEnum", node)
}

/// Sort enum value for a column: `created_at` -> `CREATED_AT_ASC`
pub fn sort_value(column: &str, descending: bool) -> String {
    format!(
        "{}_{}",
        upper_snake(column),
        if descending { "DESC" } else { "ASC" }
    )
}

/// Check that the field names generated for one GraphQL type are distinct
pub(crate) fn ensure_unique<'a>(
    type_name: &str,
    fields: impl IntoIterator<Item = &'a str>,
) -> Result<()> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field) {
            return Err(Error::DuplicateField {
                type_name: type_name.to_string(),
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

pub fn create_mutation_name(model: &str) -> String {
    format!("create{}", camelize(model))
}

pub fn update_mutation_name(model: &str) -> String {
    format!("update{}", camelize(model))
}

pub fn delete_mutation_name(model: &str) -> String {
    format!("delete{}", camelize(model))
}

pub fn create_input_name(model: &str) -> String {
    format!("{}CreateInput", camelize(model))
}

pub fn update_input_name(model: &str) -> String {
    format!("{}UpdateInput", camelize(model))
}

pub fn payload_name(model: &str) -> String {
    format!("{}Payload", camelize(model))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_camelize_and_underscore() {
        assert_eq!(camelize("user_role"), "UserRole");
        assert_eq!(camelize("UserRole"), "UserRole");
        assert_eq!(camelize("users"), "Users");
        assert_eq!(underscore("UserRole"), "user_role");
        assert_eq!(underscore("UserRoleConnection"), "user_role_connection");
        assert_eq!(underscore("Address2Node"), "address2_node");
    }

    #[test]
    fn test_field_names() {
        assert_eq!(lower_camel("created_at"), "createdAt");
        assert_eq!(lower_camel("name"), "name");
        assert_eq!(lower_camel("createdAt"), "createdAt");
        assert_eq!(upper_snake("created_at"), "CREATED_AT");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(filter_name("UserRole"), "UserRoleFilter");
        assert_eq!(node_name("UserRole"), "UserRoleNode");
        assert_eq!(schema_name("user"), "UserSchema");
        assert_eq!(sort_enum_name("UserNode"), "UserNodeSortEnum");
        assert_eq!(sort_value("created_at", true), "CREATED_AT_DESC");
        assert_eq!(sort_value("id", false), "ID_ASC");
    }

    #[test]
    fn test_connection_name() {
        assert_eq!(connection_name("UserNode").unwrap(), "UserConnection");
        assert_eq!(connection_name("UserSchema").unwrap(), "UserConnection");
        assert_eq!(edge_name("UserNode").unwrap(), "UserEdge");
        assert_matches!(connection_name("UserType"), Err(Error::InvalidNodeName(_)));
    }

    #[test]
    fn test_query_field_name() {
        assert_eq!(query_field_name("UserConnection"), "allUser");
        assert_eq!(query_field_name("UserRoleConnection"), "allUserRole");
    }

    #[test]
    fn test_mutation_names() {
        assert_eq!(create_mutation_name("book"), "createBook");
        assert_eq!(update_mutation_name("Book"), "updateBook");
        assert_eq!(delete_mutation_name("Book"), "deleteBook");
        assert_eq!(create_input_name("Book"), "BookCreateInput");
        assert_eq!(update_input_name("Book"), "BookUpdateInput");
        assert_eq!(payload_name("Book"), "BookPayload");
    }

    #[test]
    fn test_ensure_unique() {
        assert!(ensure_unique("BookNode", ["id", "title", "dbId"]).is_ok());
        assert_matches!(
            ensure_unique("BookNode", ["id", "dbId", "title", "dbId"]),
            Err(Error::DuplicateField { type_name, field }) if type_name == "BookNode" && field == "dbId"
        );
    }
}
