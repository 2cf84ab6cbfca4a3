//! `{Node}SortEnum` types and ORDER BY resolution

use async_graphql::dynamic::{Enum, EnumItem, InputValue, TypeRef};
use async_graphql::{Name, Value};

use crate::error::{Error, Result};

use super::catalog::{ModelEntry, SortKey};

/// Sort enum with `{COLUMN}_ASC` and `{COLUMN}_DESC` per column
pub(crate) fn sort_enum(entry: &ModelEntry) -> Enum {
    let mut sort = Enum::new(&entry.sort_enum).description(format!(
        "Orderings for `{}` lists",
        entry.node
    ));
    for key in &entry.sort_keys {
        sort = sort.item(EnumItem::new(&key.value));
    }
    sort
}

/// `sort: [{Node}SortEnum!] = [{PK}_ASC]`
pub(crate) fn sort_argument(entry: &ModelEntry) -> InputValue {
    InputValue::new("sort", TypeRef::named_nn_list(&entry.sort_enum))
        .default_value(Value::List(vec![Value::Enum(Name::new(entry.default_sort()))]))
        .description("Orderings applied in sequence")
}

/// Resolve the `sort` argument to sort keys.
///
/// The primary key is appended as a tie breaker unless already present,
/// so pages are stable for any ordering.
pub(crate) fn parse_sort<'e>(entry: &'e ModelEntry, value: Option<&Value>) -> Result<Vec<&'e SortKey>> {
    let default = Value::Enum(Name::new(entry.default_sort()));
    let values = match value {
        None | Some(Value::Null) => std::slice::from_ref(&default),
        Some(Value::List(values)) => values.as_slice(),
        Some(single) => std::slice::from_ref(single),
    };

    let mut keys: Vec<&SortKey> = Vec::with_capacity(values.len() + 1);
    for value in values {
        let name = match value {
            Value::Enum(name) => name.as_str(),
            Value::String(name) => name.as_str(),
            other => {
                return Err(Error::InvalidArgument(format!(
                    "`sort` expects {} values, found {}",
                    entry.sort_enum, other
                )));
            }
        };
        let key = entry.sort_key(name).ok_or_else(|| {
            Error::InvalidArgument(format!("`{}` is not a value of {}", name, entry.sort_enum))
        })?;
        if !keys.iter().any(|k| k.column == key.column) {
            keys.push(key);
        }
    }

    let pk = &entry.primary_key().name;
    if !keys.iter().any(|k| &k.column == pk) {
        if let Some(key) = entry.sort_key(&entry.default_sort()) {
            keys.push(key);
        }
    }

    Ok(keys)
}
