//! GraphQL input types for filters

use async_graphql::dynamic::{InputObject, InputValue, TypeRef};

use crate::model::ColumnKind;

use super::{CompiledFilter, FilterOp, FilterTarget};

/// Name of the shared range input for a column kind: `IntRange`, `DateTimeRange`, ...
pub fn range_type_name(kind: ColumnKind) -> String {
    format!("{}Range", kind.scalar_name())
}

/// Inclusive range input used by `{field}Range` filters
pub fn range_input(kind: ColumnKind) -> InputObject {
    InputObject::new(range_type_name(kind))
        .description(format!("Inclusive range of {} values", kind.scalar_name()))
        .field(InputValue::new("begin", TypeRef::named_nn(kind.scalar_name())))
        .field(InputValue::new("end", TypeRef::named_nn(kind.scalar_name())))
}

fn field_type(kind: ColumnKind, op: FilterOp) -> TypeRef {
    match op {
        FilterOp::IsNull => TypeRef::named(TypeRef::BOOLEAN),
        FilterOp::In | FilterOp::NotIn => TypeRef::named_nn_list(kind.scalar_name()),
        FilterOp::Range => TypeRef::named(range_type_name(kind)),
        _ => TypeRef::named(kind.scalar_name()),
    }
}

impl CompiledFilter {
    /// Build the `{Model}Filter` input object
    pub fn input_object(&self) -> InputObject {
        let mut input = InputObject::new(&self.name);

        for (name, target) in &self.fields {
            let field = match target {
                FilterTarget::Column { kind, op, .. } => {
                    InputValue::new(name, field_type(*kind, *op))
                }
                FilterTarget::Custom(custom) => {
                    let mut field = InputValue::new(name, custom.ty.clone());
                    if let Some(ref description) = custom.description {
                        field = field.description(description);
                    }
                    field
                }
            };
            input = input.field(field);
        }

        input
            .field(
                InputValue::new("and", TypeRef::named_nn_list(&self.name))
                    .description("All of the given filters must match"),
            )
            .field(
                InputValue::new("or", TypeRef::named_nn_list(&self.name))
                    .description("At least one of the given filters must match"),
            )
            .field(
                InputValue::new("not", TypeRef::named(&self.name))
                    .description("The given filter must not match"),
            )
    }
}
