//! Filter sets and their GraphQL input types
//!
//! A [`FilterSet`] says which columns of a model can be filtered and with
//! which operators. The default set for a model exposes every column with
//! every operator its kind supports; a custom set registered under the
//! model's filter name (`{Model}Filter`) replaces it.
//!
//! Input field naming follows the operator suffix convention:
//! - `name` (equals), `nameNe` (not equals)
//! - `nameLike`, `nameIlike` (pattern matching, case-insensitive for Ilike)
//! - `nameIsNull`
//! - `nameIn`, `nameNotIn` (list membership)
//! - `nameLt`, `nameLte`, `nameGt`, `nameGte` (comparisons)
//! - `nameRange` (inclusive `begin`/`end`)
//!
//! plus `and`, `or` and `not` for combining filters.

mod compile;
mod input;

pub use input::{range_input, range_type_name};

use std::fmt;
use std::sync::Arc;

use async_graphql::Value;
use async_graphql::dynamic::TypeRef;

use crate::error::{Error, Result};
use crate::model::{ColumnKind, ModelMeta};
use crate::naming::{ensure_unique, filter_name, lower_camel};
use crate::sql::Condition;

/// Fields every filter input has for combining filters
pub(crate) const COMBINATORS: [&str; 3] = ["and", "or", "not"];

/// Comparison operator of a filter field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Eq,
    Ne,
    Like,
    Ilike,
    IsNull,
    In,
    NotIn,
    Lt,
    Lte,
    Gt,
    Gte,
    Range,
}

impl FilterOp {
    pub const ALL: [FilterOp; 12] = [
        FilterOp::Eq,
        FilterOp::Ne,
        FilterOp::Like,
        FilterOp::Ilike,
        FilterOp::IsNull,
        FilterOp::In,
        FilterOp::NotIn,
        FilterOp::Lt,
        FilterOp::Lte,
        FilterOp::Gt,
        FilterOp::Gte,
        FilterOp::Range,
    ];

    /// Suffix appended to the field name for this operator
    pub fn suffix(&self) -> &'static str {
        match self {
            FilterOp::Eq => "",
            FilterOp::Ne => "Ne",
            FilterOp::Like => "Like",
            FilterOp::Ilike => "Ilike",
            FilterOp::IsNull => "IsNull",
            FilterOp::In => "In",
            FilterOp::NotIn => "NotIn",
            FilterOp::Lt => "Lt",
            FilterOp::Lte => "Lte",
            FilterOp::Gt => "Gt",
            FilterOp::Gte => "Gte",
            FilterOp::Range => "Range",
        }
    }

    /// Operators that make sense for a column kind
    pub fn allowed_for(kind: ColumnKind) -> &'static [FilterOp] {
        use FilterOp::*;

        match kind {
            ColumnKind::Text | ColumnKind::Uuid => &FilterOp::ALL,
            ColumnKind::Integer | ColumnKind::Float | ColumnKind::Date | ColumnKind::DateTime => {
                &[Eq, Ne, IsNull, In, NotIn, Lt, Lte, Gt, Gte, Range]
            }
            ColumnKind::Boolean => &[Eq, Ne, IsNull],
            ColumnKind::Json => &[IsNull],
        }
    }
}

/// Converts the value given for a custom filter field into a condition.
pub type FilterFn = dyn Fn(&Value) -> Result<Option<Condition>, String> + Send + Sync;

/// An extra filter field whose SQL is produced by user code.
#[derive(Clone)]
pub struct CustomFilter {
    name: String,
    ty: TypeRef,
    description: Option<String>,
    apply: Arc<FilterFn>,
}

impl CustomFilter {
    pub fn new<F>(name: impl Into<String>, ty: TypeRef, apply: F) -> Self
    where
        F: Fn(&Value) -> Result<Option<Condition>, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            ty,
            description: None,
            apply: Arc::new(apply),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomFilter")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct FilterColumn {
    column: String,
    /// `None` means every operator the column kind allows
    ops: Option<Vec<FilterOp>>,
}

/// Which columns and operators a model's filter input exposes.
#[derive(Debug, Clone)]
pub struct FilterSet {
    name: String,
    columns: Vec<FilterColumn>,
    custom: Vec<CustomFilter>,
}

impl FilterSet {
    /// An empty filter set; add columns with [`field`](Self::field).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            custom: Vec::new(),
        }
    }

    /// Every column of the model with every allowed operator.
    pub fn for_model(meta: &ModelMeta) -> Self {
        let mut set = Self::new(filter_name(&meta.name));
        for column in &meta.columns {
            set = set.all_operators(&column.name);
        }
        set
    }

    /// Expose a column with the given operators.
    pub fn field(mut self, column: impl Into<String>, ops: impl IntoIterator<Item = FilterOp>) -> Self {
        self.columns.push(FilterColumn {
            column: column.into(),
            ops: Some(ops.into_iter().collect()),
        });
        self
    }

    /// Expose a column with every operator its kind allows.
    pub fn all_operators(mut self, column: impl Into<String>) -> Self {
        self.columns.push(FilterColumn {
            column: column.into(),
            ops: None,
        });
        self
    }

    pub fn custom(mut self, filter: CustomFilter) -> Self {
        self.custom.push(filter);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind this set to a model, producing the concrete input fields.
    pub fn compile_for(&self, meta: &ModelMeta) -> Result<CompiledFilter> {
        let mut fields = Vec::new();

        for filter_column in &self.columns {
            let column = meta.get_column(&filter_column.column).ok_or_else(|| {
                Error::InvalidFilter(format!(
                    "`{}` references unknown column `{}` of model `{}`",
                    self.name, filter_column.column, meta.name
                ))
            })?;
            let allowed = FilterOp::allowed_for(column.kind);
            let ops: Vec<FilterOp> = match filter_column.ops {
                Some(ref ops) => ops.clone(),
                None => allowed.to_vec(),
            };

            for op in ops {
                if !allowed.contains(&op) {
                    return Err(Error::InvalidFilter(format!(
                        "`{}`: operator {:?} is not supported for column `{}` of kind {:?}",
                        self.name, op, column.name, column.kind
                    )));
                }
                fields.push((
                    format!("{}{}", lower_camel(&column.name), op.suffix()),
                    FilterTarget::Column {
                        column: column.name.clone(),
                        kind: column.kind,
                        op,
                    },
                ));
            }
        }

        for custom in &self.custom {
            fields.push((custom.name.clone(), FilterTarget::Custom(custom.clone())));
        }

        ensure_unique(
            &self.name,
            fields
                .iter()
                .map(|(name, _)| name.as_str())
                .chain(COMBINATORS),
        )?;

        Ok(CompiledFilter {
            name: self.name.clone(),
            fields,
        })
    }
}

#[derive(Debug, Clone)]
enum FilterTarget {
    Column {
        column: String,
        kind: ColumnKind,
        op: FilterOp,
    },
    Custom(CustomFilter),
}

/// A filter set bound to a model: the input type and its SQL translation.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    name: String,
    fields: Vec<(String, FilterTarget)>,
}

impl CompiledFilter {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Input field names, in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Column kinds that need a range input type
    pub fn range_kinds(&self) -> Vec<ColumnKind> {
        let mut kinds = Vec::new();
        for (_, target) in &self.fields {
            if let FilterTarget::Column {
                kind,
                op: FilterOp::Range,
                ..
            } = target
            {
                if !kinds.contains(kind) {
                    kinds.push(*kind);
                }
            }
        }
        kinds
    }

    fn target(&self, field: &str) -> Option<&FilterTarget> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, target)| target)
    }
}
