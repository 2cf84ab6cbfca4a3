//! Procedural macros for autoschema
//!
//! - `#[derive(Model)]` - describe a struct as a table for the schema builder

use convert_case::{Case, Casing};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, ExprLit, Field, Fields,
    GenericArgument, Lit, LitStr, PathArguments, Type,
};

/// Derive `autoschema::Model` for a struct with named fields.
///
/// # Usage
///
/// ```ignore
/// /// People who write books
/// #[derive(Model)]
/// #[model(table = "authors")]
/// struct Author {
///     id: i64,
///     #[column(comment = "Full name")]
///     name: String,
///     born: Option<NaiveDate>,
///     #[relation(target = "Book")]
///     books: Vec<Book>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[model(name, table, schema, comment)]`: the model name defaults to
///   the struct name, the table to its snake_case form and the comment to
///   the struct's doc comment.
/// - `#[column(name, primary_key, kind, default, comment, skip)]`: the
///   primary key defaults to the field named `id`; `kind` overrides the
///   kind inferred from the Rust type (`"integer"`, `"float"`, `"boolean"`,
///   `"text"`, `"date"`, `"datetime"`, `"uuid"`, `"json"`).
/// - `#[relation(target, name, from, to)]`: `Vec<_>` fields are has-many
///   relations joined on `id` = `{model}_id`, other fields belong-to
///   relations joined on `{field}_id` = `id`.
///
/// `Option<T>` columns are nullable.
#[proc_macro_derive(Model, attributes(model, column, relation))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_model(&input) {
        Ok(output) => output.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

#[derive(Default)]
struct ModelAttrs {
    name: Option<String>,
    table: Option<String>,
    schema: Option<String>,
    comment: Option<String>,
}

#[derive(Default)]
struct ColumnAttrs {
    name: Option<String>,
    primary_key: bool,
    kind: Option<LitStr>,
    default: Option<String>,
    comment: Option<String>,
    skip: bool,
}

#[derive(Default)]
struct RelationAttrs {
    target: Option<String>,
    name: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

fn string_value(meta: &syn::meta::ParseNestedMeta) -> syn::Result<String> {
    Ok(meta.value()?.parse::<LitStr>()?.value())
}

/// Joined `///` lines, used as a comment when none is given explicitly
fn doc_comment(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|a| a.path().is_ident("doc"))
        .filter_map(|a| match &a.meta {
            syn::Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(s), ..
                }) => Some(s.value().trim().to_string()),
                _ => None,
            },
            _ => None,
        })
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join(" "))
    }
}

fn parse_model_attrs(attrs: &[Attribute]) -> syn::Result<ModelAttrs> {
    let mut parsed = ModelAttrs::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident("model")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                parsed.name = Some(string_value(&meta)?);
            } else if meta.path.is_ident("table") {
                parsed.table = Some(string_value(&meta)?);
            } else if meta.path.is_ident("schema") {
                parsed.schema = Some(string_value(&meta)?);
            } else if meta.path.is_ident("comment") {
                parsed.comment = Some(string_value(&meta)?);
            } else {
                return Err(meta.error("expected `name`, `table`, `schema` or `comment`"));
            }
            Ok(())
        })?;
    }

    Ok(parsed)
}

fn parse_column_attrs(field: &Field) -> syn::Result<ColumnAttrs> {
    let mut parsed = ColumnAttrs::default();

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("column")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                parsed.name = Some(string_value(&meta)?);
            } else if meta.path.is_ident("primary_key") {
                parsed.primary_key = true;
            } else if meta.path.is_ident("kind") {
                parsed.kind = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("default") {
                parsed.default = Some(string_value(&meta)?);
            } else if meta.path.is_ident("comment") {
                parsed.comment = Some(string_value(&meta)?);
            } else if meta.path.is_ident("skip") {
                parsed.skip = true;
            } else {
                return Err(meta.error(
                    "expected `name`, `primary_key`, `kind`, `default`, `comment` or `skip`",
                ));
            }
            Ok(())
        })?;
    }

    Ok(parsed)
}

fn parse_relation_attrs(attr: &Attribute) -> syn::Result<RelationAttrs> {
    let mut parsed = RelationAttrs::default();

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("target") {
            parsed.target = Some(string_value(&meta)?);
        } else if meta.path.is_ident("name") {
            parsed.name = Some(string_value(&meta)?);
        } else if meta.path.is_ident("from") {
            parsed.from = Some(string_value(&meta)?);
        } else if meta.path.is_ident("to") {
            parsed.to = Some(string_value(&meta)?);
        } else {
            return Err(meta.error("expected `target`, `name`, `from` or `to`"));
        }
        Ok(())
    })?;

    Ok(parsed)
}

/// `Wrapper<T>` -> `T` when the last path segment is `wrapper`
fn unwrap_generic<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => args.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(inner) => Some(inner),
            _ => None,
        }),
        _ => None,
    }
}

fn last_segment(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
        Type::Reference(reference) => last_segment(&reference.elem),
        _ => None,
    }
}

fn kind_variant(name: &str) -> Option<&'static str> {
    Some(match name {
        "integer" => "Integer",
        "float" => "Float",
        "boolean" => "Boolean",
        "text" => "Text",
        "date" => "Date",
        "datetime" => "DateTime",
        "uuid" => "Uuid",
        "json" => "Json",
        _ => return None,
    })
}

fn infer_kind(ty: &Type) -> Option<&'static str> {
    let name = last_segment(ty)?;
    Some(match name.as_str() {
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
        | "u128" | "usize" => "Integer",
        "f32" | "f64" => "Float",
        "bool" => "Boolean",
        "String" | "str" => "Text",
        "NaiveDate" | "Date" => "Date",
        "NaiveDateTime" | "DateTime" | "OffsetDateTime" | "PrimitiveDateTime" => "DateTime",
        "Uuid" => "Uuid",
        "Value" | "Json" => "Json",
        _ => return None,
    })
}

fn field_name(field: &Field) -> String {
    field
        .ident
        .as_ref()
        .map(|i| i.to_string().trim_start_matches("r#").to_string())
        .unwrap_or_default()
}

fn expand_column(field: &Field, attrs: ColumnAttrs, primary_key: bool) -> syn::Result<TokenStream2> {
    let (ty, nullable) = match unwrap_generic(&field.ty, "Option") {
        Some(inner) => (inner, true),
        None => (&field.ty, false),
    };

    let kind = match attrs.kind {
        Some(ref kind) => kind_variant(&kind.value()).ok_or_else(|| {
            syn::Error::new_spanned(kind, "unknown column kind")
        })?,
        None => infer_kind(ty).ok_or_else(|| {
            syn::Error::new_spanned(
                &field.ty,
                "cannot infer a column kind for this type; set #[column(kind = \"...\")] or #[column(skip)]",
            )
        })?,
    };
    let kind = format_ident!("{}", kind);

    let name = attrs.name.unwrap_or_else(|| field_name(field));
    let default = attrs
        .default
        .map(|d| quote! { .default_value(#d) });
    let comment = attrs
        .comment
        .or_else(|| doc_comment(&field.attrs))
        .map(|c| quote! { .comment(#c) });

    Ok(quote! {
        .column(
            ::autoschema::ColumnMeta::new(#name, ::autoschema::ColumnKind::#kind)
                .nullable(#nullable)
                .primary_key(#primary_key)
                #default
                #comment
        )
    })
}

fn expand_relation(field: &Field, attr: &Attribute, model: &str) -> syn::Result<TokenStream2> {
    let attrs = parse_relation_attrs(attr)?;
    let field_name = field_name(field);
    let name = attrs.name.unwrap_or_else(|| field_name.clone());

    let many = unwrap_generic(&field.ty, "Vec");
    let target = match attrs.target {
        Some(target) => target,
        None => {
            let inner = many
                .or_else(|| unwrap_generic(&field.ty, "Option"))
                .unwrap_or(&field.ty);
            last_segment(inner).ok_or_else(|| {
                syn::Error::new_spanned(&field.ty, "set #[relation(target = \"...\")]")
            })?
        }
    };

    Ok(if many.is_some() {
        let from = attrs.from.unwrap_or_else(|| "id".to_string());
        let to = attrs
            .to
            .unwrap_or_else(|| format!("{}_id", model.to_case(Case::Snake)));
        quote! { .relation(::autoschema::RelationMeta::has_many(#name, #target, #from, #to)) }
    } else {
        let from = attrs.from.unwrap_or_else(|| format!("{}_id", field_name));
        let to = attrs.to.unwrap_or_else(|| "id".to_string());
        quote! { .relation(::autoschema::RelationMeta::belongs_to(#name, #target, #from, #to)) }
    })
}

fn expand_model(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Model can only be derived for structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Model requires a struct with named fields",
        ));
    };

    let attrs = parse_model_attrs(&input.attrs)?;
    let ident = &input.ident;
    let model = attrs.name.unwrap_or_else(|| ident.to_string());
    let table = attrs
        .table
        .unwrap_or_else(|| ident.to_string().to_case(Case::Snake));
    let schema = attrs.schema.map(|s| quote! { .schema(#s) });
    let comment = attrs
        .comment
        .or_else(|| doc_comment(&input.attrs))
        .map(|c| quote! { .comment(#c) });

    let mut columns = Vec::new();
    let mut relations = Vec::new();
    for field in &fields.named {
        if let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("relation")) {
            relations.push(expand_relation(field, attr, &model)?);
            continue;
        }
        let column = parse_column_attrs(field)?;
        if !column.skip {
            columns.push((field, column));
        }
    }

    // Without an explicit primary key, the column named `id` is used
    let explicit_pk = columns.iter().any(|(_, c)| c.primary_key);
    let columns = columns
        .into_iter()
        .map(|(field, column)| {
            let primary_key = if explicit_pk {
                column.primary_key
            } else {
                column.name.clone().unwrap_or_else(|| field_name(field)) == "id"
            };
            expand_column(field, column, primary_key)
        })
        .collect::<syn::Result<Vec<_>>>()?;

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::autoschema::Model for #ident #ty_generics #where_clause {
            fn model_meta() -> ::autoschema::ModelMeta {
                ::autoschema::ModelMeta::new(#model, #table)
                    #schema
                    #comment
                    #(#columns)*
                    #(#relations)*
            }
        }
    })
}
