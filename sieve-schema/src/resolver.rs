//! Field path resolution.
//!
//! A field path names a scalar field on a model, optionally crossing relations
//! with [`LOOKUP_SEP`]: on a `Product`, `parts__material` walks the `parts`
//! relation to `Part` and ends on its `material` field. Resolution fails closed
//! on the first segment that does not exist or cannot be crossed.

use smol_str::SmolStr;

use crate::ast::{Choice, Field, Model, ScalarType, Schema, TypeCategory, DEFAULT_CATEGORY_TABLE};
use crate::convert::convert;
use crate::error::{ConversionError, SchemaError, SchemaResult};
use crate::value::FieldValue;

/// Separator between the segments of a field path.
pub const LOOKUP_SEP: &str = "__";

/// Everything a filter needs to know about the field at the end of a path.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Model the path starts from.
    pub model: SmolStr,
    /// The full path, as written.
    pub path: SmolStr,
    /// The terminal field definition.
    pub field: Field,
    /// Native kind of the terminal field.
    pub scalar_type: ScalarType,
    /// Whether any relation on the path is multi-valued.
    pub multi_valued: bool,
}

impl FieldDescriptor {
    /// Coarse category under the default classification table.
    pub fn category(&self) -> TypeCategory {
        TypeCategory::classify(DEFAULT_CATEGORY_TABLE, self.scalar_type)
    }

    /// Human readable name of the terminal field.
    pub fn display_name(&self) -> String {
        self.field.display_name()
    }

    /// The declared value domain, empty when the field accepts anything.
    pub fn choices(&self) -> &[Choice] {
        &self.field.choices
    }

    /// Convert a raw string with the terminal field's native parser.
    pub fn convert(&self, raw: &str) -> Result<FieldValue, ConversionError> {
        convert(self.scalar_type, raw)
    }
}

/// Resolve `path` starting at `model`.
pub fn resolve(schema: &Schema, model: &str, path: &str) -> SchemaResult<FieldDescriptor> {
    let start = schema.model(model)?;
    let segments: Vec<&str> = path.split(LOOKUP_SEP).collect();
    walk(schema, start, path, &segments, false).map(|(field, multi_valued)| {
        tracing::trace!(model, path, field = %field.name, "Resolved field path");
        FieldDescriptor {
            model: start.name.clone(),
            path: SmolStr::new(path),
            scalar_type: field.field_type.scalar().unwrap_or(ScalarType::String),
            field: field.clone(),
            multi_valued,
        }
    })
}

fn walk<'a>(
    schema: &'a Schema,
    model: &'a Model,
    path: &str,
    segments: &[&str],
    multi_valued: bool,
) -> SchemaResult<(&'a Field, bool)> {
    let Some((segment, rest)) = segments.split_first() else {
        return Err(SchemaError::unknown_field(model.name(), path, ""));
    };
    let field = model
        .get_field(segment)
        .ok_or_else(|| SchemaError::unknown_field(model.name(), path, *segment))?;

    if rest.is_empty() {
        if field.is_relation() {
            return Err(SchemaError::invalid_path(
                model.name(),
                field.name(),
                path,
                "a relation cannot be compared directly",
            ));
        }
        return Ok((field, multi_valued));
    }

    let Some(target) = field.related_model() else {
        return Err(SchemaError::invalid_path(
            model.name(),
            field.name(),
            path,
            "not a relation",
        ));
    };
    let next = schema.model(target)?;
    walk(schema, next, path, rest, multi_valued || field.is_list())
}

impl Schema {
    /// Resolve a field path on one of this schema's models.
    pub fn resolve(&self, model: &str, path: &str) -> SchemaResult<FieldDescriptor> {
        resolve(self, model, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Model;
    use pretty_assertions::assert_eq;

    fn catalog() -> Schema {
        Schema::new()
            .with_model(
                Model::new("Part")
                    .with_field(Field::scalar("name", ScalarType::String))
                    .with_field(Field::scalar("material", ScalarType::PositiveSmallInt).with_choices([
                        Choice::new("1", "wood"),
                        Choice::new("2", "steel"),
                    ])),
            )
            .with_model(
                Model::new("Product")
                    .with_field(Field::scalar("name", ScalarType::String))
                    .with_field(Field::scalar("min_age", ScalarType::PositiveSmallInt))
                    .with_field(Field::many("parts", "Part")),
            )
            .with_model(
                Model::new("Purchase")
                    .with_field(Field::relation("product", "Product"))
                    .with_field(Field::scalar("created", ScalarType::DateTime)),
            )
    }

    #[test]
    fn test_resolve_direct_field() {
        let schema = catalog();
        let desc = schema.resolve("Product", "min_age").unwrap();
        assert_eq!(desc.scalar_type, ScalarType::PositiveSmallInt);
        assert_eq!(desc.category(), TypeCategory::Numeric);
        assert_eq!(desc.display_name(), "min age");
        assert!(!desc.multi_valued);
    }

    #[test]
    fn test_resolve_across_relations() {
        let schema = catalog();
        let desc = schema.resolve("Purchase", "product__parts__material").unwrap();
        assert_eq!(desc.model, "Purchase");
        assert_eq!(desc.field.name, "material");
        assert_eq!(desc.choices().len(), 2);
        assert!(desc.multi_valued);
    }

    #[test]
    fn test_resolve_unknown_segment() {
        let schema = catalog();
        let err = schema.resolve("Product", "parts__colour").unwrap_err();
        match err {
            SchemaError::UnknownField { model, segment, .. } => {
                assert_eq!(model, "Part");
                assert_eq!(segment, "colour");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_through_scalar_fails() {
        let schema = catalog();
        let err = schema.resolve("Product", "name__length").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPath { .. }));
    }

    #[test]
    fn test_resolve_terminal_relation_fails() {
        let schema = catalog();
        assert!(schema.resolve("Product", "parts").unwrap_err().is_path_error());
    }

    #[test]
    fn test_resolve_unknown_model() {
        let schema = catalog();
        assert!(matches!(
            schema.resolve("Order", "name"),
            Err(SchemaError::UnknownModel { .. })
        ));
    }

    #[test]
    fn test_descriptor_convert() {
        let schema = catalog();
        let desc = schema.resolve("Purchase", "created").unwrap();
        assert!(desc.convert("2021-03-04 10:30").is_ok());
        assert!(desc.convert("soon").is_err());
    }
}
