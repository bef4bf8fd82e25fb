//! Model definitions for the Sieve registry AST.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::Field;

/// A field path an administrator exposed for filtering, with an optional label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterField {
    /// Field path, possibly crossing relations (`parts__material`).
    pub path: SmolStr,
    /// Label shown instead of the resolved field's display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl FilterField {
    /// Expose a path using the field's own display name.
    pub fn new(path: impl Into<SmolStr>) -> Self {
        Self {
            path: path.into(),
            label: None,
        }
    }

    /// Expose a path under a custom label.
    pub fn labelled(path: impl Into<SmolStr>, label: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: Some(label.into()),
        }
    }
}

/// A model definition (one filterable content type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Model name, used as the content-type identifier.
    pub name: SmolStr,
    /// Human readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose_name: Option<String>,
    /// Model fields, in declaration order.
    #[serde(default, with = "field_list")]
    pub fields: IndexMap<SmolStr, Field>,
    /// Paths exposed for filtering. When empty every resolvable path is allowed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter_fields: Vec<FilterField>,
}

impl Model {
    /// Create a new model.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            verbose_name: None,
            fields: IndexMap::new(),
            filter_fields: vec![],
        }
    }

    /// Get the model name as a string.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Human readable name, defaulting to the model name.
    pub fn display_name(&self) -> &str {
        self.verbose_name.as_deref().unwrap_or_else(|| self.name())
    }

    /// Add a field to the model.
    pub fn add_field(&mut self, field: Field) {
        self.fields.insert(field.name.clone(), field);
    }

    /// Builder form of [`Model::add_field`].
    pub fn with_field(mut self, field: Field) -> Self {
        self.add_field(field);
        self
    }

    /// Expose a path for filtering.
    pub fn with_filter_field(mut self, field: FilterField) -> Self {
        self.filter_fields.push(field);
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Get all relation fields.
    pub fn relation_fields(&self) -> Vec<&Field> {
        self.fields.values().filter(|f| f.is_relation()).collect()
    }

    /// Get all scalar (non-relation) fields.
    pub fn scalar_fields(&self) -> Vec<&Field> {
        self.fields.values().filter(|f| !f.is_relation()).collect()
    }

    /// Whether `path` may be used in a filter clause on this model.
    pub fn allows_filter_path(&self, path: &str) -> bool {
        self.filter_fields.is_empty() || self.filter_fields.iter().any(|f| f.path == path)
    }
}

/// (De)serialize an ordered field map as a list of fields keyed by name.
pub(crate) mod field_list {
    use indexmap::IndexMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use smol_str::SmolStr;

    use crate::ast::Field;

    pub fn serialize<S: Serializer>(
        fields: &IndexMap<SmolStr, Field>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let list: Vec<&Field> = fields.values().collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<IndexMap<SmolStr, Field>, D::Error> {
        let list = Vec::<Field>::deserialize(deserializer)?;
        Ok(list.into_iter().map(|f| (f.name.clone(), f)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ScalarType;

    fn customer() -> Model {
        Model::new("Customer")
            .with_field(Field::scalar("name", ScalarType::String))
            .with_field(Field::scalar("email", ScalarType::Email))
            .with_field(Field::many("purchases", "Purchase"))
    }

    #[test]
    fn test_model_fields_keep_order() {
        let model = customer();
        let names: Vec<_> = model.fields.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["name", "email", "purchases"]);
    }

    #[test]
    fn test_model_field_partition() {
        let model = customer();
        assert_eq!(model.scalar_fields().len(), 2);
        assert_eq!(model.relation_fields().len(), 1);
        assert!(model.get_field("email").is_some());
        assert!(model.get_field("missing").is_none());
    }

    #[test]
    fn test_display_name() {
        let model = customer();
        assert_eq!(model.display_name(), "Customer");

        let mut model = model;
        model.verbose_name = Some("ACME customer".into());
        assert_eq!(model.display_name(), "ACME customer");
    }

    #[test]
    fn test_allows_filter_path() {
        let open = customer();
        assert!(open.allows_filter_path("anything__goes"));

        let restricted = customer().with_filter_field(FilterField::new("name"));
        assert!(restricted.allows_filter_path("name"));
        assert!(!restricted.allows_filter_path("email"));
    }

    #[test]
    fn test_model_serde_list_format() {
        let json = serde_json::to_value(customer()).unwrap();
        assert!(json["fields"].is_array());
        assert_eq!(json["fields"][0]["name"], "name");

        let back: Model = serde_json::from_value(json).unwrap();
        assert_eq!(back, customer());
    }
}
