//! Top-level content-type registry.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::Model;
use crate::error::{SchemaError, SchemaResult};

/// The set of models filters can target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// All models in the registry.
    #[serde(default, with = "model_list")]
    pub models: IndexMap<SmolStr, Model>,
}

impl Schema {
    /// Create a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a model to the schema.
    pub fn add_model(&mut self, model: Model) {
        self.models.insert(model.name.clone(), model);
    }

    /// Builder form of [`Schema::add_model`].
    pub fn with_model(mut self, model: Model) -> Self {
        self.add_model(model);
        self
    }

    /// Get a model by name.
    pub fn get_model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// Get a model by name, failing with [`SchemaError::UnknownModel`].
    pub fn model(&self, name: &str) -> SchemaResult<&Model> {
        self.get_model(name)
            .ok_or_else(|| SchemaError::unknown_model(name))
    }

    /// Check if a model is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Get all model names.
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(|s| s.as_str())
    }

    /// Merge another schema into this one.
    pub fn merge(&mut self, other: Schema) {
        self.models.extend(other.models);
    }

    /// Parse a registry from TOML (`[[models]]` tables).
    pub fn from_toml_str(content: &str) -> SchemaResult<Self> {
        toml::from_str(content).map_err(|e| SchemaError::TomlError { source: e })
    }

    /// Parse a registry from JSON.
    pub fn from_json_str(content: &str) -> SchemaResult<Self> {
        serde_json::from_str(content).map_err(|e| SchemaError::JsonError { source: e })
    }

    /// Load a registry file; `.json` files are read as JSON, anything else as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SchemaError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        let schema = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            _ => Self::from_toml_str(&content)?,
        };
        tracing::debug!(
            path = %path.display(),
            models = schema.models.len(),
            "Loaded content-type registry"
        );
        Ok(schema)
    }
}

mod model_list {
    use indexmap::IndexMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use smol_str::SmolStr;

    use crate::ast::Model;

    pub fn serialize<S: Serializer>(
        models: &IndexMap<SmolStr, Model>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let list: Vec<&Model> = models.values().collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<IndexMap<SmolStr, Model>, D::Error> {
        let list = Vec::<Model>::deserialize(deserializer)?;
        Ok(list.into_iter().map(|m| (m.name.clone(), m)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Field, ScalarType};

    #[test]
    fn test_schema_models() {
        let schema = Schema::new()
            .with_model(Model::new("Customer").with_field(Field::scalar("name", ScalarType::String)))
            .with_model(Model::new("Part"));

        assert!(schema.contains("Customer"));
        assert!(!schema.contains("Order"));
        assert_eq!(schema.model_names().collect::<Vec<_>>(), vec!["Customer", "Part"]);
        assert!(schema.model("Order").is_err());
    }

    #[test]
    fn test_schema_merge() {
        let mut schema = Schema::new().with_model(Model::new("Customer"));
        schema.merge(Schema::new().with_model(Model::new("Part")));
        assert_eq!(schema.models.len(), 2);
    }

    #[test]
    fn test_schema_from_toml() {
        let schema = Schema::from_toml_str(
            r#"
            [[models]]
            name = "Part"

            [[models.fields]]
            name = "name"
            scalar = "String"

            [[models.fields]]
            name = "material"
            scalar = "Int"
            choices = [
                { value = "1", label = "wood" },
                { value = "2", label = "steel" },
            ]

            [[models]]
            name = "Product"

            [[models.fields]]
            name = "parts"
            relation = "Part"
            modifier = "list"
            "#,
        )
        .unwrap();

        let part = schema.get_model("Part").unwrap();
        assert_eq!(part.get_field("material").unwrap().choices.len(), 2);
        let product = schema.get_model("Product").unwrap();
        assert!(product.get_field("parts").unwrap().is_list());
    }

    #[test]
    fn test_schema_from_json() {
        let schema = Schema::from_json_str(
            r#"{"models": [{"name": "Customer", "fields": [{"name": "name", "scalar": "String"}]}]}"#,
        )
        .unwrap();
        assert!(schema.get_model("Customer").unwrap().get_field("name").is_some());
    }

    #[test]
    fn test_schema_from_file_missing() {
        let err = Schema::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, SchemaError::IoError { .. }));
    }

    #[test]
    fn test_schema_from_file_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        std::fs::write(&path, r#"{"models": [{"name": "Part", "fields": []}]}"#).unwrap();

        let schema = Schema::from_file(&path).unwrap();
        assert!(schema.contains("Part"));
    }
}
