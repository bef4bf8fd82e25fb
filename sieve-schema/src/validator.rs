//! Registry validation.
//!
//! A registry is checked once, when it is loaded, so that filters can trust
//! every relation to point somewhere and every declared filter path to resolve:
//! - Relation targets name registered models
//! - Field names can be told apart from paths and the OR separator
//! - Declared choices are unique
//! - Declared filter fields resolve to scalar fields

use std::collections::HashSet;

use crate::ast::*;
use crate::error::{SchemaError, SchemaResult};
use crate::resolver::LOOKUP_SEP;

/// Field value reserved for the OR separator clause.
pub const OR_SENTINEL: &str = "_OR";

/// Registry validator collecting every problem it finds.
#[derive(Debug)]
pub struct Validator {
    errors: Vec<SchemaError>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Create a new validator.
    pub fn new() -> Self {
        Self { errors: vec![] }
    }

    /// Validate a registry and return it unchanged, or every error found.
    pub fn validate(&mut self, schema: Schema) -> SchemaResult<Schema> {
        self.errors.clear();

        for model in schema.models.values() {
            self.validate_model(model, &schema);
        }

        if self.errors.is_empty() {
            tracing::debug!(models = schema.models.len(), "Registry validated");
            Ok(schema)
        } else {
            tracing::warn!(errors = self.errors.len(), "Registry validation failed");
            Err(SchemaError::ValidationFailed {
                count: self.errors.len(),
                errors: std::mem::take(&mut self.errors),
            })
        }
    }

    fn validate_model(&mut self, model: &Model, schema: &Schema) {
        if model.name.is_empty() {
            self.errors
                .push(SchemaError::invalid_model("", "model name cannot be empty"));
        }
        if model.fields.is_empty() {
            self.errors.push(SchemaError::invalid_model(
                model.name(),
                "model must declare at least one field",
            ));
        }

        for field in model.fields.values() {
            self.validate_field(field, model.name(), schema);
        }

        let mut seen = HashSet::new();
        for filter_field in &model.filter_fields {
            if !seen.insert(filter_field.path.as_str()) {
                self.errors
                    .push(SchemaError::duplicate("filter field", filter_field.path.as_str()));
            }
            if let Err(e) = schema.resolve(model.name(), &filter_field.path) {
                self.errors.push(e);
            }
        }
    }

    fn validate_field(&mut self, field: &Field, model_name: &str, schema: &Schema) {
        let name = field.name();
        if name.is_empty() {
            self.errors.push(SchemaError::invalid_field(
                model_name,
                name,
                "field name cannot be empty",
            ));
        } else if name.contains(LOOKUP_SEP) {
            self.errors.push(SchemaError::invalid_field(
                model_name,
                name,
                format!("field name cannot contain `{}`", LOOKUP_SEP),
            ));
        } else if name == OR_SENTINEL {
            self.errors.push(SchemaError::invalid_field(
                model_name,
                name,
                format!("`{}` is reserved for the OR separator", OR_SENTINEL),
            ));
        }

        if let Some(target) = field.related_model() {
            if !schema.contains(target) {
                self.errors.push(SchemaError::invalid_field(
                    model_name,
                    name,
                    format!("relation to unknown model `{}`", target),
                ));
            }
            if !field.choices.is_empty() {
                self.errors.push(SchemaError::invalid_field(
                    model_name,
                    name,
                    "relations cannot declare choices",
                ));
            }
        }

        let mut seen = HashSet::new();
        for choice in &field.choices {
            if !seen.insert(choice.value.as_str()) {
                self.errors.push(SchemaError::duplicate(
                    "choice",
                    format!("{}.{} = {}", model_name, name, choice.value),
                ));
            }
        }
    }
}

/// Validate a TOML registry in one step.
pub fn validate_schema(input: &str) -> SchemaResult<Schema> {
    let schema = Schema::from_toml_str(input)?;
    Validator::new().validate(schema)
}
