//! Field definitions for the Sieve registry AST.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::{FieldType, ScalarType, TypeModifier};

/// One allowed value of a field with a fixed value domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// The stored value.
    pub value: String,
    /// Human readable label.
    pub label: String,
}

impl Choice {
    /// Create a new choice.
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// A field in a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name.
    pub name: SmolStr,
    /// Human readable name; derived from `name` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose_name: Option<String>,
    /// Field type.
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Type modifier (optional, list, etc.).
    #[serde(default)]
    pub modifier: TypeModifier,
    /// Declared value domain, empty when the field accepts any value.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<SmolStr>, field_type: FieldType, modifier: TypeModifier) -> Self {
        Self {
            name: name.into(),
            verbose_name: None,
            field_type,
            modifier,
            choices: vec![],
        }
    }

    /// Create a required scalar field.
    pub fn scalar(name: impl Into<SmolStr>, ty: ScalarType) -> Self {
        Self::new(name, FieldType::Scalar(ty), TypeModifier::Required)
    }

    /// Create a single-valued relation to `model`.
    pub fn relation(name: impl Into<SmolStr>, model: impl Into<SmolStr>) -> Self {
        Self::new(name, FieldType::Relation(model.into()), TypeModifier::Required)
    }

    /// Create a multi-valued relation to `model`.
    pub fn many(name: impl Into<SmolStr>, model: impl Into<SmolStr>) -> Self {
        Self::new(name, FieldType::Relation(model.into()), TypeModifier::List)
    }

    /// Get the field name as a string.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Check if the field is optional.
    pub fn is_optional(&self) -> bool {
        self.modifier.is_optional()
    }

    /// Check if the field is a list.
    pub fn is_list(&self) -> bool {
        self.modifier.is_list()
    }

    /// Check if this is a relation field.
    pub fn is_relation(&self) -> bool {
        self.field_type.is_relation()
    }

    /// The model a relation field points at.
    pub fn related_model(&self) -> Option<&str> {
        match &self.field_type {
            FieldType::Relation(model) => Some(model.as_str()),
            FieldType::Scalar(_) => None,
        }
    }

    /// Human readable name, falling back to the field name with
    /// underscores replaced by spaces.
    pub fn display_name(&self) -> String {
        match &self.verbose_name {
            Some(name) => name.clone(),
            None => self.name.replace('_', " "),
        }
    }

    /// Set the human readable name.
    pub fn with_verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = Some(name.into());
        self
    }

    /// Mark the field as nullable.
    pub fn optional(mut self) -> Self {
        self.modifier = match self.modifier {
            TypeModifier::List | TypeModifier::OptionalList => TypeModifier::OptionalList,
            _ => TypeModifier::Optional,
        };
        self
    }

    /// Declare a fixed value domain.
    pub fn with_choices(mut self, choices: impl IntoIterator<Item = Choice>) -> Self {
        self.choices = choices.into_iter().collect();
        self
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;

        match self.modifier {
            TypeModifier::Required => write!(f, " {}", self.field_type)?,
            TypeModifier::Optional => write!(f, " {}?", self.field_type)?,
            TypeModifier::List => write!(f, " {}[]", self.field_type)?,
            TypeModifier::OptionalList => write!(f, " {}[]?", self.field_type)?,
        }

        Ok(())
    }
}
