//! Error types for registry loading, path resolution and value conversion.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

use crate::ast::ScalarType;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// A raw value could not be converted to a field's native type.
///
/// `message` is the native parser's wording and is shown to users verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(sieve::schema::conversion))]
pub struct ConversionError {
    /// The kind the value was converted to.
    pub field_type: ScalarType,
    /// Human readable reason.
    pub message: String,
}

impl ConversionError {
    /// Create a conversion error.
    pub fn new(field_type: ScalarType, message: impl Into<String>) -> Self {
        Self {
            field_type,
            message: message.into(),
        }
    }
}

/// Errors that can occur while loading, validating or querying the registry.
#[derive(Error, Debug, Diagnostic)]
pub enum SchemaError {
    /// Error reading a file.
    #[error("failed to read file: {path}")]
    #[diagnostic(code(sieve::schema::io_error))]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// No model registered under the name.
    #[error("unknown model `{model}`")]
    #[diagnostic(code(sieve::schema::unknown_model))]
    UnknownModel { model: String },

    /// A path segment does not name a field.
    #[error("unknown field `{segment}` in path `{path}` on model `{model}`")]
    #[diagnostic(
        code(sieve::schema::unknown_field),
        help("field paths cross relations with `__`, e.g. `parts__name`")
    )]
    UnknownField {
        model: String,
        path: String,
        segment: String,
    },

    /// A non-terminal path segment is not a relation, or the terminal one is.
    #[error("field `{model}.{field}` cannot be used in path `{path}`: {message}")]
    #[diagnostic(code(sieve::schema::invalid_path))]
    InvalidPath {
        model: String,
        field: String,
        path: String,
        message: String,
    },

    /// A raw value did not convert.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Conversion(#[from] ConversionError),

    /// Invalid model definition.
    #[error("invalid model `{name}`: {message}")]
    #[diagnostic(code(sieve::schema::invalid_model))]
    InvalidModel { name: String, message: String },

    /// Invalid field definition.
    #[error("invalid field `{model}.{field}`: {message}")]
    #[diagnostic(code(sieve::schema::invalid_field))]
    InvalidField {
        model: String,
        field: String,
        message: String,
    },

    /// Duplicate definition.
    #[error("duplicate {kind} `{name}`")]
    #[diagnostic(code(sieve::schema::duplicate))]
    Duplicate { kind: String, name: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    #[diagnostic(code(sieve::schema::config_error))]
    ConfigError { message: String },

    /// TOML parsing error.
    #[error("failed to parse TOML")]
    #[diagnostic(code(sieve::schema::toml_error))]
    TomlError {
        #[source]
        source: toml::de::Error,
    },

    /// JSON parsing error.
    #[error("failed to parse JSON")]
    #[diagnostic(code(sieve::schema::json_error))]
    JsonError {
        #[source]
        source: serde_json::Error,
    },

    /// Validation error with multiple issues.
    #[error("registry validation failed with {count} error(s)")]
    #[diagnostic(code(sieve::schema::validation_failed))]
    ValidationFailed {
        count: usize,
        #[related]
        errors: Vec<SchemaError>,
    },
}

impl SchemaError {
    /// Create an unknown model error.
    pub fn unknown_model(model: impl Into<String>) -> Self {
        Self::UnknownModel {
            model: model.into(),
        }
    }

    /// Create an unknown field error.
    pub fn unknown_field(
        model: impl Into<String>,
        path: impl Into<String>,
        segment: impl Into<String>,
    ) -> Self {
        Self::UnknownField {
            model: model.into(),
            path: path.into(),
            segment: segment.into(),
        }
    }

    /// Create an invalid path error.
    pub fn invalid_path(
        model: impl Into<String>,
        field: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidPath {
            model: model.into(),
            field: field.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid model error.
    pub fn invalid_model(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidModel {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid field error.
    pub fn invalid_field(
        model: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            model: model.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate definition error.
    pub fn duplicate(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Whether this error means a field path did not resolve.
    pub fn is_path_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownField { .. } | Self::InvalidPath { .. } | Self::UnknownModel { .. }
        )
    }
}
