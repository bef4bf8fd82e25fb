//! Error types for filter operations with actionable messages.
//!
//! Two families of errors live here:
//! - [`QueryError`]: a single failure of a service or store call, carrying an
//!   [`ErrorCode`], context and suggestions.
//! - [`ValidationErrors`]: the batch produced when validating a clause list.
//!   Validation never stops at the first problem, so editors can show every
//!   mistake in one round trip.
//!
//! # Error Codes
//!
//! Error codes follow a pattern: S{category}{number}
//! - 1xxx: Filter errors (not found, invalid clauses, unknown content type)
//! - 2xxx: Access errors
//! - 3xxx: Record store errors
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use sieve_query::{QueryError, ErrorCode};
//!
//! let err = QueryError::not_found("ModelFilter");
//! assert_eq!(err.code, ErrorCode::RecordNotFound);
//! assert!(err.to_string().starts_with("[S1001]"));
//! ```

use std::fmt;

use sieve_schema::{ScalarType, SchemaError};
use thiserror::Error;

/// Result type for filter operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Filter errors (1xxx)
    /// Record not found (S1001).
    RecordNotFound = 1001,
    /// Clause list failed validation (S1002).
    InvalidFilter = 1002,
    /// Target model is not registered (S1003).
    UnknownContentType = 1003,
    /// Field path did not resolve (S1004).
    UnknownField = 1004,

    // Access errors (2xxx)
    /// Action not permitted (S2001).
    PermissionDenied = 2001,

    // Store errors (3xxx)
    /// Record store failure (S3001).
    StoreError = 3001,

    // Configuration errors (7xxx)
    /// Invalid configuration (S7001).
    InvalidConfiguration = 7001,

    // Internal errors (9xxx)
    /// Internal error (S9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "S1001").
    pub fn code(&self) -> String {
        format!("S{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RecordNotFound => "Record not found",
            Self::InvalidFilter => "Invalid filter",
            Self::UnknownContentType => "Unknown content type",
            Self::UnknownField => "Unknown field",
            Self::PermissionDenied => "Permission denied",
            Self::StoreError => "Record store error",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The model involved.
    pub model: Option<String>,
    /// The field involved.
    pub field: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

/// A failed filter operation.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// Validation batch, for [`ErrorCode::InvalidFilter`].
    pub validation: Option<ValidationErrors>,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            validation: None,
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.context.model = Some(model.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create a not found error.
    ///
    /// Also used for records the caller is not allowed to see, so that
    /// existence is never revealed.
    pub fn not_found(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("No {} record found matching the query", model),
        )
        .with_model(&model)
        .with_suggestion(format!("Verify the {} exists and is visible to you", model))
    }

    /// Create an unknown content type error.
    pub fn unknown_content_type(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::UnknownContentType,
            format!("Content type '{}' is not registered", model),
        )
        .with_model(&model)
        .with_suggestion("Register the model in the content-type registry")
    }

    /// Create a permission denied error.
    pub fn permission_denied(action: impl fmt::Display, model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::PermissionDenied,
            format!("Not allowed to {} {}", action, model),
        )
        .with_model(&model)
    }

    /// Wrap a validation batch.
    pub fn invalid_filter(errors: ValidationErrors) -> Self {
        let mut err = Self::new(
            ErrorCode::InvalidFilter,
            format!("Filter failed validation with {} error(s)", errors.len()),
        )
        .with_help("Fix the listed clauses and submit the filter again");
        err.validation = Some(errors);
        err
    }

    /// Create a record store error.
    pub fn store(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::StoreError, format!("Record store error: {}", message))
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
            .with_help("This is likely a bug in Sieve - please report it")
    }

    // ============== Error Checks ==============

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::RecordNotFound
    }

    /// Check if this is a validation failure.
    pub fn is_invalid_filter(&self) -> bool {
        self.code == ErrorCode::InvalidFilter
    }

    /// Check if this is a permission error.
    pub fn is_permission_denied(&self) -> bool {
        self.code == ErrorCode::PermissionDenied
    }

    /// The validation batch, when this error wraps one.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        self.validation.as_ref()
    }

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref model) = self.context.model {
            output.push_str(&format!("  → Model: {}\n", model));
        }
        if let Some(ref field) = self.context.field {
            output.push_str(&format!("  → Field: {}\n", field));
        }

        if let Some(ref batch) = self.validation {
            output.push_str("\nProblems:\n");
            for error in batch.iter() {
                output.push_str(&format!("  - {}\n", error));
            }
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion.text));
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

impl From<SchemaError> for QueryError {
    fn from(err: SchemaError) -> Self {
        match &err {
            SchemaError::UnknownModel { model } => {
                Self::unknown_content_type(model.clone()).with_source(err)
            }
            SchemaError::UnknownField { model, path, .. }
            | SchemaError::InvalidPath { model, path, .. } => {
                let (model, path) = (model.clone(), path.clone());
                Self::new(ErrorCode::UnknownField, err.to_string())
                    .with_model(model)
                    .with_field(path)
                    .with_source(err)
            }
            SchemaError::ConfigError { .. } | SchemaError::TomlError { .. } => {
                Self::new(ErrorCode::InvalidConfiguration, err.to_string()).with_source(err)
            }
            _ => Self::internal(err.to_string()).with_source(err),
        }
    }
}

// ============== Validation ==============

/// Which input of a clause an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseInput {
    /// The field path.
    Field,
    /// The operator token.
    Operator,
    /// The raw value.
    Value,
}

impl ClauseInput {
    /// Input name as used by editing forms.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Operator => "operator",
            Self::Value => "value",
        }
    }
}

/// Why a single clause is invalid.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClauseErrorKind {
    /// The field path did not resolve, or is not exposed for filtering.
    #[error("Unknown field '{field}': {reason}")]
    UnknownField { field: String, reason: String },

    /// No operator was given.
    #[error("This field is required.")]
    OperatorRequired,

    /// The operator is not legal for the field's category.
    #[error("Operator '{operator}' is not allowed for field '{field}'.")]
    OperatorNotAllowed { operator: String, field: String },

    /// The operator needs a value and none was given.
    #[error("This field is required.")]
    ValueRequired,

    /// The value did not convert with the field's native parser.
    #[error("Value is not valid for field ({field_type}): {message}")]
    InvalidValue {
        field_type: ScalarType,
        message: String,
    },
}

impl ClauseErrorKind {
    /// The clause input this kind of error is attached to.
    pub fn input(&self) -> ClauseInput {
        match self {
            Self::UnknownField { .. } => ClauseInput::Field,
            Self::OperatorRequired | Self::OperatorNotAllowed { .. } => ClauseInput::Operator,
            Self::ValueRequired | Self::InvalidValue { .. } => ClauseInput::Value,
        }
    }
}

/// An error tied to one clause of a filter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("clause {index} ({}): {kind}", .kind.input().as_str())]
pub struct ClauseError {
    /// Position of the clause in the submitted list.
    pub index: usize,
    /// What went wrong.
    pub kind: ClauseErrorKind,
}

impl ClauseError {
    /// Create a clause error.
    pub fn new(index: usize, kind: ClauseErrorKind) -> Self {
        Self { index, kind }
    }

    /// The clause input the error is attached to.
    pub fn input(&self) -> ClauseInput {
        self.kind.input()
    }
}

/// A structural problem with the clause list as a whole.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceError {
    /// Nothing left after deletions.
    #[error("At least one field filter is required.")]
    AtLeastOneRequired,
    /// The list starts with an OR separator.
    #[error("First field filter cannot be an OR separator.")]
    LeadingSeparator,
    /// The list ends with an OR separator.
    #[error("Last field filter cannot be an OR separator.")]
    TrailingSeparator,
    /// Two OR separators are adjacent.
    #[error("Cannot have consecutive OR separators.")]
    ConsecutiveSeparators,
}

/// Any validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// A single clause is invalid.
    #[error(transparent)]
    Clause(#[from] ClauseError),
    /// The clause list is malformed.
    #[error(transparent)]
    Sequence(#[from] SequenceError),
}

impl FilterError {
    /// Clause index, when the error belongs to one clause.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Clause(e) => Some(e.index),
            Self::Sequence(_) => None,
        }
    }
}

/// Ordered batch of validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FilterError>,
}

impl ValidationErrors {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error to the batch.
    pub fn push(&mut self, error: impl Into<FilterError>) {
        self.errors.push(error.into());
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterate over the errors in the order they were found.
    pub fn iter(&self) -> impl Iterator<Item = &FilterError> {
        self.errors.iter()
    }

    /// Errors attached to one clause.
    pub fn for_clause(&self, index: usize) -> impl Iterator<Item = &ClauseError> {
        self.errors.iter().filter_map(move |e| match e {
            FilterError::Clause(c) if c.index == index => Some(c),
            _ => None,
        })
    }

    /// The structural error, if any.
    pub fn sequence(&self) -> Option<SequenceError> {
        self.errors.iter().find_map(|e| match e {
            FilterError::Sequence(s) => Some(*s),
            FilterError::Clause(_) => None,
        })
    }

    /// Consume the batch.
    pub fn into_vec(self) -> Vec<FilterError> {
        self.errors
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationErrors> for QueryError {
    fn from(errors: ValidationErrors) -> Self {
        Self::invalid_filter(errors)
    }
}
