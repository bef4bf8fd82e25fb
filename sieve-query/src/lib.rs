//! # sieve-query
//!
//! Clause validation, filter compilation and access control for Sieve.
//!
//! This crate provides:
//! - The operator catalog: which comparisons each kind of field allows
//! - Clause and clause-sequence validation with batched errors
//! - Compilation of clause lists into boolean [`Filter`] expressions
//! - Ownership and permission checks for stored filters
//! - Filter repository and record store boundaries, with in-memory versions
//! - [`FilterService`], which ties these together for authoring and listing
//!
//! ## Compiling Clauses
//!
//! Clauses between OR separators are ANDed; the groups are ORed:
//!
//! ```rust
//! use sieve_query::{compile_filter, Clause, ModelFilter, OperatorCatalog, UserId};
//! use sieve_schema::{Field, Model, ScalarType, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::new().with_model(
//!     Model::new("Customer")
//!         .with_field(Field::scalar("name", ScalarType::String))
//!         .with_field(Field::scalar("membership", ScalarType::String)),
//! );
//!
//! let filter = ModelFilter::new("Customer", UserId(1)).with_clauses([
//!     Clause::new("name", "exact", "Wile E. Coyote"),
//!     Clause::or(),
//!     Clause::new("membership", "exact", "gold"),
//! ]);
//!
//! let compiled = compile_filter(&schema, &filter, &OperatorCatalog::new()).unwrap();
//! assert!(compiled.matches(&json!({"name": "Wile E. Coyote", "membership": "basic"})));
//! assert!(compiled.matches(&json!({"name": "Road Runner", "membership": "gold"})));
//! assert!(!compiled.matches(&json!({"name": "Road Runner", "membership": "basic"})));
//!
//! let (sql, params) = compiled.to_sql(0);
//! assert_eq!(sql, "(name = $1 OR membership = $2)");
//! assert_eq!(params.len(), 2);
//! ```
//!
//! ## Validating Clauses
//!
//! ```rust
//! use sieve_query::{validate_clauses, Clause, ClauseRequest, OperatorCatalog, SequenceError};
//! use sieve_schema::{Field, Model, ScalarType, Schema};
//!
//! let schema = Schema::new()
//!     .with_model(Model::new("Customer").with_field(Field::scalar("age", ScalarType::Int)));
//!
//! let requests: Vec<ClauseRequest> = vec![
//!     Clause::new("age", "contains", "3").into(),
//!     Clause::or().into(),
//! ];
//! let errors = validate_clauses(&schema, "Customer", &requests, &OperatorCatalog::new()).unwrap_err();
//! assert_eq!(errors.len(), 2);
//! assert_eq!(errors.sequence(), Some(SequenceError::TrailingSeparator));
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use sieve_query::{QueryError, ErrorCode};
//!
//! let err = QueryError::not_found("ModelFilter");
//! assert_eq!(err.code, ErrorCode::RecordNotFound);
//! ```

pub mod access;
pub mod clause;
pub mod compiler;
pub mod error;
pub mod field_data;
pub mod filter;
pub mod logging;
pub mod model_filter;
pub mod operator;
pub mod repository;
pub mod sequence;
pub mod service;
pub mod store;
pub mod types;

pub use access::{
    AccessControl, Action, FILTER_RESOURCE, ObjectPermissionChecker, PermissionService, Scope,
    StaticObjectPermissions, StaticPermissions, User,
};
pub use clause::{ClauseRequest, ValidatedClause, validate_clause, validate_clauses, validate_stored};
pub use compiler::{compile, compile_filter};
pub use error::{
    ClauseError, ClauseErrorKind, ClauseInput, ErrorCode, ErrorContext, FilterError, QueryError,
    QueryResult, SequenceError, Suggestion, ValidationErrors,
};
pub use field_data::{FieldData, ValueChoice, field_data};
pub use filter::Filter;
pub use model_filter::{Clause, ClauseField, FilterId, ModelFilter, UserId};
pub use operator::{Operator, OperatorCatalog, OperatorChoice};
pub use repository::{FilterRepository, ListQuery, MemoryRepository};
pub use sequence::{SequenceItem, validate_sequence};
pub use service::{AppliedFilter, FilterDraft, FilterLookup, FilterService, ListOptions};
pub use store::{MemoryStore, RecordStore};
pub use types::{ListingOrder, OrderByField};

// Re-export logging utilities
pub use logging::{LogFormat, LogSettings, init as init_logging, init_debug, is_debug_enabled};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::access::{AccessControl, Action, PermissionService, User};
    pub use crate::clause::ClauseRequest;
    pub use crate::error::{QueryError, QueryResult, ValidationErrors};
    pub use crate::filter::Filter;
    pub use crate::model_filter::{Clause, FilterId, ModelFilter, UserId};
    pub use crate::operator::{Operator, OperatorCatalog};
    pub use crate::repository::FilterRepository;
    pub use crate::service::{FilterDraft, FilterService};
    pub use crate::store::RecordStore;
}
