//! # sieve-schema
//!
//! Content-type registry and field metadata for Sieve filters.
//!
//! This crate provides:
//! - Registry AST types: models, fields, choices and relations
//! - Field path resolution across relations (`parts__material`)
//! - Native conversion of raw clause values into typed [`FieldValue`]s
//! - Registry validation
//! - Configuration parser for `sieve.toml` files
//!
//! ## Example
//!
//! ```rust,ignore
//! use sieve_schema::{validate_schema, SieveConfig};
//!
//! let schema = validate_schema(r#"
//!     [[models]]
//!     name = "Customer"
//!
//!     [[models.fields]]
//!     name = "name"
//!     scalar = "String"
//! "#)?;
//!
//! let field = schema.resolve("Customer", "name")?;
//! let value = field.convert("Wile E. Coyote")?;
//!
//! let config = SieveConfig::from_file("sieve.toml")?;
//! ```

pub mod ast;
pub mod config;
pub mod convert;
pub mod error;
pub mod resolver;
pub mod validator;
pub mod value;

pub use ast::*;
pub use config::{AccessConfig, SieveConfig};
pub use convert::convert;
pub use error::{ConversionError, SchemaError, SchemaResult};
pub use resolver::{FieldDescriptor, LOOKUP_SEP, resolve};
pub use validator::{OR_SENTINEL, Validator, validate_schema};
pub use value::FieldValue;
