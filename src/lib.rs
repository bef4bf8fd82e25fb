//! # Sieve
//!
//! Saved, shareable query filters for administrative list views.
//!
//! Sieve provides:
//! - A content-type registry describing the models filters can target
//! - Validation of user-authored field/operator/value clauses
//! - Compilation of clause lists into AND/OR filter expressions
//! - Ownership and permission rules for who may see, edit and apply a filter
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sieve::prelude::*;
//!
//! let config = SieveConfig::from_file("sieve.toml")?;
//! let schema = Arc::new(Schema::from_file("models.toml")?);
//!
//! let service = FilterService::from_config(
//!     &config,
//!     schema,
//!     Arc::new(StaticPermissions::new()),
//!     Arc::new(MemoryRepository::new()),
//!     Arc::new(MemoryStore::new()),
//! );
//!
//! let user = User::staff(UserId(1));
//! let draft = FilterDraft::new([Clause::new("name", "exact", "Wile E. Coyote")]).named("Coyote");
//! let id = service.create(&user, "Customer", draft).await?;
//! let applied = service.apply(&user, "Customer", id).await?;
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Content-type registry, field metadata and configuration.
pub mod schema {
    pub use sieve_schema::*;
}

/// Validation, compilation, access control and the filter service.
pub mod query {
    pub use sieve_query::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::query::prelude::*;
    pub use crate::query::{
        MemoryRepository, MemoryStore, StaticObjectPermissions, StaticPermissions,
    };
    pub use crate::schema::{AccessConfig, Field, Model, ScalarType, Schema, SieveConfig};
}

// Re-export key types at the crate root
pub use query::{Filter, FilterService, QueryError, QueryResult};
pub use schema::{Schema, SchemaError};
