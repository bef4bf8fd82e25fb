//! Abstract Syntax Tree (AST) types for the content-type registry.
//!
//! A [`Schema`] is the set of models filters can target. Each [`Model`] owns
//! an ordered map of [`Field`]s; relation fields point at other models by name,
//! which is what lets a field path cross relations.

mod field;
mod model;
mod schema;
mod types;

pub use field::*;
pub use model::*;
pub use schema::*;
pub use types::*;
