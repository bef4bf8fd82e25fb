//! The record store that compiled filters run against.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use smol_str::SmolStr;
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::filter::Filter;

/// Row member that identifies a record.
pub const ROW_KEY: &str = "id";

/// Executes filter expressions against a model's rows.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Rows of `model` matching `filter`, each record at most once.
    async fn filter(&self, model: &str, filter: &Filter) -> QueryResult<Vec<Value>>;
}

/// In-memory rows keyed by model name.
///
/// Relations are nested objects, multi-valued relations nested arrays. A row's
/// identity is its `id` member; rows without one are always distinct.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<SmolStr, Vec<Value>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row to `model`.
    pub fn insert(&self, model: impl Into<SmolStr>, row: Value) -> &Self {
        self.rows.write().entry(model.into()).or_default().push(row);
        self
    }

    /// Add many rows to `model`.
    pub fn extend(&self, model: impl Into<SmolStr>, rows: impl IntoIterator<Item = Value>) -> &Self {
        self.rows.write().entry(model.into()).or_default().extend(rows);
        self
    }

    /// Number of rows stored for `model`.
    pub fn count(&self, model: &str) -> usize {
        self.rows.read().get(model).map_or(0, Vec::len)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn filter(&self, model: &str, filter: &Filter) -> QueryResult<Vec<Value>> {
        if let Some(message) = filter.pattern_error() {
            return Err(QueryError::store(message).with_model(model));
        }

        let rows = self.rows.read();
        let Some(rows) = rows.get(model) else {
            return Ok(Vec::new());
        };

        let mut seen = HashSet::new();
        let matched: Vec<Value> = rows
            .iter()
            .filter(|row| filter.matches(row))
            .filter(|row| match row.get(ROW_KEY) {
                Some(key) if !key.is_null() => seen.insert(key.to_string()),
                _ => true,
            })
            .cloned()
            .collect();
        debug!(model, total = rows.len(), matched = matched.len(), "Filtered rows");
        Ok(matched)
    }
}
