//! Persistence of stored filters.

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use smol_str::SmolStr;
use tracing::debug;

use crate::access::Scope;
use crate::error::{QueryError, QueryResult};
use crate::model_filter::{FilterId, ModelFilter, UserId};
use crate::types::ListingOrder;

/// Which filters to enumerate, and in what order.
#[derive(Debug, Clone)]
pub struct ListQuery {
    /// Visibility restriction.
    pub scope: Scope,
    /// Only filters over this model.
    pub target: Option<SmolStr>,
    /// Only filters created by this user.
    pub owner: Option<UserId>,
    /// Result ordering.
    pub order: ListingOrder,
}

impl ListQuery {
    /// Every filter in `scope`, in the default order.
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            target: None,
            owner: None,
            order: ListingOrder::default(),
        }
    }

    /// Restrict to one target model.
    pub fn for_target(mut self, target: impl Into<SmolStr>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Restrict to one owner.
    pub fn owned_by(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Use a specific ordering.
    pub fn ordered_by(mut self, order: ListingOrder) -> Self {
        self.order = order;
        self
    }

    /// Whether `filter` satisfies every restriction.
    pub fn matches(&self, filter: &ModelFilter) -> bool {
        self.scope.contains(filter)
            && self.target.as_ref().is_none_or(|t| *t == filter.target)
            && self.owner.is_none_or(|o| o == filter.owner)
    }
}

/// Storage for filters and their clauses.
///
/// Saves are whole-filter and last-write-wins.
#[async_trait]
pub trait FilterRepository: Send + Sync {
    /// Store a new filter.
    async fn insert(&self, filter: ModelFilter) -> QueryResult<FilterId>;

    /// Fetch a filter by id.
    async fn get(&self, id: FilterId) -> QueryResult<Option<ModelFilter>>;

    /// Replace a stored filter.
    async fn update(&self, filter: ModelFilter) -> QueryResult<()>;

    /// Remove a filter. Returns `false` when it was already gone.
    async fn delete(&self, id: FilterId) -> QueryResult<bool>;

    /// Enumerate filters.
    async fn list(&self, query: &ListQuery) -> QueryResult<Vec<ModelFilter>>;

    /// Fetch a filter only if `query` would list it.
    async fn find(&self, query: &ListQuery, id: FilterId) -> QueryResult<Option<ModelFilter>> {
        Ok(self.get(id).await?.filter(|filter| query.matches(filter)))
    }
}

/// In-memory repository.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    filters: RwLock<IndexMap<FilterId, ModelFilter>>,
}

impl MemoryRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored filters.
    pub fn len(&self) -> usize {
        self.filters.read().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.filters.read().is_empty()
    }
}

#[async_trait]
impl FilterRepository for MemoryRepository {
    async fn insert(&self, filter: ModelFilter) -> QueryResult<FilterId> {
        let id = filter.id;
        let mut filters = self.filters.write();
        if filters.contains_key(&id) {
            return Err(QueryError::internal(format!("filter {id} already exists")));
        }
        filters.insert(id, filter);
        debug!(filter_id = %id, "Stored filter");
        Ok(id)
    }

    async fn get(&self, id: FilterId) -> QueryResult<Option<ModelFilter>> {
        Ok(self.filters.read().get(&id).cloned())
    }

    async fn update(&self, filter: ModelFilter) -> QueryResult<()> {
        let mut filters = self.filters.write();
        match filters.get_mut(&filter.id) {
            Some(stored) => {
                debug!(filter_id = %filter.id, "Replaced filter");
                *stored = filter;
                Ok(())
            }
            None => Err(QueryError::not_found("ModelFilter")),
        }
    }

    async fn delete(&self, id: FilterId) -> QueryResult<bool> {
        let removed = self.filters.write().shift_remove(&id).is_some();
        debug!(filter_id = %id, removed, "Deleted filter");
        Ok(removed)
    }

    async fn list(&self, query: &ListQuery) -> QueryResult<Vec<ModelFilter>> {
        let mut filters: Vec<ModelFilter> = self
            .filters
            .read()
            .values()
            .filter(|filter| query.matches(filter))
            .cloned()
            .collect();
        query.order.sort(&mut filters);
        Ok(filters)
    }
}
