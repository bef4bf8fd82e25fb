//! Filter authoring, listing and application.
//!
//! [`FilterService`] ties the registry, the operator catalog, access control,
//! the filter repository and the record store together. Every operation takes
//! the requesting [`User`] and the target model explicitly.
//!
//! Denials on an existing filter are reported as not-found so a filter's
//! existence never leaks to users who may not see it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sieve_schema::{Schema, SieveConfig};
use smol_str::SmolStr;
use tracing::{debug, info, warn};

use crate::access::{AccessControl, Action, PermissionService, Scope, User};
use crate::clause::{validate_clauses, ClauseRequest, ValidatedClause};
use crate::compiler::compile_filter;
use crate::error::{QueryError, QueryResult};
use crate::field_data::{field_data, FieldData};
use crate::model_filter::{Clause, FilterId, ModelFilter};
use crate::operator::OperatorCatalog;
use crate::repository::{FilterRepository, ListQuery};
use crate::store::RecordStore;
use crate::types::ListingOrder;

/// The editable part of a filter, as submitted by an editing form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDraft {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Free text.
    #[serde(default)]
    pub description: Option<String>,
    /// Submitted clauses, including ones marked for deletion.
    #[serde(default)]
    pub clauses: Vec<ClauseRequest>,
    /// Delete the filter after its first application.
    #[serde(default)]
    pub ephemeral: bool,
}

impl FilterDraft {
    /// A draft with the given clauses.
    pub fn new(clauses: impl IntoIterator<Item = impl Into<ClauseRequest>>) -> Self {
        Self {
            clauses: clauses.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Set the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the description.
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Discard the filter after it is first applied.
    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }
}

/// Restrictions for the administrative listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Only filters over this model.
    pub target: Option<SmolStr>,
    /// Only filters the requester created.
    pub owned_only: bool,
}

/// One entry of a list view's filter menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterLookup {
    /// Filter to apply.
    pub id: FilterId,
    /// Display name; suffixed with ` *` when the requester is not the owner.
    pub display: String,
}

/// The outcome of applying a filter to a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedFilter {
    /// The filter as it was applied.
    pub filter: ModelFilter,
    /// Matching rows, without duplicates.
    pub rows: Vec<Value>,
    /// Whether the list view should offer to edit the filter.
    pub can_change: bool,
    /// Whether the filter was deleted after this application.
    pub discarded: bool,
}

/// Orchestrates filter requests.
#[derive(Clone)]
pub struct FilterService {
    schema: Arc<Schema>,
    catalog: OperatorCatalog,
    access: AccessControl,
    order: ListingOrder,
    repository: Arc<dyn FilterRepository>,
    store: Arc<dyn RecordStore>,
}

impl std::fmt::Debug for FilterService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterService")
            .field("models", &self.schema.model_names().collect::<Vec<_>>())
            .field("access", &self.access)
            .field("order", &self.order)
            .finish()
    }
}

impl FilterService {
    /// Create a service with the standard catalog and default ordering.
    pub fn new(
        schema: Arc<Schema>,
        access: AccessControl,
        repository: Arc<dyn FilterRepository>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            schema,
            catalog: OperatorCatalog::default(),
            access,
            order: ListingOrder::default(),
            repository,
            store,
        }
    }

    /// Create a service configured from `sieve.toml` settings.
    pub fn from_config(
        config: &SieveConfig,
        schema: Arc<Schema>,
        permissions: Arc<dyn PermissionService>,
        repository: Arc<dyn FilterRepository>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        let access = AccessControl::new(config.access, permissions);
        Self::new(schema, access, repository, store).with_order(ListingOrder::from_config(&config.listing))
    }

    /// Use a custom operator catalog.
    pub fn with_catalog(mut self, catalog: OperatorCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Use a custom listing order.
    pub fn with_order(mut self, order: ListingOrder) -> Self {
        self.order = order;
        self
    }

    /// The access evaluator.
    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    /// The content-type registry.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Validate a draft and store it as a new filter over `target`.
    pub async fn create(&self, user: &User, target: &str, draft: FilterDraft) -> QueryResult<FilterId> {
        if !self.schema.contains(target) {
            return Err(QueryError::unknown_content_type(target));
        }
        if !self.access.can_add(user, Some(target)) {
            return Err(QueryError::permission_denied("add", target));
        }

        let clauses = self.validate(target, &draft.clauses)?;
        let mut filter = ModelFilter::new(target, user.id).with_clauses(clauses);
        filter.name = draft.name;
        filter.description = draft.description;
        filter.ephemeral = draft.ephemeral;

        let id = self.repository.insert(filter).await?;
        info!(filter_id = %id, model = target, user_id = %user.id, "Created filter");
        Ok(id)
    }

    /// Replace the editable part of a filter.
    ///
    /// The clause list is replaced as a whole; target, owner and creation
    /// time never change.
    pub async fn update(&self, user: &User, id: FilterId, draft: FilterDraft) -> QueryResult<ModelFilter> {
        let mut filter = self.fetch_for(user, Action::Change, id).await?;

        filter.clauses = self.validate(&filter.target, &draft.clauses)?;
        filter.name = draft.name;
        filter.description = draft.description;
        filter.ephemeral = draft.ephemeral;

        self.repository.update(filter.clone()).await?;
        info!(filter_id = %id, user_id = %user.id, "Updated filter");
        Ok(filter)
    }

    /// Delete a filter.
    pub async fn delete(&self, user: &User, id: FilterId) -> QueryResult<()> {
        self.fetch_for(user, Action::Delete, id).await?;
        if !self.repository.delete(id).await? {
            debug!(filter_id = %id, "Filter already gone");
        }
        info!(filter_id = %id, user_id = %user.id, "Deleted filter");
        Ok(())
    }

    /// Fetch a filter the user may view.
    pub async fn get(&self, user: &User, id: FilterId) -> QueryResult<ModelFilter> {
        self.fetch_for(user, Action::View, id).await
    }

    /// Whether `user` may perform `action`, on filter `id` when given.
    ///
    /// A missing filter is a plain denial.
    pub async fn check_access(&self, user: &User, action: Action, id: Option<FilterId>) -> QueryResult<bool> {
        let Some(id) = id else {
            return Ok(self.access.can(user, action, None));
        };
        Ok(self
            .repository
            .get(id)
            .await?
            .is_some_and(|filter| self.access.can(user, action, Some(&filter))))
    }

    /// The administrative listing of filters.
    ///
    /// Superusers see every filter; everyone else sees their visibility scope.
    pub async fn list(&self, user: &User, options: &ListOptions) -> QueryResult<Vec<ModelFilter>> {
        if !self.access.can_access_module(user) {
            return Err(QueryError::permission_denied(Action::View, "ModelFilter"));
        }
        let scope = if user.is_superuser {
            Scope::All
        } else {
            self.access.visibility(user)
        };

        let mut query = ListQuery::new(scope).ordered_by(self.order.clone());
        if let Some(target) = &options.target {
            query = query.for_target(target.clone());
        }
        if options.owned_only {
            query = query.owned_by(user.id);
        }
        self.repository.list(&query).await
    }

    /// The filter menu of a list view over `target`.
    ///
    /// Users without access to `target` get an empty menu.
    pub async fn lookups(&self, user: &User, target: &str) -> QueryResult<Vec<FilterLookup>> {
        if !self.access.has_model_access(user, target) {
            debug!(model = target, user_id = %user.id, "No model access, no lookups");
            return Ok(Vec::new());
        }
        let query = self.visible_query(user, target);
        let filters = self.repository.list(&query).await?;
        Ok(filters
            .into_iter()
            .map(|filter| {
                let mut display = filter.display_name();
                if !filter.is_owned_by(user.id) {
                    display.push_str(" *");
                }
                FilterLookup { id: filter.id, display }
            })
            .collect())
    }

    /// Apply filter `id` to the listing of `target`.
    ///
    /// The user needs access to `target` itself, even for their own filters.
    /// Ephemeral filters are deleted after being applied by their owner. When
    /// two applications race, the one that finds the filter already gone still
    /// succeeds.
    pub async fn apply(&self, user: &User, target: &str, id: FilterId) -> QueryResult<AppliedFilter> {
        if !self.access.has_model_access(user, target) {
            debug!(filter_id = %id, model = target, user_id = %user.id, "Access denied");
            return Err(QueryError::not_found("ModelFilter").with_model(target));
        }
        let query = self.visible_query(user, target);
        let filter = self
            .repository
            .find(&query, id)
            .await?
            .ok_or_else(|| QueryError::not_found("ModelFilter").with_model(target))?;

        let compiled = compile_filter(&self.schema, &filter, &self.catalog)?;
        let rows = self.store.filter(target, &compiled).await?;

        let discarded = filter.ephemeral && filter.is_owned_by(user.id);
        if discarded {
            match self.repository.delete(id).await {
                Ok(true) => debug!(filter_id = %id, "Discarded ephemeral filter"),
                Ok(false) => debug!(filter_id = %id, "Ephemeral filter already discarded"),
                Err(e) => warn!(filter_id = %id, error = %e, "Failed to discard ephemeral filter"),
            }
        }

        let can_change = !discarded && self.access.can_change_filter(user, &filter);
        info!(
            filter_id = %id,
            model = target,
            user_id = %user.id,
            rows = rows.len(),
            "Applied filter"
        );
        Ok(AppliedFilter {
            filter,
            rows,
            can_change,
            discarded,
        })
    }

    /// Whether list views should offer to edit `filter`.
    pub fn can_change_filter(&self, user: &User, filter: &ModelFilter) -> bool {
        self.access.can_change_filter(user, filter)
    }

    /// Authoring metadata for `target`.
    pub fn field_data(&self, target: &str) -> QueryResult<FieldData> {
        field_data(&self.schema, target, &self.catalog)
    }

    fn visible_query(&self, user: &User, target: &str) -> ListQuery {
        ListQuery::new(self.access.visibility(user))
            .for_target(target)
            .ordered_by(self.order.clone())
    }

    async fn fetch_for(&self, user: &User, action: Action, id: FilterId) -> QueryResult<ModelFilter> {
        match self.repository.get(id).await? {
            Some(filter) if self.access.can(user, action, Some(&filter)) => Ok(filter),
            Some(_) => {
                debug!(filter_id = %id, user_id = %user.id, action = %action, "Access denied");
                Err(QueryError::not_found("ModelFilter"))
            }
            None => Err(QueryError::not_found("ModelFilter")),
        }
    }

    fn validate(&self, target: &str, requests: &[ClauseRequest]) -> QueryResult<Vec<Clause>> {
        let validated = validate_clauses(&self.schema, target, requests, &self.catalog)
            .map_err(|errors| QueryError::invalid_filter(errors).with_model(target))?;
        Ok(validated.into_iter().map(ValidatedClause::into_clause).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{StaticObjectPermissions, StaticPermissions, FILTER_RESOURCE};
    use crate::error::{ErrorCode, SequenceError};
    use crate::model_filter::UserId;
    use crate::repository::MemoryRepository;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use sieve_schema::{AccessConfig, Field, Model, ScalarType};

    const ANN: UserId = UserId(1);
    const BOB: UserId = UserId(2);

    struct Fixture {
        service: FilterService,
        permissions: Arc<StaticPermissions>,
        repository: Arc<MemoryRepository>,
    }

    fn fixture(config: AccessConfig) -> Fixture {
        let schema = Schema::new().with_model(
            Model::new("Customer")
                .with_field(Field::scalar("name", ScalarType::String))
                .with_field(Field::scalar("membership", ScalarType::String)),
        );
        let store = Arc::new(MemoryStore::new());
        store.extend(
            "Customer",
            [
                json!({"name": "Wile E. Coyote", "membership": "gold"}),
                json!({"name": "Road Runner", "membership": "basic"}),
            ],
        );
        let permissions = Arc::new(StaticPermissions::new());
        for user in [ANN, BOB] {
            permissions.grant(user, "Customer", Action::View);
        }
        let repository = Arc::new(MemoryRepository::new());
        let access = AccessControl::new(config, permissions.clone())
            .with_object_permissions(Arc::new(StaticObjectPermissions::new()));
        let service = FilterService::new(Arc::new(schema), access, repository.clone(), store);
        Fixture {
            service,
            permissions,
            repository,
        }
    }

    fn coyote() -> FilterDraft {
        FilterDraft::new([Clause::new("name", "exact", "Wile E. Coyote")]).named("Coyote")
    }

    #[tokio::test]
    async fn test_create_and_apply() {
        let fx = fixture(AccessConfig::default());
        let ann = User::new(ANN);
        let id = fx.service.create(&ann, "Customer", coyote()).await.unwrap();

        let applied = fx.service.apply(&ann, "Customer", id).await.unwrap();
        assert_eq!(applied.rows, vec![json!({"name": "Wile E. Coyote", "membership": "gold"})]);
        assert!(applied.can_change);
        assert!(!applied.discarded);
        assert_eq!(fx.repository.len(), 1);
    }

    #[tokio::test]
    async fn test_create_unknown_target() {
        let fx = fixture(AccessConfig::default());
        let err = fx.service.create(&User::new(ANN), "Order", coyote()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownContentType);
        assert!(fx.repository.is_empty());
    }

    #[tokio::test]
    async fn test_create_requires_model_access() {
        let fx = fixture(AccessConfig::default());
        let err = fx.service.create(&User::new(UserId(3)), "Customer", coyote()).await.unwrap_err();
        assert!(err.is_permission_denied());
    }

    #[tokio::test]
    async fn test_create_reports_validation_batch() {
        let fx = fixture(AccessConfig::default());
        let draft = FilterDraft::new([Clause::or(), Clause::new("nickname", "exact", "x")]);
        let err = fx.service.create(&User::new(ANN), "Customer", draft).await.unwrap_err();

        let errors = err.validation_errors().unwrap();
        assert_eq!(errors.for_clause(1).count(), 1);
        assert_eq!(errors.sequence(), Some(SequenceError::LeadingSeparator));
        assert!(fx.repository.is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_clauses() {
        let fx = fixture(AccessConfig::default());
        let ann = User::new(ANN);
        let id = fx.service.create(&ann, "Customer", coyote()).await.unwrap();
        let before = fx.service.get(&ann, id).await.unwrap();

        let draft = FilterDraft::new([
            ClauseRequest::delete(Clause::new("name", "exact", "Wile E. Coyote")),
            ClauseRequest::keep(Clause::new("membership", "exact", "basic")),
        ]);
        let after = fx.service.update(&ann, id, draft).await.unwrap();
        assert_eq!(after.clauses, vec![Clause::new("membership", "exact", "basic")]);
        assert_eq!(after.name, None);
        assert_eq!(after.created, before.created);
        assert_eq!(after.owner, ANN);
    }

    #[tokio::test]
    async fn test_denials_look_like_not_found() {
        let fx = fixture(AccessConfig::default());
        let id = fx.service.create(&User::new(ANN), "Customer", coyote()).await.unwrap();
        let bob = User::new(BOB);

        assert!(fx.service.get(&bob, id).await.unwrap_err().is_not_found());
        assert!(fx.service.delete(&bob, id).await.unwrap_err().is_not_found());
        assert!(fx.service.apply(&bob, "Customer", id).await.unwrap_err().is_not_found());
        assert!(!fx.service.check_access(&bob, Action::View, Some(id)).await.unwrap());
        assert!(!fx.service.check_access(&bob, Action::View, Some(FilterId::new())).await.unwrap());
        assert!(fx.service.check_access(&bob, Action::View, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_ephemeral_filter_is_discarded_once() {
        let fx = fixture(AccessConfig::default());
        let ann = User::new(ANN);
        let id = fx.service.create(&ann, "Customer", coyote().ephemeral()).await.unwrap();

        let applied = fx.service.apply(&ann, "Customer", id).await.unwrap();
        assert!(applied.discarded);
        assert_eq!(applied.rows.len(), 1);
        assert!(fx.service.apply(&ann, "Customer", id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_ephemeral_kept_when_applied_by_non_owner() {
        let fx = fixture(AccessConfig::shared());
        fx.permissions.grant(BOB, FILTER_RESOURCE, Action::View);
        let id = fx.service.create(&User::new(ANN), "Customer", coyote().ephemeral()).await.unwrap();

        let applied = fx.service.apply(&User::new(BOB), "Customer", id).await.unwrap();
        assert!(!applied.discarded);
        assert!(!applied.can_change);
        assert_eq!(fx.repository.len(), 1);
    }

    #[tokio::test]
    async fn test_lookups_mark_shared_filters() {
        let fx = fixture(AccessConfig::shared());
        fx.permissions.grant(BOB, FILTER_RESOURCE, Action::View);
        fx.service.create(&User::new(ANN), "Customer", coyote()).await.unwrap();
        fx.service
            .create(&User::new(BOB), "Customer", coyote().named("Bob's"))
            .await
            .unwrap();

        let displays: Vec<String> = fx
            .service
            .lookups(&User::new(BOB), "Customer")
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.display)
            .collect();
        assert_eq!(displays, vec!["Bob's".to_string(), "Coyote *".to_string()]);

        let ann_sees = fx.service.lookups(&User::new(ANN), "Customer").await.unwrap();
        assert_eq!(ann_sees.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_requires_model_access() {
        let fx = fixture(AccessConfig::default());
        let ann = User::new(ANN);
        let id = fx.service.create(&ann, "Customer", coyote()).await.unwrap();

        fx.permissions.revoke(ANN, "Customer", Action::View);
        assert!(fx.service.apply(&ann, "Customer", id).await.unwrap_err().is_not_found());
        assert!(fx.service.lookups(&ann, "Customer").await.unwrap().is_empty());
        assert_eq!(fx.repository.len(), 1);
    }

    #[tokio::test]
    async fn test_filter_grant_does_not_open_model() {
        let fx = fixture(AccessConfig::shared());
        let id = fx.service.create(&User::new(ANN), "Customer", coyote()).await.unwrap();

        let eve = User::new(UserId(5));
        fx.permissions.grant(eve.id, FILTER_RESOURCE, Action::View);
        assert!(fx.service.apply(&eve, "Customer", id).await.unwrap_err().is_not_found());
        assert!(fx.service.lookups(&eve, "Customer").await.unwrap().is_empty());

        fx.permissions.grant(eve.id, "Customer", Action::View);
        assert_eq!(fx.service.apply(&eve, "Customer", id).await.unwrap().rows.len(), 1);
    }

    #[tokio::test]
    async fn test_admin_listing() {
        let fx = fixture(AccessConfig::default());
        fx.service.create(&User::new(ANN), "Customer", coyote()).await.unwrap();
        fx.service.create(&User::new(BOB), "Customer", coyote()).await.unwrap();

        assert!(fx.service.list(&User::new(ANN), &ListOptions::default()).await.is_err());

        let staff = User::staff(ANN);
        assert_eq!(fx.service.list(&staff, &ListOptions::default()).await.unwrap().len(), 1);

        let root = User::superuser(UserId(9));
        assert_eq!(fx.service.list(&root, &ListOptions::default()).await.unwrap().len(), 2);
        let mine = ListOptions {
            owned_only: true,
            ..ListOptions::default()
        };
        assert!(fx.service.list(&root, &mine).await.unwrap().is_empty());
    }
}
