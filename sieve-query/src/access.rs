//! Access control for stored filters.
//!
//! Decisions combine three sources, in this order: ownership, the per-action
//! owner-only toggles of [`AccessConfig`], and grants from the permission
//! services. Class-level grants come from a [`PermissionService`]; when
//! object-level permissions are enabled, an [`ObjectPermissionChecker`] can
//! also grant access to individual filters.
//!
//! A denial is an ordinary `false`, never an error.
//!
//! ```rust
//! use std::sync::Arc;
//! use sieve_query::access::{AccessControl, Action, StaticPermissions, User};
//! use sieve_query::model_filter::{ModelFilter, UserId};
//! use sieve_schema::AccessConfig;
//!
//! let permissions = Arc::new(StaticPermissions::new());
//! permissions.grant(UserId(1), "Customer", Action::View);
//!
//! let access = AccessControl::new(AccessConfig::default(), permissions);
//! let owner = User::new(UserId(1));
//! let filter = ModelFilter::new("Customer", owner.id);
//!
//! assert!(access.can(&owner, Action::Change, Some(&filter)));
//! assert!(!access.can(&User::new(UserId(2)), Action::View, Some(&filter)));
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sieve_schema::AccessConfig;
use smol_str::SmolStr;
use tracing::{debug, trace};

use crate::model_filter::{FilterId, ModelFilter, UserId};

/// Resource name under which filter permissions are granted.
pub const FILTER_RESOURCE: &str = "ModelFilter";

/// The requesting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    /// Identity.
    pub id: UserId,
    /// Superusers pass every check.
    #[serde(default)]
    pub is_superuser: bool,
    /// Staff users may reach the administrative module.
    #[serde(default)]
    pub is_staff: bool,
}

impl User {
    /// A regular user.
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            is_superuser: false,
            is_staff: false,
        }
    }

    /// A staff user.
    pub fn staff(id: UserId) -> Self {
        Self {
            is_staff: true,
            ..Self::new(id)
        }
    }

    /// A superuser.
    pub fn superuser(id: UserId) -> Self {
        Self {
            is_superuser: true,
            is_staff: true,
            ..Self::new(id)
        }
    }
}

/// Something a user may do to a stored filter or a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Read.
    View,
    /// Modify.
    Change,
    /// Remove.
    Delete,
}

impl Action {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Change => "change",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Class-level permission grants.
///
/// `resource` is a model name, or [`FILTER_RESOURCE`] for stored filters.
pub trait PermissionService: Send + Sync {
    /// Whether `user` holds `action` on every instance of `resource`.
    fn has_class_permission(&self, user: &User, resource: &str, action: Action) -> bool;
}

/// Per-filter permission grants.
pub trait ObjectPermissionChecker: Send + Sync {
    /// Whether `user` holds `action` on the filter `id`.
    fn has_object_permission(&self, user: &User, id: FilterId, action: Action) -> bool;

    /// Every filter on which `user` holds `action`.
    fn objects_with_permission(&self, user: &User, action: Action) -> HashSet<FilterId>;
}

/// In-memory class-level grants.
#[derive(Debug, Default, Clone)]
pub struct StaticPermissions {
    grants: Arc<RwLock<HashMap<UserId, HashSet<(SmolStr, Action)>>>>,
}

impl StaticPermissions {
    /// Create an empty grant table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `action` on `resource` to `user`.
    pub fn grant(&self, user: UserId, resource: impl Into<SmolStr>, action: Action) -> &Self {
        self.grants
            .write()
            .entry(user)
            .or_default()
            .insert((resource.into(), action));
        self
    }

    /// Withdraw a grant. Returns whether it existed.
    pub fn revoke(&self, user: UserId, resource: &str, action: Action) -> bool {
        self.grants
            .write()
            .get_mut(&user)
            .is_some_and(|grants| grants.remove(&(SmolStr::new(resource), action)))
    }
}

impl PermissionService for StaticPermissions {
    fn has_class_permission(&self, user: &User, resource: &str, action: Action) -> bool {
        self.grants
            .read()
            .get(&user.id)
            .is_some_and(|grants| grants.contains(&(SmolStr::new(resource), action)))
    }
}

/// In-memory per-filter grants.
#[derive(Debug, Default, Clone)]
pub struct StaticObjectPermissions {
    grants: Arc<RwLock<HashMap<UserId, HashSet<(FilterId, Action)>>>>,
}

impl StaticObjectPermissions {
    /// Create an empty grant table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `action` on filter `id` to `user`.
    pub fn grant(&self, user: UserId, id: FilterId, action: Action) -> &Self {
        self.grants.write().entry(user).or_default().insert((id, action));
        self
    }

    /// Withdraw a grant. Returns whether it existed.
    pub fn revoke(&self, user: UserId, id: FilterId, action: Action) -> bool {
        self.grants
            .write()
            .get_mut(&user)
            .is_some_and(|grants| grants.remove(&(id, action)))
    }
}

impl ObjectPermissionChecker for StaticObjectPermissions {
    fn has_object_permission(&self, user: &User, id: FilterId, action: Action) -> bool {
        self.grants
            .read()
            .get(&user.id)
            .is_some_and(|grants| grants.contains(&(id, action)))
    }

    fn objects_with_permission(&self, user: &User, action: Action) -> HashSet<FilterId> {
        self.grants
            .read()
            .get(&user.id)
            .map(|grants| {
                grants
                    .iter()
                    .filter(|(_, granted)| *granted == action)
                    .map(|(id, _)| *id)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Which stored filters a listing may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every filter.
    All,
    /// Filters created by the user.
    Owned(UserId),
    /// Filters created by the user, plus individually granted ones.
    OwnedOrGranted {
        /// The user.
        owner: UserId,
        /// Filters granted to the user.
        granted: HashSet<FilterId>,
    },
}

impl Scope {
    /// Whether `filter` falls inside this scope.
    pub fn contains(&self, filter: &ModelFilter) -> bool {
        match self {
            Self::All => true,
            Self::Owned(owner) => filter.owner == *owner,
            Self::OwnedOrGranted { owner, granted } => {
                filter.owner == *owner || granted.contains(&filter.id)
            }
        }
    }
}

/// Evaluates who may do what to stored filters.
#[derive(Clone)]
pub struct AccessControl {
    config: AccessConfig,
    permissions: Arc<dyn PermissionService>,
    objects: Option<Arc<dyn ObjectPermissionChecker>>,
}

impl fmt::Debug for AccessControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessControl")
            .field("config", &self.config)
            .field("object_level", &self.objects.is_some())
            .finish()
    }
}

impl AccessControl {
    /// Create an evaluator with class-level permissions only.
    pub fn new(config: AccessConfig, permissions: Arc<dyn PermissionService>) -> Self {
        Self {
            config,
            permissions,
            objects: None,
        }
    }

    /// Attach an object-level backend. It is consulted only when
    /// `use_object_level_permissions` is enabled.
    pub fn with_object_permissions(mut self, objects: Arc<dyn ObjectPermissionChecker>) -> Self {
        self.objects = Some(objects);
        self
    }

    /// The toggles in effect.
    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    fn object_backend(&self) -> Option<&dyn ObjectPermissionChecker> {
        if self.config.use_object_level_permissions {
            self.objects.as_deref()
        } else {
            None
        }
    }

    fn owner_only(&self, action: Action) -> bool {
        match action {
            Action::View => self.config.view_owner_only,
            Action::Change => self.config.change_owner_only,
            Action::Delete => self.config.delete_owner_only,
        }
    }

    /// Class-level grant; superusers hold every permission.
    fn has_perm(&self, user: &User, resource: &str, action: Action) -> bool {
        user.is_superuser || self.permissions.has_class_permission(user, resource, action)
    }

    /// Class-level grant on filters, or a grant on this filter.
    fn has_filter_perm(&self, user: &User, action: Action, filter: &ModelFilter) -> bool {
        self.has_perm(user, FILTER_RESOURCE, action)
            || self
                .object_backend()
                .is_some_and(|objects| objects.has_object_permission(user, filter.id, action))
    }

    /// Whether `user` can view or change records of `model`.
    pub fn has_model_access(&self, user: &User, model: &str) -> bool {
        self.has_perm(user, model, Action::View) || self.has_perm(user, model, Action::Change)
    }

    /// Whether `user` may perform `action` on `filter`.
    ///
    /// With no filter this is a class-level check and is granted.
    pub fn can(&self, user: &User, action: Action, filter: Option<&ModelFilter>) -> bool {
        let Some(filter) = filter else {
            return true;
        };
        if user.is_superuser {
            return true;
        }

        let granted = if !self.has_model_access(user, &filter.target) {
            false
        } else if filter.is_owned_by(user.id) {
            true
        } else if self.owner_only(action) {
            false
        } else {
            self.has_filter_perm(user, action, filter)
        };

        trace!(
            user_id = %user.id,
            action = %action,
            filter_id = %filter.id,
            granted,
            "Access check"
        );
        granted
    }

    /// Whether `user` may create filters over `target`.
    pub fn can_add(&self, user: &User, target: Option<&str>) -> bool {
        match target {
            None => false,
            Some(model) => user.is_superuser || self.has_model_access(user, model),
        }
    }

    /// Whether `user` may reach the filter administration at all.
    pub fn can_access_module(&self, user: &User) -> bool {
        user.is_staff || user.is_superuser
    }

    /// Whether list views should offer to edit `filter`.
    ///
    /// Unlike [`can`](Self::can), this does not require access to the target
    /// model.
    pub fn can_change_filter(&self, user: &User, filter: &ModelFilter) -> bool {
        if filter.is_owned_by(user.id) {
            return true;
        }
        !self.config.change_owner_only && self.has_filter_perm(user, Action::Change, filter)
    }

    /// The filters `user` may see when enumerating or applying.
    pub fn visibility(&self, user: &User) -> Scope {
        let scope = if self.config.view_owner_only {
            Scope::Owned(user.id)
        } else if self.has_perm(user, FILTER_RESOURCE, Action::View) {
            Scope::All
        } else if let Some(objects) = self.object_backend() {
            Scope::OwnedOrGranted {
                owner: user.id,
                granted: objects.objects_with_permission(user, Action::View),
            }
        } else {
            Scope::Owned(user.id)
        };
        debug!(user_id = %user.id, scope = ?scope, "Resolved filter visibility");
        scope
    }
}
