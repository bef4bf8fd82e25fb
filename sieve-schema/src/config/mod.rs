//! Configuration file parsing for `sieve.toml`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{SchemaError, SchemaResult};

/// Main configuration structure for `sieve.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SieveConfig {
    /// Owner-only toggles and permission backends.
    #[serde(default)]
    pub access: AccessConfig,

    /// How stored filters are enumerated.
    #[serde(default)]
    pub listing: ListingConfig,

    /// Content-type registry location.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Environment-specific overrides.
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentOverride>,
}

impl SieveConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SchemaError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> SchemaResult<Self> {
        let expanded = expand_env_vars(content);

        let config: Self =
            toml::from_str(&expanded).map_err(|e| SchemaError::TomlError { source: e })?;
        config.listing.check()?;
        Ok(config)
    }

    /// Apply environment-specific overrides.
    pub fn with_environment(mut self, env: &str) -> Self {
        if let Some(overrides) = self.environments.remove(env) {
            if let Some(access) = overrides.access {
                if let Some(v) = access.view_owner_only {
                    self.access.view_owner_only = v;
                }
                if let Some(v) = access.change_owner_only {
                    self.access.change_owner_only = v;
                }
                if let Some(v) = access.delete_owner_only {
                    self.access.delete_owner_only = v;
                }
                if let Some(v) = access.use_object_level_permissions {
                    self.access.use_object_level_permissions = v;
                }
            }
            if let Some(listing) = overrides.listing {
                self.listing = listing;
            }
            tracing::debug!(environment = env, "Applied configuration overrides");
        }
        self
    }
}

/// Per-action owner-only toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AccessConfig {
    /// Only owners may view a filter.
    #[serde(default = "default_true")]
    pub view_owner_only: bool,

    /// Only owners may change a filter.
    #[serde(default = "default_true")]
    pub change_owner_only: bool,

    /// Only owners may delete a filter.
    #[serde(default = "default_true")]
    pub delete_owner_only: bool,

    /// Consult the object-level permission backend, when one is installed.
    #[serde(default)]
    pub use_object_level_permissions: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            view_owner_only: true,
            change_owner_only: true,
            delete_owner_only: true,
            use_object_level_permissions: false,
        }
    }
}

impl AccessConfig {
    /// A configuration where no action is restricted to owners.
    pub fn shared() -> Self {
        Self {
            view_owner_only: false,
            change_owner_only: false,
            delete_owner_only: false,
            ..Self::default()
        }
    }

    /// Turn object-level permission checks on or off.
    pub fn with_object_level_permissions(mut self, enabled: bool) -> Self {
        self.use_object_level_permissions = enabled;
        self
    }
}

fn default_true() -> bool {
    true
}

/// Listing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ListingConfig {
    /// Ordering applied when enumerating filters, most significant first.
    #[serde(default = "default_listing_order")]
    pub order: Vec<OrderSetting>,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            order: default_listing_order(),
        }
    }
}

impl ListingConfig {
    fn check(&self) -> SchemaResult<()> {
        if self.order.is_empty() {
            return Err(SchemaError::ConfigError {
                message: "listing.order must name at least one field".to_string(),
            });
        }
        Ok(())
    }
}

fn default_listing_order() -> Vec<OrderSetting> {
    vec![
        OrderSetting {
            field: OrderKey::Name,
            direction: SortOrder::Asc,
            nulls: Some(NullsOrder::First),
            ignore_case: true,
        },
        OrderSetting {
            field: OrderKey::Created,
            direction: SortOrder::Desc,
            nulls: None,
            ignore_case: false,
        },
    ]
}

/// One `[[listing.order]]` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OrderSetting {
    /// Stored-filter attribute to order by.
    pub field: OrderKey,

    /// Sort direction.
    #[serde(default)]
    pub direction: SortOrder,

    /// Where missing values go.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nulls: Option<NullsOrder>,

    /// Compare text case-insensitively.
    #[serde(default)]
    pub ignore_case: bool,
}

/// Stored-filter attributes a listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKey {
    /// Display name.
    Name,
    /// Creation time.
    Created,
    /// Identifier.
    Id,
}

impl OrderKey {
    /// Column name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Created => "created",
            Self::Id => "id",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9, oldest first).
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0, newest first).
    Desc,
}

impl SortOrder {
    /// Get the SQL keyword.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Null handling in ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NullsOrder {
    /// Nulls appear first.
    First,
    /// Nulls appear last.
    Last,
}

impl NullsOrder {
    /// Get the SQL keyword.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::First => "NULLS FIRST",
            Self::Last => "NULLS LAST",
        }
    }
}

/// Registry file configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Path to a TOML or JSON registry file.
    pub path: Option<String>,
}

/// Environment-specific configuration overrides.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentOverride {
    /// Access overrides.
    pub access: Option<AccessOverride>,
    /// Listing order replacement.
    pub listing: Option<ListingConfig>,
}

/// Access overrides; unset toggles keep their base value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AccessOverride {
    pub view_owner_only: Option<bool>,
    pub change_owner_only: Option<bool>,
    pub delete_owner_only: Option<bool>,
    pub use_object_level_permissions: Option<bool>,
}

/// Expand `${VAR}` references from the process environment.
///
/// Unset variables are left as written.
fn expand_env_vars(content: &str) -> String {
    let Ok(re) = regex_lite::Regex::new(r"\$\{([^}]+)\}") else {
        return content.to_string();
    };

    let mut result = content.to_string();
    for cap in re.captures_iter(content) {
        if let Ok(value) = std::env::var(&cap[1]) {
            result = result.replace(&cap[0], &value);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = SieveConfig::default();
        assert!(config.access.view_owner_only);
        assert!(config.access.change_owner_only);
        assert!(config.access.delete_owner_only);
        assert!(!config.access.use_object_level_permissions);
        assert_eq!(config.listing.order.len(), 2);
        assert_eq!(config.listing.order[0].field, OrderKey::Name);
        assert_eq!(config.listing.order[1].direction, SortOrder::Desc);
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        assert_eq!(SieveConfig::from_str("").unwrap(), SieveConfig::default());
    }

    #[test]
    fn test_parse_access_and_listing() {
        let config = SieveConfig::from_str(
            r#"
            [access]
            view_owner_only = false
            use_object_level_permissions = true

            [[listing.order]]
            field = "created"
            direction = "asc"
            nulls = "last"

            [registry]
            path = "models.toml"
            "#,
        )
        .unwrap();

        assert!(!config.access.view_owner_only);
        assert!(config.access.change_owner_only);
        assert!(config.access.use_object_level_permissions);
        assert_eq!(
            config.listing.order,
            vec![OrderSetting {
                field: OrderKey::Created,
                direction: SortOrder::Asc,
                nulls: Some(NullsOrder::Last),
                ignore_case: false,
            }]
        );
        assert_eq!(config.registry.path.as_deref(), Some("models.toml"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(SieveConfig::from_str("[access]\nview_only = true").is_err());
    }

    #[test]
    fn test_empty_listing_order_rejected() {
        let err = SieveConfig::from_str("[listing]\norder = []").unwrap_err();
        assert!(matches!(err, SchemaError::ConfigError { .. }));
    }

    #[test]
    fn test_environment_override() {
        let config = SieveConfig::from_str(
            r#"
            [environments.staging.access]
            change_owner_only = false
            "#,
        )
        .unwrap()
        .with_environment("staging");

        assert!(!config.access.change_owner_only);
        assert!(config.access.delete_owner_only);
        assert!(config.environments.is_empty());
    }

    #[test]
    fn test_env_var_expansion() {
        // SAFETY: This test runs single-threaded and we clean up after
        unsafe {
            std::env::set_var("SIEVE_TEST_REGISTRY", "acme.toml");
        }
        let expanded = expand_env_vars("path = \"${SIEVE_TEST_REGISTRY}\"");
        assert_eq!(expanded, "path = \"acme.toml\"");
        unsafe {
            std::env::remove_var("SIEVE_TEST_REGISTRY");
        }
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sieve.toml");
        std::fs::write(&path, "[access]\ndelete_owner_only = false\n").unwrap();

        let config = SieveConfig::from_file(&path).unwrap();
        assert!(!config.access.delete_owner_only);
    }
}
