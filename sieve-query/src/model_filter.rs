//! Stored filters and their clauses.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sieve_schema::OR_SENTINEL;
use smol_str::SmolStr;
use uuid::Uuid;

/// Identifier of a stored filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterId(pub Uuid);

impl FilterId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FilterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a clause compares: a field path, or the OR separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClauseField {
    /// A field path on the target model.
    Path(SmolStr),
    /// Splits the clause list into OR-combined groups.
    OrSeparator,
}

impl ClauseField {
    /// Whether this is the OR separator.
    pub fn is_separator(&self) -> bool {
        matches!(self, Self::OrSeparator)
    }

    /// The field path, unless this is the separator.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Path(path) => Some(path),
            Self::OrSeparator => None,
        }
    }

    /// The stored string form.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Path(path) => path,
            Self::OrSeparator => OR_SENTINEL,
        }
    }
}

impl From<&str> for ClauseField {
    fn from(value: &str) -> Self {
        if value == OR_SENTINEL {
            Self::OrSeparator
        } else {
            Self::Path(SmolStr::new(value))
        }
    }
}

impl From<String> for ClauseField {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<ClauseField> for String {
    fn from(value: ClauseField) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ClauseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One comparison of a stored filter, or an OR separator.
///
/// Values stay raw strings; they are converted to the field's native type
/// only when the filter is validated or compiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    /// Field path or separator.
    pub field: ClauseField,
    /// Operator token.
    #[serde(default)]
    pub operator: Option<String>,
    /// Raw comparison operand.
    #[serde(default)]
    pub value: String,
    /// Invert this comparison.
    #[serde(default)]
    pub negate: bool,
}

impl Clause {
    /// A comparison clause.
    pub fn new(field: impl Into<ClauseField>, operator: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: Some(operator.into()),
            value: value.into(),
            negate: false,
        }
    }

    /// The OR separator.
    pub fn or() -> Self {
        Self {
            field: ClauseField::OrSeparator,
            operator: None,
            value: String::new(),
            negate: false,
        }
    }

    /// Invert this clause.
    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }

    /// Whether this clause is the OR separator.
    pub fn is_separator(&self) -> bool {
        self.field.is_separator()
    }
}

/// A named, reusable filter over one content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFilter {
    /// Identity.
    pub id: FilterId,
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Optional free text.
    #[serde(default)]
    pub description: Option<String>,
    /// Model the filter applies to. Fixed at creation.
    pub target: SmolStr,
    /// Creator. Fixed at creation.
    pub owner: UserId,
    /// Creation time. Fixed at creation.
    pub created: DateTime<Utc>,
    /// Delete after the first successful application.
    #[serde(default)]
    pub ephemeral: bool,
    /// Ordered clauses; order decides AND/OR grouping.
    #[serde(default)]
    pub clauses: Vec<Clause>,
}

impl ModelFilter {
    /// A new, empty filter created now.
    pub fn new(target: impl Into<SmolStr>, owner: UserId) -> Self {
        Self {
            id: FilterId::new(),
            name: None,
            description: None,
            target: target.into(),
            owner,
            created: Utc::now(),
            ephemeral: false,
            clauses: Vec::new(),
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the filter for deletion after first use.
    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    /// Replace the clause list.
    pub fn with_clauses(mut self, clauses: impl IntoIterator<Item = Clause>) -> Self {
        self.clauses = clauses.into_iter().collect();
        self
    }

    /// The name, or the creation time when unnamed.
    pub fn display_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.created.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Whether `user` created this filter.
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner == user
    }

    /// Number of comparison clauses, separators excluded.
    pub fn comparison_count(&self) -> usize {
        self.clauses.iter().filter(|c| !c.is_separator()).count()
    }
}

impl fmt::Display for ModelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clause_field_sentinel() {
        assert_eq!(ClauseField::from("_OR"), ClauseField::OrSeparator);
        assert_eq!(ClauseField::from("parts__name"), ClauseField::Path("parts__name".into()));
        assert_eq!(ClauseField::OrSeparator.as_str(), "_OR");
        assert!(Clause::or().is_separator());
        assert_eq!(ClauseField::from("name").path(), Some("name"));
    }

    #[test]
    fn test_display_name_falls_back_to_created() {
        let mut filter = ModelFilter::new("Customer", UserId(1));
        filter.created = Utc.with_ymd_and_hms(2021, 3, 4, 10, 30, 5).unwrap();
        assert_eq!(filter.display_name(), "2021-03-04 10:30:05");

        let filter = filter.with_name("Gold members");
        assert_eq!(filter.to_string(), "Gold members");
    }

    #[test]
    fn test_clause_serde_uses_sentinel_string() {
        let clauses = vec![
            Clause::new("name", "exact", "A"),
            Clause::or(),
            Clause::new("membership", "exact", "gold").negated(),
        ];
        let json = serde_json::to_value(&clauses).unwrap();
        assert_eq!(json[1]["field"], "_OR");
        assert_eq!(json[2]["negate"], true);

        let back: Vec<Clause> = serde_json::from_value(json).unwrap();
        assert_eq!(back, clauses);
    }

    #[test]
    fn test_filter_builder() {
        let filter = ModelFilter::new("Product", UserId(7))
            .with_description("Toys for toddlers")
            .ephemeral()
            .with_clauses([Clause::new("min_age", "lte", "3"), Clause::or(), Clause::new("name", "icontains", "blocks")]);

        assert!(filter.ephemeral);
        assert!(filter.is_owned_by(UserId(7)));
        assert!(!filter.is_owned_by(UserId(8)));
        assert_eq!(filter.comparison_count(), 2);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(FilterId::new(), FilterId::new());
    }
}
