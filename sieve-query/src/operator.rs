//! Comparison operators and the per-category operator catalog.
//!
//! Every field falls into a coarse [`TypeCategory`], and each category allows
//! a fixed, ordered set of operators. The catalog is the allow-list the clause
//! validator checks against and the source of the operator menus offered to
//! filter authors.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sieve_schema::{DEFAULT_CATEGORY_TABLE, FieldDescriptor, ScalarType, TypeCategory};

/// A comparison operator token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Exact match.
    Exact,
    /// Case-insensitive exact match.
    IExact,
    /// Substring match.
    Contains,
    /// Case-insensitive substring match.
    IContains,
    /// Regular expression match.
    Regex,
    /// Case-insensitive regular expression match.
    IRegex,
    /// Less than.
    Lt,
    /// Greater than.
    Gt,
    /// Less than or equal.
    Lte,
    /// Greater than or equal.
    Gte,
    /// Value is missing.
    IsNull,
    /// Value is true.
    IsTrue,
    /// Value is false.
    IsFalse,
    /// Value is the empty string.
    IsEmpty,
}

impl Operator {
    /// Every operator, in catalog order.
    pub const ALL: [Operator; 14] = [
        Self::IsTrue,
        Self::IsFalse,
        Self::IsNull,
        Self::Exact,
        Self::IExact,
        Self::Contains,
        Self::IContains,
        Self::Regex,
        Self::IRegex,
        Self::IsEmpty,
        Self::Lt,
        Self::Gt,
        Self::Lte,
        Self::Gte,
    ];

    /// Parse a token. `equals` and `eq` are accepted for `exact`.
    pub fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "exact" | "equals" | "eq" => Self::Exact,
            "iexact" => Self::IExact,
            "contains" => Self::Contains,
            "icontains" => Self::IContains,
            "regex" => Self::Regex,
            "iregex" => Self::IRegex,
            "lt" => Self::Lt,
            "gt" => Self::Gt,
            "lte" => Self::Lte,
            "gte" => Self::Gte,
            "isnull" => Self::IsNull,
            "istrue" => Self::IsTrue,
            "isfalse" => Self::IsFalse,
            "isempty" => Self::IsEmpty,
            _ => return None,
        })
    }

    /// The canonical token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::IExact => "iexact",
            Self::Contains => "contains",
            Self::IContains => "icontains",
            Self::Regex => "regex",
            Self::IRegex => "iregex",
            Self::Lt => "lt",
            Self::Gt => "gt",
            Self::Lte => "lte",
            Self::Gte => "gte",
            Self::IsNull => "isnull",
            Self::IsTrue => "istrue",
            Self::IsFalse => "isfalse",
            Self::IsEmpty => "isempty",
        }
    }

    /// Whether the operator ignores the clause value.
    pub fn takes_no_value(&self) -> bool {
        matches!(
            self,
            Self::IsNull | Self::IsTrue | Self::IsFalse | Self::IsEmpty
        )
    }

    /// Label shown to filter authors for a field of `category`.
    pub fn label(&self, category: TypeCategory) -> &'static str {
        match (self, category) {
            (Self::Exact, TypeCategory::Text) => "Equals (case-sensitive)",
            (Self::Exact, TypeCategory::Numeric) => "Equals (numeric)",
            (Self::Exact, TypeCategory::Date) => "Equals (date/time)",
            (Self::Exact, TypeCategory::Identifier) => "Equals (UUID)",
            (Self::Exact, _) => "Equals (exact)",
            (Self::IExact, _) => "Equals (ignore case)",
            (Self::Contains, _) => "Contains (case-sensitive)",
            (Self::IContains, _) => "Contains (ignore case)",
            (Self::Regex, _) => "Regex Match (case-sensitive)",
            (Self::IRegex, _) => "Regex Match (ignore case)",
            (Self::Lt, _) => "Less Than",
            (Self::Gt, _) => "Greater Than",
            (Self::Lte, _) => "Less Than or Equal To",
            (Self::Gte, _) => "Greater Than or Equal To",
            (Self::IsNull, _) => "Is NULL",
            (Self::IsTrue, _) => "Is TRUE",
            (Self::IsFalse, _) => "Is FALSE",
            (Self::IsEmpty, _) => "Is Empty",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown operator '{}'", s))
    }
}

/// Operators for boolean fields.
pub const BOOLEAN_OPERATORS: &[Operator] = &[Operator::IsTrue, Operator::IsFalse, Operator::IsNull];

/// Operators for text fields.
pub const TEXT_OPERATORS: &[Operator] = &[
    Operator::Exact,
    Operator::IExact,
    Operator::Contains,
    Operator::IContains,
    Operator::Regex,
    Operator::IRegex,
    Operator::IsEmpty,
    Operator::IsNull,
];

/// Operators for numeric fields.
pub const NUMERIC_OPERATORS: &[Operator] = &[
    Operator::Exact,
    Operator::Lt,
    Operator::Gt,
    Operator::Lte,
    Operator::Gte,
    Operator::IsNull,
];

/// Operators for date and date-time fields.
pub const DATE_OPERATORS: &[Operator] = NUMERIC_OPERATORS;

/// Operators for identifier fields.
pub const IDENTIFIER_OPERATORS: &[Operator] = &[Operator::Exact, Operator::IsNull];

/// Operators for fields no category claims.
pub const DEFAULT_OPERATORS: &[Operator] = &[Operator::Exact, Operator::IsNull];

/// An operator with its display label, as offered to filter authors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorChoice {
    /// Operator token.
    pub key: &'static str,
    /// Display label.
    pub display: &'static str,
}

/// The allow-list of operators per category, plus the kind classification.
#[derive(Debug, Clone)]
pub struct OperatorCatalog {
    table: Vec<(ScalarType, TypeCategory)>,
    operators: IndexMap<TypeCategory, Vec<Operator>>,
}

impl Default for OperatorCatalog {
    fn default() -> Self {
        let operators = [
            (TypeCategory::Boolean, BOOLEAN_OPERATORS),
            (TypeCategory::Text, TEXT_OPERATORS),
            (TypeCategory::Numeric, NUMERIC_OPERATORS),
            (TypeCategory::Date, DATE_OPERATORS),
            (TypeCategory::Identifier, IDENTIFIER_OPERATORS),
            (TypeCategory::Other, DEFAULT_OPERATORS),
        ]
        .into_iter()
        .map(|(category, ops)| (category, ops.to_vec()))
        .collect();

        Self {
            table: DEFAULT_CATEGORY_TABLE.to_vec(),
            operators,
        }
    }
}

impl OperatorCatalog {
    /// The standard catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `ty` as `category`, taking precedence over existing entries.
    pub fn with_entry(mut self, ty: ScalarType, category: TypeCategory) -> Self {
        self.table.retain(|(kind, _)| *kind != ty);
        self.table.insert(0, (ty, category));
        self
    }

    /// Replace the operator set of a category.
    pub fn with_operators(
        mut self,
        category: TypeCategory,
        operators: impl IntoIterator<Item = Operator>,
    ) -> Self {
        self.operators.insert(category, operators.into_iter().collect());
        self
    }

    /// Category of a native kind.
    pub fn category_of(&self, ty: ScalarType) -> TypeCategory {
        TypeCategory::classify(&self.table, ty)
    }

    /// Operators allowed for a category.
    pub fn operators_for_category(&self, category: TypeCategory) -> &[Operator] {
        self.operators
            .get(&category)
            .or_else(|| self.operators.get(&TypeCategory::Other))
            .map(Vec::as_slice)
            .unwrap_or(DEFAULT_OPERATORS)
    }

    /// Operators allowed for the field at the end of a resolved path.
    pub fn operators_for(&self, field: &FieldDescriptor) -> &[Operator] {
        self.operators_for_category(self.category_of(field.scalar_type))
    }

    /// Whether `operator` may be used on `field`.
    pub fn allows(&self, field: &FieldDescriptor, operator: Operator) -> bool {
        self.operators_for(field).contains(&operator)
    }

    /// Every operator any category allows, without duplicates.
    pub fn all(&self) -> Vec<Operator> {
        let mut all: Vec<Operator> = Vec::new();
        for op in self.operators.values().flatten() {
            if !all.contains(op) {
                all.push(*op);
            }
        }
        all
    }

    /// Operators for a field with their display labels.
    pub fn choices_for(&self, field: &FieldDescriptor) -> Vec<OperatorChoice> {
        let category = self.category_of(field.scalar_type);
        self.operators_for_category(category)
            .iter()
            .map(|op| OperatorChoice {
                key: op.as_str(),
                display: op.label(category),
            })
            .collect()
    }
}
