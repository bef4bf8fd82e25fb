//! Type definitions for the Sieve content-type registry.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Native field kinds known to the registry.
///
/// Several kinds are refinements of a more general kind (an email address is
/// a string, a small integer is an integer). [`ScalarType::parent`] exposes that
/// relationship so operator lookups can fall back to the general kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    /// Short text (maps to VARCHAR).
    String,
    /// Long text (maps to TEXT).
    Text,
    /// Email address, stored as a string.
    Email,
    /// URL slug, stored as a string.
    Slug,
    /// URL, stored as a string.
    Url,
    /// Filesystem path.
    FilePath,
    /// IPv4 or IPv6 address.
    IpAddress,
    /// Integer type (maps to INT/INTEGER).
    Int,
    /// Small integer type (maps to SMALLINT).
    SmallInt,
    /// Big integer type (maps to BIGINT).
    BigInt,
    /// Non-negative integer.
    PositiveInt,
    /// Non-negative small integer.
    PositiveSmallInt,
    /// Floating point type (maps to FLOAT/REAL).
    Float,
    /// Decimal type for precise calculations (maps to DECIMAL/NUMERIC).
    Decimal,
    /// Boolean type.
    Boolean,
    /// Date only type.
    Date,
    /// Date and time type.
    DateTime,
    /// Time only type.
    Time,
    /// UUID type.
    Uuid,
    /// JSON type.
    Json,
    /// Binary/Bytes type.
    Bytes,
}

impl ScalarType {
    /// Parse a scalar type from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "String" | "Char" => Some(Self::String),
            "Text" => Some(Self::Text),
            "Email" => Some(Self::Email),
            "Slug" => Some(Self::Slug),
            "Url" | "URL" => Some(Self::Url),
            "FilePath" => Some(Self::FilePath),
            "IpAddress" => Some(Self::IpAddress),
            "Int" | "Integer" => Some(Self::Int),
            "SmallInt" => Some(Self::SmallInt),
            "BigInt" => Some(Self::BigInt),
            "PositiveInt" => Some(Self::PositiveInt),
            "PositiveSmallInt" => Some(Self::PositiveSmallInt),
            "Float" => Some(Self::Float),
            "Decimal" => Some(Self::Decimal),
            "Boolean" | "Bool" => Some(Self::Boolean),
            "Date" => Some(Self::Date),
            "DateTime" => Some(Self::DateTime),
            "Time" => Some(Self::Time),
            "Uuid" | "UUID" => Some(Self::Uuid),
            "Json" => Some(Self::Json),
            "Bytes" => Some(Self::Bytes),
            _ => None,
        }
    }

    /// Get the type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Text => "Text",
            Self::Email => "Email",
            Self::Slug => "Slug",
            Self::Url => "Url",
            Self::FilePath => "FilePath",
            Self::IpAddress => "IpAddress",
            Self::Int => "Int",
            Self::SmallInt => "SmallInt",
            Self::BigInt => "BigInt",
            Self::PositiveInt => "PositiveInt",
            Self::PositiveSmallInt => "PositiveSmallInt",
            Self::Float => "Float",
            Self::Decimal => "Decimal",
            Self::Boolean => "Boolean",
            Self::Date => "Date",
            Self::DateTime => "DateTime",
            Self::Time => "Time",
            Self::Uuid => "Uuid",
            Self::Json => "Json",
            Self::Bytes => "Bytes",
        }
    }

    /// The more general kind this kind refines, if any.
    pub fn parent(&self) -> Option<ScalarType> {
        match self {
            Self::Email | Self::Slug | Self::Url => Some(Self::String),
            Self::SmallInt | Self::BigInt | Self::PositiveInt => Some(Self::Int),
            Self::PositiveSmallInt => Some(Self::PositiveInt),
            Self::DateTime => Some(Self::Date),
            _ => None,
        }
    }

    /// This kind followed by its ancestors, nearest first.
    pub fn lineage(&self) -> impl Iterator<Item = ScalarType> {
        std::iter::successors(Some(*self), |ty| ty.parent())
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse classification used to pick the operators a field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCategory {
    /// True/false values.
    Boolean,
    /// Free text.
    Text,
    /// Integers, floats and decimals.
    Numeric,
    /// Dates and date-times.
    Date,
    /// Opaque identifiers such as UUIDs.
    Identifier,
    /// Anything the catalog does not classify.
    Other,
}

impl TypeCategory {
    /// Get the category name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Text => "text",
            Self::Numeric => "numeric",
            Self::Date => "date",
            Self::Identifier => "identifier",
            Self::Other => "other",
        }
    }

    /// Classify a kind against an ordered `(kind, category)` table.
    ///
    /// An entry for the kind itself wins. Otherwise the kind's ancestors are
    /// tried nearest-first and the first ancestor with an entry decides.
    /// Kinds with no match anywhere in their lineage are [`TypeCategory::Other`].
    pub fn classify(table: &[(ScalarType, TypeCategory)], ty: ScalarType) -> TypeCategory {
        ty.lineage()
            .find_map(|kind| {
                table
                    .iter()
                    .find(|(entry, _)| *entry == kind)
                    .map(|(_, category)| *category)
            })
            .unwrap_or(TypeCategory::Other)
    }
}

impl std::fmt::Display for TypeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default kind-to-category table, in precedence order.
pub const DEFAULT_CATEGORY_TABLE: &[(ScalarType, TypeCategory)] = &[
    (ScalarType::String, TypeCategory::Text),
    (ScalarType::Text, TypeCategory::Text),
    (ScalarType::FilePath, TypeCategory::Text),
    (ScalarType::IpAddress, TypeCategory::Text),
    (ScalarType::Decimal, TypeCategory::Numeric),
    (ScalarType::Float, TypeCategory::Numeric),
    (ScalarType::Int, TypeCategory::Numeric),
    (ScalarType::Date, TypeCategory::Date),
    (ScalarType::Boolean, TypeCategory::Boolean),
    (ScalarType::Uuid, TypeCategory::Identifier),
];

/// A field type in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// A scalar type (Int, String, etc.).
    Scalar(ScalarType),
    /// A reference to another model (relation).
    Relation(SmolStr),
}

impl FieldType {
    /// Check if this is a scalar type.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    /// Check if this is a relation to another model.
    pub fn is_relation(&self) -> bool {
        matches!(self, Self::Relation(_))
    }

    /// The scalar kind, for scalar fields.
    pub fn scalar(&self) -> Option<ScalarType> {
        match self {
            Self::Scalar(ty) => Some(*ty),
            Self::Relation(_) => None,
        }
    }

    /// Get the type name as a string.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Scalar(s) => s.as_str(),
            Self::Relation(name) => name.as_str(),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Modifier for field types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeModifier {
    /// Required field (no modifier).
    #[default]
    Required,
    /// Optional field (nullable).
    Optional,
    /// List field; on relations this marks a multi-valued relation.
    List,
    /// Optional list field.
    OptionalList,
}

impl TypeModifier {
    /// Check if the field is optional.
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional | Self::OptionalList)
    }

    /// Check if the field is a list.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List | Self::OptionalList)
    }
}
