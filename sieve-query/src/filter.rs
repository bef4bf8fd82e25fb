//! Boolean filter expressions.
//!
//! A [`Filter`] is what a stored filter compiles to. Leaves compare a field
//! path with a typed operand; paths use the registry's `__` separator to cross
//! relations. The same expression can be rendered as parameterised SQL for a
//! relational store, or evaluated directly against JSON rows.

use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;
use sieve_schema::{FieldValue, LOOKUP_SEP, ScalarType, convert};

/// A complete filter expression.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// No filter (always true).
    #[default]
    None,

    /// Equals comparison. A `Null` operand tests for missing values.
    Equals(String, FieldValue),
    /// Case-insensitive equality.
    IEquals(String, FieldValue),

    /// Less than comparison.
    Lt(String, FieldValue),
    /// Less than or equal comparison.
    Lte(String, FieldValue),
    /// Greater than comparison.
    Gt(String, FieldValue),
    /// Greater than or equal comparison.
    Gte(String, FieldValue),

    /// Substring match.
    Contains(String, FieldValue),
    /// Case-insensitive substring match.
    IContains(String, FieldValue),
    /// Regular expression match.
    Regex(String, FieldValue),
    /// Case-insensitive regular expression match.
    IRegex(String, FieldValue),

    /// Logical AND of multiple filters.
    And(Vec<Filter>),
    /// Logical OR of multiple filters.
    Or(Vec<Filter>),
    /// Logical NOT of a filter.
    Not(Box<Filter>),
}

impl Filter {
    /// Create an empty filter (matches everything).
    pub fn none() -> Self {
        Self::None
    }

    /// Check if this filter is empty.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Create an AND filter. Empty members are dropped.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::And(filters),
        }
    }

    /// Create an OR filter.
    ///
    /// An empty member matches everything, and so does the whole disjunction.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().collect();
        if filters.is_empty() || filters.iter().any(Filter::is_none) {
            return Self::None;
        }
        match filters.len() {
            1 => filters.remove(0),
            _ => Self::Or(filters),
        }
    }

    /// Create a NOT filter.
    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        if filter.is_none() {
            return Self::None;
        }
        Self::Not(Box::new(filter))
    }

    /// Combine with another filter using AND.
    pub fn and_then(self, other: Filter) -> Self {
        if self.is_none() {
            return other;
        }
        if other.is_none() {
            return self;
        }
        match self {
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            }
            _ => Self::And(vec![self, other]),
        }
    }

    /// Combine with another filter using OR.
    pub fn or_else(self, other: Filter) -> Self {
        if self.is_none() || other.is_none() {
            return Self::None;
        }
        match self {
            Self::Or(mut filters) => {
                filters.push(other);
                Self::Or(filters)
            }
            _ => Self::Or(vec![self, other]),
        }
    }

    /// Number of leaf comparisons.
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::None => 0,
            Self::And(filters) | Self::Or(filters) => filters.iter().map(Filter::leaf_count).sum(),
            Self::Not(inner) => inner.leaf_count(),
            _ => 1,
        }
    }

    /// Generate SQL for this filter with parameter placeholders.
    ///
    /// Returns `(sql, params)` where params are the values to bind, numbered
    /// from `param_offset + 1`. Relation paths are rendered with `.`.
    pub fn to_sql(&self, param_offset: usize) -> (String, Vec<FieldValue>) {
        let mut params = Vec::new();
        let sql = self.write_sql(param_offset, &mut params);
        (sql, params)
    }

    fn write_sql(&self, offset: usize, params: &mut Vec<FieldValue>) -> String {
        match self {
            Self::None => "TRUE".to_string(),

            Self::Equals(path, val) if val.is_null() => format!("{} IS NULL", column(path)),
            Self::Equals(path, val) => format!("{} = {}", column(path), bind(params, offset, val.clone())),
            Self::IEquals(path, val) => {
                format!("LOWER({}) = LOWER({})", column(path), bind(params, offset, val.clone()))
            }

            Self::Lt(path, val) => format!("{} < {}", column(path), bind(params, offset, val.clone())),
            Self::Lte(path, val) => format!("{} <= {}", column(path), bind(params, offset, val.clone())),
            Self::Gt(path, val) => format!("{} > {}", column(path), bind(params, offset, val.clone())),
            Self::Gte(path, val) => format!("{} >= {}", column(path), bind(params, offset, val.clone())),

            Self::Contains(path, val) => {
                format!("{} LIKE {}", column(path), bind(params, offset, like_pattern(val)))
            }
            Self::IContains(path, val) => {
                format!("{} ILIKE {}", column(path), bind(params, offset, like_pattern(val)))
            }
            Self::Regex(path, val) => format!("{} ~ {}", column(path), bind(params, offset, val.clone())),
            Self::IRegex(path, val) => format!("{} ~* {}", column(path), bind(params, offset, val.clone())),

            Self::And(filters) => {
                if filters.is_empty() {
                    return "TRUE".to_string();
                }
                let parts: Vec<_> = filters.iter().map(|f| f.write_sql(offset, params)).collect();
                format!("({})", parts.join(" AND "))
            }
            Self::Or(filters) => {
                if filters.is_empty() {
                    return "FALSE".to_string();
                }
                let parts: Vec<_> = filters.iter().map(|f| f.write_sql(offset, params)).collect();
                format!("({})", parts.join(" OR "))
            }
            Self::Not(filter) => format!("NOT ({})", filter.write_sql(offset, params)),
        }
    }

    /// The first regular expression in this filter that does not compile.
    pub fn pattern_error(&self) -> Option<String> {
        match self {
            Self::And(filters) | Self::Or(filters) => filters.iter().find_map(Filter::pattern_error),
            Self::Not(inner) => inner.pattern_error(),
            Self::Regex(path, val) => build_regex(val, false).err().map(|e| format!("{path}: {e}")),
            Self::IRegex(path, val) => build_regex(val, true).err().map(|e| format!("{path}: {e}")),
            _ => None,
        }
    }

    /// Evaluate the filter against a JSON row.
    ///
    /// Paths walk nested objects; arrays along the way are multi-valued
    /// relations, and a comparison holds when any reached value satisfies it.
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Self::None => true,
            Self::And(filters) => filters.iter().all(|f| f.matches(row)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(row)),
            Self::Not(inner) => !inner.matches(row),

            Self::Equals(path, FieldValue::Null) => {
                let values = lookup(row, path);
                values.is_empty() || values.iter().any(|v| v.is_null())
            }
            Self::Equals(path, val) => any(row, path, |v| compare(v, val) == Some(Ordering::Equal)),
            Self::IEquals(path, val) => any(row, path, |v| {
                match (text_of(v), val.as_str()) {
                    (Some(actual), Some(expected)) => actual.to_lowercase() == expected.to_lowercase(),
                    _ => compare(v, val) == Some(Ordering::Equal),
                }
            }),

            Self::Lt(path, val) => any(row, path, |v| compare(v, val) == Some(Ordering::Less)),
            Self::Lte(path, val) => any(row, path, |v| {
                matches!(compare(v, val), Some(Ordering::Less | Ordering::Equal))
            }),
            Self::Gt(path, val) => any(row, path, |v| compare(v, val) == Some(Ordering::Greater)),
            Self::Gte(path, val) => any(row, path, |v| {
                matches!(compare(v, val), Some(Ordering::Greater | Ordering::Equal))
            }),

            Self::Contains(path, val) => {
                let needle = val.as_str().map(str::to_string).unwrap_or_else(|| val.to_string());
                any(row, path, |v| text_of(v).is_some_and(|t| t.contains(&needle)))
            }
            Self::IContains(path, val) => {
                let needle = val
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| val.to_string())
                    .to_lowercase();
                any(row, path, |v| {
                    text_of(v).is_some_and(|t| t.to_lowercase().contains(&needle))
                })
            }
            Self::Regex(path, val) => regex_matches(row, path, val, false),
            Self::IRegex(path, val) => regex_matches(row, path, val, true),
        }
    }
}

fn bind(params: &mut Vec<FieldValue>, offset: usize, value: FieldValue) -> String {
    params.push(value);
    format!("${}", offset + params.len())
}

fn column(path: &str) -> String {
    path.replace(LOOKUP_SEP, ".")
}

fn like_pattern(val: &FieldValue) -> FieldValue {
    match val {
        FieldValue::String(s) => FieldValue::String(format!("%{}%", s)),
        other => other.clone(),
    }
}

/// Every value reached by walking `path` through `row`.
fn lookup<'a>(row: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![row];
    for segment in path.split(LOOKUP_SEP) {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Array(items) => next.extend(items.iter().filter_map(|i| i.get(segment))),
                Value::Object(map) => next.extend(map.get(segment)),
                _ => {}
            }
        }
        current = next;
    }

    // A terminal array is a list of values, not a relation.
    current
        .into_iter()
        .flat_map(|v| match v {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            other => vec![other],
        })
        .collect()
}

fn any(row: &Value, path: &str, predicate: impl Fn(&Value) -> bool) -> bool {
    lookup(row, path).into_iter().any(predicate)
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn build_regex(val: &FieldValue, ignore_case: bool) -> Result<regex_lite::Regex, regex_lite::Error> {
    let pattern = val.as_str().map(str::to_string).unwrap_or_else(|| val.to_string());
    regex_lite::RegexBuilder::new(&pattern)
        .case_insensitive(ignore_case)
        .build()
}

fn regex_matches(row: &Value, path: &str, val: &FieldValue, ignore_case: bool) -> bool {
    let regex = match build_regex(val, ignore_case) {
        Ok(regex) => regex,
        Err(e) => {
            tracing::warn!(path, error = %e, "Invalid regular expression");
            return false;
        }
    };
    any(row, path, |v| text_of(v).is_some_and(|t| regex.is_match(&t)))
}

/// Order a stored JSON value against a typed operand.
///
/// `None` when the two cannot be compared, which makes every comparison fail,
/// the same way SQL comparisons with NULL do.
fn compare(actual: &Value, expected: &FieldValue) -> Option<Ordering> {
    if actual.is_null() {
        return None;
    }
    match expected {
        FieldValue::Null | FieldValue::List(_) => None,
        FieldValue::Bool(b) => actual.as_bool().map(|a| a.cmp(b)),
        FieldValue::Int(i) => match actual {
            Value::Number(n) => n
                .as_i64()
                .map(|a| a.cmp(i))
                .or_else(|| n.as_f64().and_then(|a| a.partial_cmp(&(*i as f64)))),
            Value::String(s) => s.trim().parse::<i64>().ok().map(|a| a.cmp(i)),
            _ => None,
        },
        FieldValue::Float(f) => match actual {
            Value::Number(n) => n.as_f64().and_then(|a| a.partial_cmp(f)),
            Value::String(s) => s.trim().parse::<f64>().ok().and_then(|a| a.partial_cmp(f)),
            _ => None,
        },
        FieldValue::Decimal(d) => {
            let a = match actual {
                Value::Number(n) => Decimal::from_str(&n.to_string())
                    .or_else(|_| Decimal::from_scientific(&n.to_string()))
                    .ok(),
                Value::String(s) => Decimal::from_str(s.trim()).ok(),
                _ => None,
            }?;
            Some(a.cmp(d))
        }
        FieldValue::String(s) => match actual {
            Value::String(a) => Some(a.as_str().cmp(s.as_str())),
            other => text_of(other).map(|a| a.as_str().cmp(s.as_str())),
        },
        FieldValue::Date(d) => match convert(ScalarType::Date, actual.as_str()?.get(..10)?) {
            Ok(FieldValue::Date(a)) => Some(a.cmp(d)),
            _ => None,
        },
        FieldValue::DateTime(dt) => match convert(ScalarType::DateTime, actual.as_str()?) {
            Ok(FieldValue::DateTime(a)) => Some(a.cmp(dt)),
            _ => None,
        },
        FieldValue::Time(t) => match convert(ScalarType::Time, actual.as_str()?) {
            Ok(FieldValue::Time(a)) => Some(a.cmp(t)),
            _ => None,
        },
        FieldValue::Uuid(u) => uuid::Uuid::parse_str(actual.as_str()?).ok().map(|a| a.cmp(u)),
        FieldValue::Json(j) => (actual == j).then_some(Ordering::Equal),
    }
}
