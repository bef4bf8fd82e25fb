//! Typed operands produced by converting raw clause values.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// A typed value that can be used in comparisons.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Exact decimal value.
    Decimal(Decimal),
    /// String value.
    String(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time, normalised to UTC.
    DateTime(NaiveDateTime),
    /// Time of day.
    Time(NaiveTime),
    /// UUID value.
    Uuid(Uuid),
    /// JSON value.
    Json(serde_json::Value),
    /// List of values.
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
            Self::Time(_) => "time",
            Self::Uuid(_) => "uuid",
            Self::Json(_) => "json",
            Self::List(_) => "list",
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Decimal(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{:?}", v),
            Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Self::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.f")),
            Self::Time(v) => write!(f, "{}", v.format("%H:%M:%S%.f")),
            Self::Uuid(v) => write!(f, "{}", v),
            Self::Json(v) => write!(f, "{}", v),
            Self::List(values) => {
                f.write_str("[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Decimal> for FieldValue {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<Uuid> for FieldValue {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_from() {
        assert_eq!(FieldValue::from(42i32), FieldValue::Int(42));
        assert_eq!(FieldValue::from("hello"), FieldValue::String("hello".to_string()));
        assert_eq!(FieldValue::from(true), FieldValue::Bool(true));
        assert_eq!(FieldValue::from(None::<i64>), FieldValue::Null);
        assert_eq!(
            FieldValue::from(vec![1i64, 2]),
            FieldValue::List(vec![FieldValue::Int(1), FieldValue::Int(2)])
        );
    }

    #[test]
    fn test_display() {
        let date = NaiveDate::from_ymd_opt(1949, 9, 17).unwrap();
        assert_eq!(FieldValue::Date(date).to_string(), "1949-09-17");
        assert_eq!(FieldValue::from("gold").to_string(), "\"gold\"");
        assert_eq!(FieldValue::Null.to_string(), "NULL");
        assert_eq!(FieldValue::from(vec![1i64, 2]).to_string(), "[1, 2]");
    }

    #[test]
    fn test_serialize_untagged() {
        let json = serde_json::to_value(FieldValue::Int(7)).unwrap();
        assert_eq!(json, serde_json::json!(7));
        let json = serde_json::to_value(FieldValue::Null).unwrap();
        assert!(json.is_null());
    }
}
