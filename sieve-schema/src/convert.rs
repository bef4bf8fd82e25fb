//! Native value conversion.
//!
//! Clause values are stored as strings and only coerced when a filter is
//! validated or compiled. Each [`ScalarType`] parses the raw string the way the
//! underlying column type would, and failures carry a message meant to be shown
//! to the person who typed the value.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::ast::ScalarType;
use crate::error::ConversionError;
use crate::value::FieldValue;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATETIME_TZ_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Convert a raw string into a typed value for a field of kind `ty`.
pub fn convert(ty: ScalarType, raw: &str) -> Result<FieldValue, ConversionError> {
    match ty {
        ScalarType::String
        | ScalarType::Text
        | ScalarType::Email
        | ScalarType::Slug
        | ScalarType::Url
        | ScalarType::FilePath
        | ScalarType::IpAddress
        | ScalarType::Bytes => Ok(FieldValue::String(raw.to_string())),
        ScalarType::Int => integer(ty, raw, i32::MIN as i64, i32::MAX as i64),
        ScalarType::SmallInt => integer(ty, raw, i16::MIN as i64, i16::MAX as i64),
        ScalarType::BigInt => integer(ty, raw, i64::MIN, i64::MAX),
        ScalarType::PositiveInt => integer(ty, raw, 0, i32::MAX as i64),
        ScalarType::PositiveSmallInt => integer(ty, raw, 0, i16::MAX as i64),
        ScalarType::Float => raw
            .trim()
            .parse::<f64>()
            .map(FieldValue::Float)
            .map_err(|_| ConversionError::new(ty, format!("“{}” value must be a float.", raw))),
        ScalarType::Decimal => Decimal::from_str(raw.trim())
            .or_else(|_| Decimal::from_scientific(raw.trim()))
            .map(FieldValue::Decimal)
            .map_err(|_| {
                ConversionError::new(ty, format!("“{}” value must be a decimal number.", raw))
            }),
        ScalarType::Boolean => boolean(raw),
        ScalarType::Date => date(raw).map(FieldValue::Date),
        ScalarType::DateTime => datetime(raw).map(FieldValue::DateTime),
        ScalarType::Time => time(raw).map(FieldValue::Time),
        ScalarType::Uuid => Uuid::parse_str(raw.trim())
            .map(FieldValue::Uuid)
            .map_err(|_| ConversionError::new(ty, format!("“{}” is not a valid UUID.", raw))),
        ScalarType::Json => serde_json::from_str(raw)
            .map(FieldValue::Json)
            .map_err(|_| ConversionError::new(ty, "Value must be valid JSON.")),
    }
}

fn integer(ty: ScalarType, raw: &str, min: i64, max: i64) -> Result<FieldValue, ConversionError> {
    let value = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| ConversionError::new(ty, format!("“{}” value must be an integer.", raw)))?;

    if value < min {
        return Err(ConversionError::new(
            ty,
            format!("Ensure this value is greater than or equal to {}.", min),
        ));
    }
    if value > max {
        return Err(ConversionError::new(
            ty,
            format!("Ensure this value is less than or equal to {}.", max),
        ));
    }
    Ok(FieldValue::Int(value))
}

fn boolean(raw: &str) -> Result<FieldValue, ConversionError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" => Ok(FieldValue::Bool(true)),
        "false" | "f" | "0" | "no" => Ok(FieldValue::Bool(false)),
        _ => Err(ConversionError::new(
            ScalarType::Boolean,
            format!("“{}” value must be either True or False.", raw),
        )),
    }
}

/// Split `YYYY-M-D` into its parts, or `None` when the shape is wrong.
fn date_parts(raw: &str) -> Option<(&str, &str, &str)> {
    let mut parts = raw.split('-');
    let (year, month, day) = (parts.next()?, parts.next()?, parts.next()?);
    let digits = |s: &str, min: usize, max: usize| {
        (min..=max).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
    };
    (parts.next().is_none() && digits(year, 4, 4) && digits(month, 1, 2) && digits(day, 1, 2))
        .then_some((year, month, day))
}

fn date(raw: &str) -> Result<NaiveDate, ConversionError> {
    let Some((year, month, day)) = date_parts(raw.trim()) else {
        return Err(ConversionError::new(
            ScalarType::Date,
            format!(
                "“{}” value has an invalid date format. It must be in YYYY-MM-DD format.",
                raw
            ),
        ));
    };

    let invalid = || {
        ConversionError::new(
            ScalarType::Date,
            format!(
                "“{}” value has the correct format (YYYY-MM-DD) but it is an invalid date.",
                raw
            ),
        )
    };
    let year = year.parse::<i32>().map_err(|_| invalid())?;
    let month = month.parse::<u32>().map_err(|_| invalid())?;
    let day = day.parse::<u32>().map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

fn datetime(raw: &str) -> Result<NaiveDateTime, ConversionError> {
    let trimmed = raw.trim();

    if let Ok(aware) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(aware.naive_utc());
    }
    for format in DATETIME_TZ_FORMATS {
        if let Ok(aware) = DateTime::parse_from_str(trimmed, format) {
            return Ok(aware.naive_utc());
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive);
        }
    }
    if date_parts(trimmed).is_some() {
        // A bare date means midnight; an impossible date keeps the date wording.
        return date(raw).map(|d| d.and_time(NaiveTime::MIN)).map_err(|e| ConversionError {
            field_type: ScalarType::DateTime,
            message: e.message,
        });
    }

    Err(ConversionError::new(
        ScalarType::DateTime,
        format!(
            "“{}” value has an invalid format. It must be in YYYY-MM-DD HH:MM[:ss[.uuuuuu]][TZ] format.",
            raw
        ),
    ))
}

fn time(raw: &str) -> Result<NaiveTime, ConversionError> {
    let trimmed = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| {
            ConversionError::new(
                ScalarType::Time,
                format!(
                    "“{}” value has an invalid format. It must be in HH:MM[:ss[.uuuuuu]] format.",
                    raw
                ),
            )
        })
}
