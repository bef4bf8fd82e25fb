//! Per-clause validation.
//!
//! Each submitted clause is checked against the target model's field metadata
//! and the operator catalog. Problems are collected per clause and across the
//! whole list so an author sees every error in one round trip.

use serde::{Deserialize, Serialize};
use sieve_schema::{FieldDescriptor, FieldValue, ScalarType, Schema};
use smol_str::SmolStr;
use tracing::{debug, trace};

use crate::error::{ClauseError, ClauseErrorKind, ValidationErrors};
use crate::model_filter::{Clause, ClauseField};
use crate::operator::{Operator, OperatorCatalog};
use crate::sequence::{validate_sequence, SequenceItem};

/// A clause as submitted by an editing form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseRequest {
    /// The submitted clause.
    #[serde(flatten)]
    pub clause: Clause,
    /// Drop this clause instead of saving it.
    #[serde(default)]
    pub delete: bool,
}

impl ClauseRequest {
    /// Keep `clause`.
    pub fn keep(clause: Clause) -> Self {
        Self { clause, delete: false }
    }

    /// Drop `clause` on save.
    pub fn delete(clause: Clause) -> Self {
        Self { clause, delete: true }
    }
}

impl From<Clause> for ClauseRequest {
    fn from(clause: Clause) -> Self {
        Self::keep(clause)
    }
}

impl SequenceItem for ClauseRequest {
    fn is_separator(&self) -> bool {
        self.clause.is_separator()
    }
}

/// A clause that passed validation, with its value in native form.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedClause {
    /// OR separator.
    Separator,
    /// A comparison ready for compilation.
    Comparison {
        /// Field path on the target model.
        path: SmolStr,
        /// Parsed operator.
        operator: Operator,
        /// Converted operand; `Null` for operators that take no value.
        value: FieldValue,
        /// Raw value as it will be stored.
        raw: String,
        /// Invert the comparison.
        negate: bool,
        /// Native kind of the compared field.
        scalar_type: ScalarType,
    },
}

impl ValidatedClause {
    /// Whether this is the OR separator.
    pub fn is_separator(&self) -> bool {
        matches!(self, Self::Separator)
    }

    /// The storable form. Values of no-value operators are stored empty.
    pub fn into_clause(self) -> Clause {
        match self {
            Self::Separator => Clause::or(),
            Self::Comparison {
                path,
                operator,
                raw,
                negate,
                ..
            } => Clause {
                field: ClauseField::Path(path),
                operator: Some(operator.as_str().to_string()),
                value: raw,
                negate,
            },
        }
    }
}

impl SequenceItem for ValidatedClause {
    fn is_separator(&self) -> bool {
        ValidatedClause::is_separator(self)
    }
}

/// Validate one clause against `model`.
///
/// `index` is the clause's position in the submitted list and is attached to
/// the error. Checks run field, operator, value; a clause fails on the first
/// input that is wrong, since later checks depend on earlier ones.
pub fn validate_clause(
    schema: &Schema,
    model: &str,
    index: usize,
    clause: &Clause,
    catalog: &OperatorCatalog,
) -> Result<ValidatedClause, Vec<ClauseError>> {
    let path = match &clause.field {
        ClauseField::OrSeparator => return Ok(ValidatedClause::Separator),
        ClauseField::Path(path) => path,
    };
    let fail = |kind| vec![ClauseError::new(index, kind)];

    let descriptor = resolve_filterable(schema, model, path).map_err(fail)?;

    let operator = match clause.operator.as_deref().map(str::trim) {
        None | Some("") => return Err(fail(ClauseErrorKind::OperatorRequired)),
        Some(token) => match Operator::parse(token) {
            Some(op) if catalog.allows(&descriptor, op) => op,
            _ => {
                return Err(fail(ClauseErrorKind::OperatorNotAllowed {
                    operator: token.to_string(),
                    field: path.to_string(),
                }));
            }
        },
    };

    if operator.takes_no_value() {
        return Ok(ValidatedClause::Comparison {
            path: path.clone(),
            operator,
            value: FieldValue::Null,
            raw: String::new(),
            negate: clause.negate,
            scalar_type: descriptor.scalar_type,
        });
    }

    let value = convert_value(&descriptor, &clause.value).map_err(fail)?;
    Ok(ValidatedClause::Comparison {
        path: path.clone(),
        operator,
        value,
        raw: clause.value.clone(),
        negate: clause.negate,
        scalar_type: descriptor.scalar_type,
    })
}

/// Validate a submitted clause list for `model`.
///
/// Clauses marked for deletion are skipped. Errors keep the submitted
/// positions, and the sequence rules run over what would be saved.
pub fn validate_clauses(
    schema: &Schema,
    model: &str,
    requests: &[ClauseRequest],
    catalog: &OperatorCatalog,
) -> Result<Vec<ValidatedClause>, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut validated = Vec::with_capacity(requests.len());
    let mut kept = Vec::with_capacity(requests.len());

    for (index, request) in requests.iter().enumerate() {
        if request.delete {
            trace!(model, index, "Skipping deleted clause");
            continue;
        }
        kept.push(request);
        match validate_clause(schema, model, index, &request.clause, catalog) {
            Ok(clause) => validated.push(clause),
            Err(clause_errors) => {
                crate::sieve_debug!(model, index, errors = ?clause_errors, "Clause rejected");
                for error in clause_errors {
                    errors.push(error);
                }
            }
        }
    }

    if let Err(error) = validate_sequence(&kept) {
        errors.push(error);
    }

    if errors.is_empty() {
        debug!(model, clauses = validated.len(), "Clause list validated");
        Ok(validated)
    } else {
        debug!(model, errors = errors.len(), "Clause list rejected");
        Err(errors)
    }
}

/// Validate the stored clauses of a filter.
pub fn validate_stored(
    schema: &Schema,
    model: &str,
    clauses: &[Clause],
    catalog: &OperatorCatalog,
) -> Result<Vec<ValidatedClause>, ValidationErrors> {
    let requests: Vec<ClauseRequest> = clauses.iter().cloned().map(ClauseRequest::keep).collect();
    validate_clauses(schema, model, &requests, catalog)
}

fn resolve_filterable(
    schema: &Schema,
    model: &str,
    path: &str,
) -> Result<FieldDescriptor, ClauseErrorKind> {
    let unknown = |reason: String| ClauseErrorKind::UnknownField {
        field: path.to_string(),
        reason,
    };

    let target = schema.model(model).map_err(|e| unknown(e.to_string()))?;
    if !target.allows_filter_path(path) {
        return Err(unknown(format!("not available for filtering on `{model}`")));
    }
    schema.resolve(model, path).map_err(|e| unknown(e.to_string()))
}

fn convert_value(descriptor: &FieldDescriptor, raw: &str) -> Result<FieldValue, ClauseErrorKind> {
    if raw.is_empty() {
        return Err(ClauseErrorKind::ValueRequired);
    }
    descriptor
        .convert(raw)
        .map_err(|e| ClauseErrorKind::InvalidValue {
            field_type: e.field_type,
            message: e.message,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FilterError, SequenceError};
    use pretty_assertions::assert_eq;
    use sieve_schema::{Choice, Field, FilterField, Model};

    fn schema() -> Schema {
        Schema::new()
            .with_model(
                Model::new("Customer")
                    .with_field(Field::scalar("name", ScalarType::String))
                    .with_field(Field::scalar("age", ScalarType::PositiveSmallInt))
                    .with_field(Field::scalar("active", ScalarType::Boolean))
                    .with_field(Field::scalar("joined", ScalarType::Date))
                    .with_field(
                        Field::scalar("membership", ScalarType::String)
                            .with_choices([Choice::new("gold", "Gold"), Choice::new("basic", "Basic")]),
                    ),
            )
            .with_model(
                Model::new("Secret")
                    .with_field(Field::scalar("code", ScalarType::String))
                    .with_field(Field::scalar("note", ScalarType::Text))
                    .with_filter_field(FilterField::new("note")),
            )
    }

    fn check(clause: Clause) -> Result<ValidatedClause, Vec<ClauseError>> {
        validate_clause(&schema(), "Customer", 0, &clause, &OperatorCatalog::new())
    }

    fn kind_of(result: Result<ValidatedClause, Vec<ClauseError>>) -> ClauseErrorKind {
        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 1);
        errors.into_iter().next().unwrap().kind
    }

    #[test]
    fn test_valid_comparison() {
        let clause = check(Clause::new("age", "gte", "18")).unwrap();
        assert_eq!(
            clause,
            ValidatedClause::Comparison {
                path: "age".into(),
                operator: Operator::Gte,
                value: FieldValue::Int(18),
                raw: "18".into(),
                negate: false,
                scalar_type: ScalarType::PositiveSmallInt,
            }
        );
    }

    #[test]
    fn test_separator_ignores_operator_and_value() {
        let clause = Clause {
            field: ClauseField::OrSeparator,
            operator: Some("nonsense".into()),
            value: "junk".into(),
            negate: true,
        };
        assert_eq!(check(clause).unwrap(), ValidatedClause::Separator);
    }

    #[test]
    fn test_unknown_field() {
        let kind = kind_of(check(Clause::new("nickname", "exact", "x")));
        assert!(matches!(kind, ClauseErrorKind::UnknownField { ref field, .. } if field == "nickname"));
        assert_eq!(kind.input(), crate::error::ClauseInput::Field);
    }

    #[test]
    fn test_undeclared_filter_field_is_unknown() {
        let catalog = OperatorCatalog::new();
        let result = validate_clause(&schema(), "Secret", 0, &Clause::new("code", "exact", "x"), &catalog);
        assert!(matches!(kind_of(result), ClauseErrorKind::UnknownField { .. }));

        let result = validate_clause(&schema(), "Secret", 0, &Clause::new("note", "contains", "x"), &catalog);
        assert!(result.is_ok());
    }

    #[test]
    fn test_operator_not_allowed() {
        let kind = kind_of(check(Clause::new("name", "lt", "x")));
        assert_eq!(
            kind.to_string(),
            "Operator 'lt' is not allowed for field 'name'."
        );

        let kind = kind_of(check(Clause::new("active", "contains", "x")));
        assert!(matches!(kind, ClauseErrorKind::OperatorNotAllowed { .. }));

        let kind = kind_of(check(Clause::new("name", "startswith", "x")));
        assert!(matches!(kind, ClauseErrorKind::OperatorNotAllowed { .. }));
    }

    #[test]
    fn test_operator_required() {
        let mut clause = Clause::new("name", "exact", "x");
        clause.operator = None;
        assert_eq!(kind_of(check(clause)), ClauseErrorKind::OperatorRequired);
    }

    #[test]
    fn test_no_value_operator_discards_value() {
        let clause = check(Clause::new("active", "istrue", "whatever")).unwrap();
        match clause {
            ValidatedClause::Comparison { value, raw, .. } => {
                assert_eq!(value, FieldValue::Null);
                assert_eq!(raw, "");
            }
            other => panic!("unexpected clause: {other:?}"),
        }
        assert!(check(Clause::new("name", "isnull", "")).is_ok());
    }

    #[test]
    fn test_value_required() {
        assert_eq!(kind_of(check(Clause::new("name", "exact", ""))), ClauseErrorKind::ValueRequired);
    }

    #[test]
    fn test_invalid_value_message_is_verbatim() {
        let kind = kind_of(check(Clause::new("age", "exact", "abc")));
        let ClauseErrorKind::InvalidValue { field_type, message } = &kind else {
            panic!("unexpected kind: {kind:?}");
        };
        assert_eq!(*field_type, ScalarType::PositiveSmallInt);
        assert!(kind.to_string().starts_with("Value is not valid for field (PositiveSmallInt): "));
        assert!(kind.to_string().ends_with(message.as_str()));
    }

    #[test]
    fn test_into_clause_round_trip() {
        let clause = Clause::new("joined", "lt", "2020-01-01").negated();
        let validated = check(clause.clone()).unwrap();
        assert_eq!(validated.into_clause(), clause);
    }

    #[test]
    fn test_batch_collects_every_error() {
        let requests: Vec<ClauseRequest> = vec![
            Clause::new("nickname", "exact", "x").into(),
            Clause::new("age", "exact", "old").into(),
            Clause::or().into(),
            Clause::or().into(),
            Clause::new("name", "exact", "Ann").into(),
        ];
        let errors =
            validate_clauses(&schema(), "Customer", &requests, &OperatorCatalog::new()).unwrap_err();

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.for_clause(0).count(), 1);
        assert_eq!(errors.for_clause(1).count(), 1);
        assert_eq!(errors.sequence(), Some(SequenceError::ConsecutiveSeparators));
    }

    #[test]
    fn test_deleted_clauses_are_skipped() {
        let requests = vec![
            ClauseRequest::delete(Clause::new("nickname", "exact", "x")),
            ClauseRequest::keep(Clause::new("name", "exact", "Ann")),
            ClauseRequest::delete(Clause::or()),
        ];
        let validated =
            validate_clauses(&schema(), "Customer", &requests, &OperatorCatalog::new()).unwrap();
        assert_eq!(validated.len(), 1);
    }

    #[test]
    fn test_everything_deleted() {
        let requests = vec![ClauseRequest::delete(Clause::new("name", "exact", "Ann"))];
        let errors =
            validate_clauses(&schema(), "Customer", &requests, &OperatorCatalog::new()).unwrap_err();
        assert_eq!(
            errors.into_vec(),
            vec![FilterError::Sequence(SequenceError::AtLeastOneRequired)]
        );
    }

    #[test]
    fn test_error_indices_follow_submission() {
        let requests = vec![
            ClauseRequest::delete(Clause::new("name", "exact", "Ann")),
            ClauseRequest::keep(Clause::new("age", "lt", "")),
        ];
        let errors =
            validate_clauses(&schema(), "Customer", &requests, &OperatorCatalog::new()).unwrap_err();
        assert_eq!(errors.for_clause(1).count(), 1);
        assert_eq!(errors.for_clause(0).count(), 0);
    }

    #[test]
    fn test_request_deserializes_flat() {
        let request: ClauseRequest = serde_json::from_str(
            r#"{"field": "name", "operator": "exact", "value": "Ann", "delete": true}"#,
        )
        .unwrap();
        assert!(request.delete);
        assert_eq!(request.clause, Clause::new("name", "exact", "Ann"));
    }
}
