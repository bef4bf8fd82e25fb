//! Clause list to filter expression compilation.
//!
//! Clauses between OR separators are ANDed together, and the resulting
//! groups are ORed: `[A, OR, B, C, OR, D]` compiles to `A | (B & C) | D`.
//! Negation applies to its own clause only.

use sieve_schema::{FieldValue, Schema};
use tracing::debug;

use crate::clause::{validate_stored, ValidatedClause};
use crate::error::{QueryError, QueryResult};
use crate::filter::Filter;
use crate::model_filter::ModelFilter;
use crate::operator::{Operator, OperatorCatalog};

/// Compile a validated clause list.
///
/// The list is expected to satisfy the sequence rules; a group left empty by
/// a malformed list matches everything.
pub fn compile(clauses: &[ValidatedClause]) -> Filter {
    let mut branches: Vec<Filter> = Vec::new();
    let mut group = Filter::None;

    for clause in clauses {
        match clause {
            ValidatedClause::Separator => {
                branches.push(std::mem::take(&mut group));
            }
            ValidatedClause::Comparison {
                path,
                operator,
                value,
                negate,
                ..
            } => {
                let mut condition = comparison(path.as_str(), *operator, value.clone());
                if *negate {
                    condition = Filter::not(condition);
                }
                group = group.and_then(condition);
            }
        }
    }

    if branches.is_empty() {
        return group;
    }
    branches.push(group);
    Filter::or(branches)
}

/// Validate and compile the clauses stored on `filter`.
///
/// Stored clauses are checked again because the registry may have changed
/// since the filter was saved.
pub fn compile_filter(
    schema: &Schema,
    filter: &ModelFilter,
    catalog: &OperatorCatalog,
) -> QueryResult<Filter> {
    schema.model(&filter.target)?;

    let validated = validate_stored(schema, &filter.target, &filter.clauses, catalog).map_err(|errors| {
        QueryError::invalid_filter(errors)
            .with_model(filter.target.as_str())
            .with_context("compile stored filter")
    })?;

    let compiled = compile(&validated);
    debug!(
        filter_id = %filter.id,
        model = %filter.target,
        leaves = compiled.leaf_count(),
        "Compiled filter"
    );
    crate::sieve_trace!(sql = %compiled.to_sql(0).0, "Compiled filter as SQL");
    Ok(compiled)
}

/// The single comparison a clause stands for.
fn comparison(path: &str, operator: Operator, value: FieldValue) -> Filter {
    let path = path.to_string();
    match operator {
        Operator::IsNull => Filter::Equals(path, FieldValue::Null),
        Operator::IsEmpty => Filter::Equals(path, FieldValue::String(String::new())),
        Operator::IsTrue => Filter::Equals(path, FieldValue::Bool(true)),
        Operator::IsFalse => Filter::Equals(path, FieldValue::Bool(false)),
        Operator::Exact => Filter::Equals(path, value),
        Operator::IExact => Filter::IEquals(path, value),
        Operator::Contains => Filter::Contains(path, value),
        Operator::IContains => Filter::IContains(path, value),
        Operator::Regex => Filter::Regex(path, value),
        Operator::IRegex => Filter::IRegex(path, value),
        Operator::Lt => Filter::Lt(path, value),
        Operator::Lte => Filter::Lte(path, value),
        Operator::Gt => Filter::Gt(path, value),
        Operator::Gte => Filter::Gte(path, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_filter::{Clause, UserId};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use sieve_schema::{Field, Model, ScalarType};

    fn schema() -> Schema {
        Schema::new().with_model(
            Model::new("Customer")
                .with_field(Field::scalar("name", ScalarType::String))
                .with_field(Field::scalar("membership", ScalarType::String))
                .with_field(Field::scalar("age", ScalarType::Int))
                .with_field(Field::scalar("active", ScalarType::Boolean).optional()),
        )
    }

    fn leaf(path: &str, value: &str) -> ValidatedClause {
        ValidatedClause::Comparison {
            path: path.into(),
            operator: Operator::Exact,
            value: FieldValue::String(value.into()),
            raw: value.into(),
            negate: false,
            scalar_type: ScalarType::String,
        }
    }

    fn eq(path: &str, value: &str) -> Filter {
        Filter::Equals(path.into(), FieldValue::String(value.into()))
    }

    #[test]
    fn test_single_clause() {
        assert_eq!(compile(&[leaf("name", "Wile E. Coyote")]), eq("name", "Wile E. Coyote"));
    }

    #[test]
    fn test_or_splits_at_separators() {
        let clauses = [
            leaf("a", "1"),
            ValidatedClause::Separator,
            leaf("b", "2"),
            leaf("c", "3"),
            ValidatedClause::Separator,
            leaf("d", "4"),
        ];
        assert_eq!(
            compile(&clauses),
            Filter::Or(vec![
                eq("a", "1"),
                Filter::And(vec![eq("b", "2"), eq("c", "3")]),
                eq("d", "4"),
            ])
        );
    }

    #[test]
    fn test_negation_wraps_only_its_clause() {
        let mut negated = leaf("membership", "gold");
        if let ValidatedClause::Comparison { negate, .. } = &mut negated {
            *negate = true;
        }
        let compiled = compile(&[leaf("name", "Ann"), negated]);
        assert_eq!(
            compiled,
            Filter::And(vec![
                eq("name", "Ann"),
                Filter::not(eq("membership", "gold")),
            ])
        );
    }

    #[test]
    fn test_no_value_operators() {
        let clause = |operator| ValidatedClause::Comparison {
            path: "active".into(),
            operator,
            value: FieldValue::Null,
            raw: String::new(),
            negate: false,
            scalar_type: ScalarType::Boolean,
        };
        assert_eq!(
            compile(&[clause(Operator::IsTrue)]),
            Filter::Equals("active".into(), FieldValue::Bool(true))
        );
        assert_eq!(
            compile(&[clause(Operator::IsFalse)]),
            Filter::Equals("active".into(), FieldValue::Bool(false))
        );
        assert_eq!(
            compile(&[clause(Operator::IsNull)]),
            Filter::Equals("active".into(), FieldValue::Null)
        );
        assert_eq!(
            compile(&[clause(Operator::IsEmpty)]),
            Filter::Equals("active".into(), FieldValue::String(String::new()))
        );
    }

    #[test]
    fn test_compile_filter_end_to_end() {
        let filter = ModelFilter::new("Customer", UserId(1)).with_clauses([
            Clause::new("name", "exact", "Ann"),
            Clause::or(),
            Clause::new("membership", "exact", "gold"),
            Clause::new("age", "gt", "30"),
        ]);
        let compiled = compile_filter(&schema(), &filter, &OperatorCatalog::new()).unwrap();

        let rows = [
            json!({"name": "Ann", "membership": "basic", "age": 20}),
            json!({"name": "Bob", "membership": "gold", "age": 40}),
            json!({"name": "Cy", "membership": "gold", "age": 25}),
        ];
        let matched: Vec<bool> = rows.iter().map(|r| compiled.matches(r)).collect();
        assert_eq!(matched, vec![true, true, false]);
    }

    #[test]
    fn test_compile_filter_rejects_stale_clauses() {
        let filter = ModelFilter::new("Customer", UserId(1))
            .with_clauses([Clause::new("nickname", "exact", "Ann")]);
        let err = compile_filter(&schema(), &filter, &OperatorCatalog::new()).unwrap_err();
        assert!(err.is_invalid_filter());
        assert_eq!(err.validation_errors().map(|e| e.len()), Some(1));
    }

    #[test]
    fn test_compile_filter_unknown_target() {
        let filter = ModelFilter::new("Order", UserId(1)).with_clauses([Clause::new("name", "exact", "x")]);
        let err = compile_filter(&schema(), &filter, &OperatorCatalog::new()).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::UnknownContentType);
    }

    /// Negating a clause flips exactly the rows that clause selects.
    #[test]
    fn test_negation_is_complement() {
        let rows = [
            json!({"name": "Ann", "age": 20}),
            json!({"name": "Bob", "age": 40}),
            json!({"name": "Cy", "age": null}),
        ];
        for (op, value) in [("exact", "Ann"), ("gt", "30"), ("isnull", "")] {
            let path = if op == "exact" { "name" } else { "age" };
            let plain = ModelFilter::new("Customer", UserId(1)).with_clauses([Clause::new(path, op, value)]);
            let negated = ModelFilter::new("Customer", UserId(1))
                .with_clauses([Clause::new(path, op, value).negated()]);
            let plain = compile_filter(&schema(), &plain, &OperatorCatalog::new()).unwrap();
            let negated = compile_filter(&schema(), &negated, &OperatorCatalog::new()).unwrap();
            for row in &rows {
                assert_ne!(plain.matches(row), negated.matches(row), "{op} on {row}");
            }
        }
    }
}
