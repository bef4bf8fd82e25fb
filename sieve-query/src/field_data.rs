//! Field metadata for filter authoring forms.
//!
//! For a target model this lists the filterable paths with display labels, the
//! operators each path allows, and the declared value choices.

use indexmap::IndexMap;
use serde::Serialize;
use sieve_schema::Schema;
use smol_str::SmolStr;

use crate::error::QueryResult;
use crate::operator::{OperatorCatalog, OperatorChoice};

/// A selectable value for a field with a fixed domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueChoice {
    /// Stored value.
    pub key: String,
    /// Label followed by the stored value, e.g. `Gold (gold)`.
    pub display: String,
}

/// Everything an editing form needs to offer valid clauses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldData {
    /// Filterable paths and their labels, in declaration order.
    pub field_choices: IndexMap<SmolStr, String>,
    /// Allowed operators per path.
    pub field_operators: IndexMap<SmolStr, Vec<OperatorChoice>>,
    /// Declared choices per path; paths without choices are absent.
    pub field_values: IndexMap<SmolStr, Vec<ValueChoice>>,
}

/// Collect the authoring metadata of `model`.
///
/// Uses the model's declared filter fields, or every scalar field when none
/// are declared. Declared labels are shown as written; other labels are
/// derived from the field's display name in title case.
pub fn field_data(schema: &Schema, model: &str, catalog: &OperatorCatalog) -> QueryResult<FieldData> {
    let target = schema.model(model)?;

    let declared: Vec<(SmolStr, Option<String>)> = if target.filter_fields.is_empty() {
        target
            .scalar_fields()
            .into_iter()
            .map(|field| (field.name.clone(), None))
            .collect()
    } else {
        target
            .filter_fields
            .iter()
            .map(|f| (f.path.clone(), f.label.clone()))
            .collect()
    };

    let mut data = FieldData {
        field_choices: IndexMap::with_capacity(declared.len()),
        field_operators: IndexMap::with_capacity(declared.len()),
        field_values: IndexMap::new(),
    };

    for (path, label) in declared {
        let descriptor = schema.resolve(model, &path)?;

        let label = label.unwrap_or_else(|| title_case(&descriptor.display_name()));
        data.field_choices.insert(path.clone(), label);
        data.field_operators.insert(path.clone(), catalog.choices_for(&descriptor));

        if !descriptor.choices().is_empty() {
            let values = descriptor
                .choices()
                .iter()
                .map(|choice| ValueChoice {
                    key: choice.value.clone(),
                    display: format!("{} ({})", choice.label, choice.value),
                })
                .collect();
            data.field_values.insert(path, values);
        }
    }

    tracing::debug!(model, fields = data.field_choices.len(), "Collected field data");
    Ok(data)
}

/// Capitalise each word and lowercase the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = !c.is_alphanumeric();
        }
    }
    out
}
